//! Percent-decoding helpers for raw request paths.
//!
//! The router matches against decoded text and never decodes on its own.
//! Callers holding a raw request-target path can split and decode it here,
//! then hand the segments to [`Router::find_segments`][fs].
//!
//! [fs]: crate::Router::find_segments

use percent_encoding::percent_decode_str;

/// A string that has been percent decoded and is valid UTF-8.
///
/// Having a dedicated type makes it visible at compile time that decoding
/// has already happened where it is assumed to have happened.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PercentDecoded {
    val: String,
}

impl PercentDecoded {
    /// Decode `raw`, returning `None` when the result is not valid UTF-8.
    pub fn new(raw: &str) -> Option<PercentDecoded> {
        match percent_decode_str(raw).decode_utf8() {
            Ok(decoded) => Some(PercentDecoded {
                val: decoded.into_owned(),
            }),
            Err(_) => None,
        }
    }
}

impl AsRef<str> for PercentDecoded {
    fn as_ref(&self) -> &str {
        &self.val
    }
}

/// A raw request path split into decoded segments.
///
/// Leading slashes are stripped before splitting. Empty segments are kept:
/// they are significant to template matching, where `/a/` and `/a` are
/// distinct paths.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestPathSegments {
    segments: Vec<PercentDecoded>,
}

impl RequestPathSegments {
    /// Split and decode a raw request path. Returns `None` when any
    /// segment fails to decode to UTF-8.
    pub fn new(path: &str) -> Option<RequestPathSegments> {
        let segments = path
            .trim_start_matches('/')
            .split('/')
            .map(PercentDecoded::new)
            .collect::<Option<Vec<_>>>()?;
        Some(RequestPathSegments { segments })
    }

    /// The decoded segments, in a shape accepted by
    /// [`Router::find_segments`](crate::Router::find_segments).
    pub fn segments(&self) -> Vec<&str> {
        self.segments.iter().map(AsRef::as_ref).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_segment() {
        let segments = RequestPathSegments::new("/%61ctivate/caf%C3%A9").unwrap();
        assert_eq!(segments.segments(), vec!["activate", "café"]);
    }

    #[test]
    fn keeps_empty_segments() {
        let segments = RequestPathSegments::new("/a//b/").unwrap();
        assert_eq!(segments.segments(), vec!["a", "", "b", ""]);
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(PercentDecoded::new("%FF").is_none());
        assert!(RequestPathSegments::new("/ok/%FF").is_none());
    }

    #[test]
    fn decoded_segments_route() {
        let mut router = crate::Router::new();
        router
            .add_route("/items/{id:int}", "R1", crate::RouteOptions::default())
            .unwrap();

        let segments = RequestPathSegments::new("/items/%34%32").unwrap();
        let m = router.find_segments(&segments.segments()).unwrap();
        assert_eq!(*m.resource, "R1");
        assert_eq!(m.params["id"].as_int(), Some(42));
    }
}
