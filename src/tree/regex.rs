//! Defines the wrapping type for a mixed-segment matching regex.

use std::collections::HashMap;

use regex::Regex;

/// A regex matching one mixed literal/field path segment, with named
/// capture groups for the fields.
///
/// Implements `PartialEq` by comparing the underlying pattern text, which
/// is also what `Clone` and `Debug` operate on.
#[derive(Clone, Debug)]
pub(crate) struct ComplexSegmentRegex {
    regex: Regex,
}

impl ComplexSegmentRegex {
    /// Compile a pattern produced by the template parser.
    ///
    /// The pattern text is already anchored, with literal runs escaped and
    /// field names validated as identifiers, so compilation cannot fail.
    pub(crate) fn new(pattern: &str) -> ComplexSegmentRegex {
        ComplexSegmentRegex {
            regex: Regex::new(pattern).unwrap(),
        }
    }

    /// Returns the pattern backing this regex as a `&str`.
    pub(crate) fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Match a request path segment, returning the named captures.
    ///
    /// Every field group matches at least one character (`.+`), so each
    /// named group is present whenever the segment matches.
    pub(crate) fn captures(&self, segment: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(segment)?;
        Some(
            self.regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

impl PartialEq for ComplexSegmentRegex {
    fn eq(&self, other: &ComplexSegmentRegex) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ComplexSegmentRegex {}
