//! The built-in `path` converter.

use std::sync::Arc;

use crate::converters::{ConverterArgs, ConverterFactory, FieldConverter, FieldValue, Fragment};

/// Captures every remaining path segment as a list.
///
/// `{rest:path}` on `/files/{rest:path}` matches `/files/a/b/c` with
/// `rest = ["a", "b", "c"]`. Because the converter swallows the remainder
/// of the path, its field must be the last segment of the template.
#[derive(Debug, Default)]
pub struct PathConverter;

impl FieldConverter for PathConverter {
    fn convert(&self, fragment: &Fragment<'_>) -> Option<FieldValue> {
        let segments = fragment.as_remaining()?;
        Some(FieldValue::Segments(
            segments.iter().map(|s| (*s).to_owned()).collect(),
        ))
    }
}

/// Factory for [`PathConverter`], registered as `path`. Takes no arguments.
#[derive(Debug, Default)]
pub struct PathConverterFactory;

impl ConverterFactory for PathConverterFactory {
    fn construct(&self, args: ConverterArgs) -> anyhow::Result<Arc<dyn FieldConverter>> {
        args.finish()?;
        Ok(Arc::new(PathConverter))
    }

    fn consumes_multiple_segments(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn captures_the_remaining_segments() {
        let rest = ["a", "b", "c"];
        assert_eq!(
            PathConverter.convert(&Fragment::Remaining(&rest)),
            Some(FieldValue::Segments(vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string()
            ]))
        );

        let empty = [""];
        assert_eq!(
            PathConverter.convert(&Fragment::Remaining(&empty)),
            Some(FieldValue::Segments(vec![String::new()]))
        );
    }

    #[test]
    fn rejects_single_segment_fragments() {
        assert_eq!(
            PathConverter.convert(&Fragment::Segment(Cow::Borrowed("a"))),
            None
        );
    }

    #[test]
    fn factory_advertises_multi_segment_consumption() {
        assert!(PathConverterFactory.consumes_multiple_segments());
    }
}
