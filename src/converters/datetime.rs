//! The built-in `dt` converter.

use std::sync::Arc;

use time::format_description::{self, OwnedFormatItem};
use time::PrimitiveDateTime;

use crate::converters::{ArgValue, ConverterArgs, ConverterFactory, FieldConverter, FieldValue, Fragment};

/// Converts a path segment into a [`PrimitiveDateTime`] using a `time`
/// format description.
///
/// `{when:dt}` parses the default `2024-01-02T03:04:05Z` shape;
/// `{when:dt('[year]-[month]-[day]')}` supplies a custom format.
pub struct DateTimeConverter {
    format: OwnedFormatItem,
}

/// The format used when the field expression does not supply one.
pub const DEFAULT_DATETIME_FORMAT: &str = "[year]-[month]-[day]T[hour]:[minute]:[second]Z";

impl DateTimeConverter {
    /// Create a converter from a format description string. Fails when the
    /// description itself does not parse.
    pub fn new(format: &str) -> anyhow::Result<DateTimeConverter> {
        Ok(DateTimeConverter {
            format: format_description::parse_owned::<2>(format)?,
        })
    }
}

impl FieldConverter for DateTimeConverter {
    fn convert(&self, fragment: &Fragment<'_>) -> Option<FieldValue> {
        let segment = fragment.as_segment()?;
        PrimitiveDateTime::parse(segment, &self.format)
            .ok()
            .map(FieldValue::DateTime)
    }
}

/// Factory for [`DateTimeConverter`], registered as `dt`.
#[derive(Debug, Default)]
pub struct DateTimeConverterFactory;

impl ConverterFactory for DateTimeConverterFactory {
    fn construct(&self, mut args: ConverterArgs) -> anyhow::Result<Arc<dyn FieldConverter>> {
        let format = args
            .take("format_string")?
            .map(ArgValue::into_string)
            .transpose()?;
        args.finish()?;

        let converter = DateTimeConverter::new(
            format.as_deref().unwrap_or(DEFAULT_DATETIME_FORMAT),
        )?;
        Ok(Arc::new(converter))
    }
}
