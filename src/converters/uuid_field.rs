//! The built-in `uuid` converter.

use std::sync::Arc;

use uuid::Uuid;

use crate::converters::{ConverterArgs, ConverterFactory, FieldConverter, FieldValue, Fragment};

/// Converts a path segment into a [`Uuid`].
///
/// The hyphenated, simple, braced, and URN textual forms are all accepted.
#[derive(Debug, Default)]
pub struct UuidConverter;

impl FieldConverter for UuidConverter {
    fn convert(&self, fragment: &Fragment<'_>) -> Option<FieldValue> {
        let segment = fragment.as_segment()?;
        Uuid::parse_str(segment).ok().map(FieldValue::Uuid)
    }
}

/// Factory for [`UuidConverter`], registered as `uuid`. Takes no arguments.
#[derive(Debug, Default)]
pub struct UuidConverterFactory;

impl ConverterFactory for UuidConverterFactory {
    fn construct(&self, args: ConverterArgs) -> anyhow::Result<Arc<dyn FieldConverter>> {
        args.finish()?;
        Ok(Arc::new(UuidConverter))
    }
}
