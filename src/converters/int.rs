//! The built-in `int` converter.

use std::sync::Arc;

use anyhow::ensure;

use crate::converters::{ArgValue, ConverterArgs, ConverterFactory, FieldConverter, FieldValue, Fragment};

/// Converts a path segment into an `i64`, with optional digit-count and
/// range restrictions.
///
/// `{id:int}` accepts any integer; `{id:int(2)}` requires exactly two
/// characters; `{id:int(min=1, max=99)}` bounds the value inclusively.
#[derive(Debug)]
pub struct IntConverter {
    num_digits: Option<usize>,
    min: Option<i64>,
    max: Option<i64>,
}

impl IntConverter {
    /// Create a converter; `num_digits`, when given, must be at least 1.
    pub fn new(
        num_digits: Option<usize>,
        min: Option<i64>,
        max: Option<i64>,
    ) -> anyhow::Result<IntConverter> {
        if let Some(n) = num_digits {
            ensure!(n >= 1, "num_digits must be at least 1");
        }
        Ok(IntConverter {
            num_digits,
            min,
            max,
        })
    }
}

impl FieldConverter for IntConverter {
    fn convert(&self, fragment: &Fragment<'_>) -> Option<FieldValue> {
        let segment = fragment.as_segment()?;

        if let Some(n) = self.num_digits {
            if segment.chars().count() != n {
                return None;
            }
        }

        // str::parse rejects surrounding whitespace and non-integer text;
        // values beyond i64 are rejections rather than errors.
        let value: i64 = segment.parse().ok()?;

        if self.min.map_or(false, |min| value < min) {
            return None;
        }
        if self.max.map_or(false, |max| value > max) {
            return None;
        }
        Some(FieldValue::Int(value))
    }
}

/// Factory for [`IntConverter`], registered as `int`.
#[derive(Debug, Default)]
pub struct IntConverterFactory;

impl ConverterFactory for IntConverterFactory {
    fn construct(&self, mut args: ConverterArgs) -> anyhow::Result<Arc<dyn FieldConverter>> {
        let num_digits = args
            .take("num_digits")?
            .map(ArgValue::into_i64)
            .transpose()?
            .map(|n| {
                ensure!(n >= 1, "num_digits must be at least 1");
                Ok(n as usize)
            })
            .transpose()?;
        let min = args.take("min")?.map(ArgValue::into_i64).transpose()?;
        let max = args.take("max")?.map(ArgValue::into_i64).transpose()?;
        args.finish()?;

        Ok(Arc::new(IntConverter::new(num_digits, min, max)?))
    }
}
