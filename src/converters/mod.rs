//! Field converters: named value parsers referenced from URI templates.
//!
//! A template field such as `{id:int(min=1)}` names a converter (`int`) and
//! hands its constructor an argument string (`min=1`). The registered
//! [`ConverterFactory`] turns the parsed arguments into a shared
//! [`FieldConverter`] instance; at lookup time the instance either produces
//! a typed [`FieldValue`] or rejects the fragment, disqualifying the branch.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use time::PrimitiveDateTime;
use uuid::Uuid;

pub mod args;
mod datetime;
mod int;
mod path;
mod uuid_field;

pub use self::args::{ArgValue, ConverterArgs};
pub use self::datetime::{DateTimeConverter, DateTimeConverterFactory, DEFAULT_DATETIME_FORMAT};
pub use self::int::{IntConverter, IntConverterFactory};
pub use self::path::{PathConverter, PathConverterFactory};
pub use self::uuid_field::{UuidConverter, UuidConverterFactory};

/// Mapping of field names to the values extracted for a matched route.
pub type ParamMap = HashMap<String, FieldValue>;

/// The input handed to a converter: either a single path segment or, for
/// converters that consume the remaining path, the list of segments left
/// over at the converter's position.
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment<'a> {
    /// A single path segment (or a named capture from a mixed segment).
    Segment(Cow<'a, str>),
    /// All path segments from the converter's position to the end.
    Remaining(&'a [&'a str]),
}

impl<'a> Fragment<'a> {
    /// The fragment as a single segment, if it is one.
    pub fn as_segment(&self) -> Option<&str> {
        match self {
            Fragment::Segment(s) => Some(s),
            Fragment::Remaining(_) => None,
        }
    }

    /// The fragment as a remaining-path list, if it is one.
    pub fn as_remaining(&self) -> Option<&[&'a str]> {
        match self {
            Fragment::Segment(_) => None,
            Fragment::Remaining(segments) => Some(segments),
        }
    }
}

/// A value produced by a converter, or captured verbatim from the path.
#[derive(Clone)]
pub enum FieldValue {
    /// A raw path segment or named-capture string.
    Segment(String),
    /// The remaining-path segment list consumed by a multi-segment converter.
    Segments(Vec<String>),
    /// An integer produced by the `int` converter.
    Int(i64),
    /// A UUID produced by the `uuid` converter.
    Uuid(Uuid),
    /// A date-time produced by the `dt` converter.
    DateTime(PrimitiveDateTime),
    /// An arbitrary value produced by a user-supplied converter.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl FieldValue {
    /// The value as a string slice, if it is a raw segment.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Segment(s) => Some(s),
            _ => None,
        }
    }

    /// The value as the remaining-path list, if it is one.
    pub fn as_segments(&self) -> Option<&[String]> {
        match self {
            FieldValue::Segments(segments) => Some(segments),
            _ => None,
        }
    }

    /// The value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a UUID, if it is one.
    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            FieldValue::Uuid(value) => Some(value),
            _ => None,
        }
    }

    /// The value as a date-time, if it is one.
    pub fn as_datetime(&self) -> Option<&PrimitiveDateTime> {
        match self {
            FieldValue::DateTime(value) => Some(value),
            _ => None,
        }
    }

    /// Downcast a custom converter value to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            FieldValue::Custom(value) => value.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Segment(s) => f.debug_tuple("Segment").field(s).finish(),
            FieldValue::Segments(s) => f.debug_tuple("Segments").field(s).finish(),
            FieldValue::Int(v) => f.debug_tuple("Int").field(v).finish(),
            FieldValue::Uuid(v) => f.debug_tuple("Uuid").field(v).finish(),
            FieldValue::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
            FieldValue::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Segment(a), FieldValue::Segment(b)) => a == b,
            (FieldValue::Segments(a), FieldValue::Segments(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => a == b,
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a == b,
            (FieldValue::Custom(a), FieldValue::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A shared value parser invoked while matching a request path.
///
/// Instances are installed into the compiled matcher and shared across
/// every request routed after compilation, potentially from many threads
/// at once. Implementations must therefore be effectively immutable or
/// internally synchronized.
///
/// Returning `None` is a rejection, not an error: it disqualifies the
/// branch being explored and lets matching continue elsewhere.
pub trait FieldConverter: Send + Sync {
    /// Validate and transform a fragment into a typed value.
    fn convert(&self, fragment: &Fragment<'_>) -> Option<FieldValue>;
}

/// Constructs [`FieldConverter`] instances from template argument strings.
///
/// Registered by name in the router's converter map. The factory is
/// consulted once per field occurrence at registration time; errors from
/// [`construct`](Self::construct) fail the `add_route` call.
pub trait ConverterFactory: Send + Sync {
    /// Build a converter instance from the parsed constructor arguments.
    fn construct(&self, args: ConverterArgs) -> anyhow::Result<Arc<dyn FieldConverter>>;

    /// Whether converters built by this factory consume every remaining
    /// path segment instead of a single one.
    ///
    /// Fields using such a converter must be the final segment of their
    /// template and may not share the segment with literal text.
    fn consumes_multiple_segments(&self) -> bool {
        false
    }
}
