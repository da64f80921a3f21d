//! Error types surfaced during route registration.

use thiserror::Error;

/// Error raised by `add_route` when a URI template cannot be accepted.
///
/// Every variant describes a registration-time problem; lookups never fail.
#[derive(Debug, Error)]
pub enum UnacceptableRouteError {
    /// The template contained whitespace outside of field expressions.
    #[error("URI templates may not include whitespace")]
    Whitespace,

    /// A field name was empty, not an identifier, or a reserved word.
    #[error("field names must be valid identifiers (`{0}` is not valid)")]
    InvalidFieldName(String),

    /// The same field name appeared more than once in one template.
    #[error("field names may not be duplicated (`{0}` was used more than once)")]
    DuplicateFieldName(String),

    /// A field expression used `:` but left the converter name empty.
    #[error("missing converter for field `{0}`")]
    MissingConverter(String),

    /// A field expression named a converter that is not registered.
    #[error("unknown converter: `{0}`")]
    UnknownConverter(String),

    /// The converter constructor rejected its argument string.
    #[error("cannot instantiate converter `{name}`")]
    ConverterInstantiation {
        /// The converter name as written in the template.
        name: String,
        /// The constructor's own error.
        #[source]
        source: anyhow::Error,
    },

    /// The template is inconsistent with a previously registered template.
    ///
    /// Usually caused by configuring a field converter differently for the
    /// same field in two routes, or by using different field names at the
    /// same level in the path (e.g. `/parents/{id}` and
    /// `/parents/{parent_id}/children`).
    #[error(
        "the URI template for this route is inconsistent or conflicts with \
         another route's template (near segment `{segment}`)"
    )]
    ConflictingTemplate {
        /// The template segment at which the conflict was detected.
        segment: String,
    },

    /// A converter that consumes the remaining path was used in a segment
    /// that mixes it with literal text or other fields.
    #[error(
        "cannot use converter `{converter}` of field `{field}` in a template \
         segment that includes other characters or fields"
    )]
    ConsumingConverterInComplexSegment {
        /// The field that named the converter.
        field: String,
        /// The offending converter name.
        converter: String,
    },

    /// A converter that consumes the remaining path was followed by further
    /// template segments, which could therefore never match.
    #[error(
        "cannot add route with template `{template}`: field `{field}` uses \
         the converter `{converter}` that will consume all of the path, \
         making it impossible to match this route"
    )]
    ConsumingConverterWithChildren {
        /// The rejected template.
        template: String,
        /// The field that named the converter.
        field: String,
        /// The offending converter name.
        converter: String,
    },
}

/// Error raised when registering a route.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The template failed validation or conflicts with an existing route.
    #[error(transparent)]
    UnacceptableRoute(#[from] UnacceptableRouteError),

    /// The responder-kind validator rejected the method map built for this
    /// route. The validator's error is passed through unchanged.
    #[error("responder kind mismatch")]
    ResponderKindMismatch(#[source] anyhow::Error),
}

/// Error raised when inserting a converter factory under an invalid name.
#[derive(Debug, Error)]
#[error(
    "invalid converter name `{0}`: names may not be blank, may only use \
     ASCII letters, digits, and underscores, and must begin with a letter \
     or underscore"
)]
pub struct InvalidConverterName(
    /// The rejected name.
    pub String,
);
