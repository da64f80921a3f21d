//! Defines the segment `Node` and `SegmentKind` for the routing tree.

use std::sync::Arc;

use log::trace;

use crate::converters::FieldConverter;
use crate::tree::regex::ComplexSegmentRegex;

/// Indicates how one template segment matches request path segments.
#[derive(Clone, Debug)]
pub(crate) enum SegmentKind {
    /// Matched exactly (string equality) against the request segment.
    Literal,
    /// A single field expression spanning the whole segment; matches any
    /// request segment and captures it under `name`.
    SimpleField {
        /// The field name.
        name: String,
    },
    /// A mix of literal text and field expressions, matched with a regex.
    ComplexField {
        /// Anchored regex with one named group per field.
        pattern: ComplexSegmentRegex,
        /// The segment text with each field expression replaced by a
        /// placeholder, used for sibling conflict detection.
        signature: String,
    },
}

/// One field's converter reference within a segment, with the instance
/// constructed during template validation.
#[derive(Clone)]
pub(crate) struct ConverterBinding {
    pub(crate) field: String,
    pub(crate) name: String,
    pub(crate) argstr: Option<String>,
    pub(crate) instance: Arc<dyn FieldConverter>,
    pub(crate) consumes_remaining: bool,
}

/// One template segment, parsed and validated but not yet in the tree.
#[derive(Clone)]
pub(crate) struct ParsedSegment {
    pub(crate) raw: String,
    pub(crate) kind: SegmentKind,
    pub(crate) num_fields: usize,
    pub(crate) converters: Vec<ConverterBinding>,
}

impl ParsedSegment {
    /// The first converter binding that consumes the remaining path.
    pub(crate) fn consuming_converter(&self) -> Option<&ConverterBinding> {
        self.converters.iter().find(|b| b.consumes_remaining)
    }
}

/// The resource bound to a template's terminal node.
pub(crate) struct Terminal<R, M> {
    pub(crate) resource: Arc<R>,
    pub(crate) method_map: Arc<M>,
    pub(crate) template: Arc<str>,
}

impl<R, M> Clone for Terminal<R, M> {
    fn clone(&self) -> Self {
        Terminal {
            resource: Arc::clone(&self.resource),
            method_map: Arc::clone(&self.method_map),
            template: Arc::clone(&self.template),
        }
    }
}

/// A recursive member of the routing tree representing one path segment
/// position. Nodes are created at registration, mutated only by further
/// registrations, and live until the router is dropped.
pub(crate) struct Node<R, M> {
    pub(crate) raw: String,
    pub(crate) kind: SegmentKind,
    pub(crate) num_fields: usize,
    pub(crate) converters: Vec<ConverterBinding>,
    pub(crate) terminal: Option<Terminal<R, M>>,
    pub(crate) children: Vec<Node<R, M>>,
}

impl<R, M> Node<R, M> {
    pub(crate) fn from_segment(segment: &ParsedSegment) -> Node<R, M> {
        for binding in &segment.converters {
            trace!(
                " field `{}` uses converter `{}` with args `{}`",
                binding.field,
                binding.name,
                binding.argstr.as_deref().unwrap_or("")
            );
        }
        Node {
            raw: segment.raw.clone(),
            kind: segment.kind.clone(),
            num_fields: segment.num_fields,
            converters: segment.converters.clone(),
            terminal: None,
            children: Vec::new(),
        }
    }

    /// True if this node declares at least one field.
    pub(crate) fn is_field(&self) -> bool {
        !matches!(self.kind, SegmentKind::Literal)
    }

    /// True if this node represents the supplied template segment.
    pub(crate) fn matches(&self, raw: &str) -> bool {
        self.raw == raw
    }

    /// True if this node cannot coexist with a non-matching sibling of the
    /// given kind.
    ///
    /// Two simple fields at one level always conflict; two mixed segments
    /// conflict when their shape signatures are identical; literals never
    /// conflict with anything they do not match outright.
    pub(crate) fn conflicts_with(&self, other: &ParsedSegment) -> bool {
        match (&self.kind, &other.kind) {
            (SegmentKind::SimpleField { .. }, SegmentKind::SimpleField { .. }) => true,
            (
                SegmentKind::ComplexField { signature, .. },
                SegmentKind::ComplexField {
                    signature: other_signature,
                    ..
                },
            ) => signature == other_signature,
            _ => false,
        }
    }

    /// The first converter binding that consumes the remaining path, on
    /// this node only (ancestors are checked during descent).
    pub(crate) fn consuming_converter(&self) -> Option<&ConverterBinding> {
        self.converters.iter().find(|b| b.consumes_remaining)
    }
}
