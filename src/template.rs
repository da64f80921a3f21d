//! URI template parsing and validation.
//!
//! A template is a slash-separated path whose segments may embed field
//! expressions of the form `{name}`, `{name:converter}`, or
//! `{name:converter(args)}`. Parsing decomposes each segment into literal
//! and field parts, validates names and converter references, and
//! classifies the segment for the routing tree.

use std::collections::HashSet;

use crate::converters::ConverterArgs;
use crate::error::UnacceptableRouteError;
use crate::options::ConverterMap;
use crate::tree::node::{ConverterBinding, ParsedSegment, SegmentKind};
use crate::tree::regex::ComplexSegmentRegex;

/// Identifiers that cannot be used as field names: Rust keywords (strict
/// and reserved, both editions), since field names are passed on to hosts
/// that map them onto struct fields.
const RESERVED_IDENTIFIERS: &[&str] = &[
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// A template parsed into validated segments, ready for tree insertion.
pub(crate) struct ParsedTemplate {
    pub(crate) raw: String,
    pub(crate) segments: Vec<ParsedSegment>,
}

/// One field expression found in a segment, with the byte span of the
/// whole `{...}` run.
#[derive(Debug, PartialEq)]
struct FieldExpr {
    name: String,
    converter: Option<String>,
    argstr: Option<String>,
    start: usize,
    end: usize,
}

/// True for a non-empty ASCII identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse and validate a URI template against the registered converters.
///
/// Leading slashes are stripped; the empty template addresses the root.
/// Converter instances are constructed here, once per field occurrence,
/// and travel with the parsed segment into the tree.
pub(crate) fn parse_template(
    template: &str,
    converters: &ConverterMap,
) -> Result<ParsedTemplate, UnacceptableRouteError> {
    let scanned: Vec<(&str, Vec<FieldExpr>)> = template
        .trim_start_matches('/')
        .split('/')
        .map(|raw| (raw, scan_fields(raw)))
        .collect();

    for (raw, fields) in &scanned {
        if has_whitespace_outside_fields(raw, fields) {
            return Err(UnacceptableRouteError::Whitespace);
        }
    }

    let mut used_names = HashSet::new();
    let mut segments = Vec::with_capacity(scanned.len());

    for (raw, fields) in scanned {
        let mut bindings = Vec::new();

        for field in &fields {
            if !is_identifier(&field.name) || RESERVED_IDENTIFIERS.contains(&field.name.as_str())
            {
                return Err(UnacceptableRouteError::InvalidFieldName(field.name.clone()));
            }
            if !used_names.insert(field.name.clone()) {
                return Err(UnacceptableRouteError::DuplicateFieldName(
                    field.name.clone(),
                ));
            }

            let converter_name = match &field.converter {
                Some(name) => name,
                None => continue,
            };
            if converter_name.is_empty() {
                return Err(UnacceptableRouteError::MissingConverter(field.name.clone()));
            }
            let factory = converters.get(converter_name).ok_or_else(|| {
                UnacceptableRouteError::UnknownConverter(converter_name.clone())
            })?;

            let instance = ConverterArgs::parse(field.argstr.as_deref().unwrap_or(""))
                .and_then(|args| factory.construct(args))
                .map_err(|source| UnacceptableRouteError::ConverterInstantiation {
                    name: converter_name.clone(),
                    source,
                })?;

            bindings.push(ConverterBinding {
                field: field.name.clone(),
                name: converter_name.clone(),
                argstr: field.argstr.clone(),
                instance,
                consumes_remaining: factory.consumes_multiple_segments(),
            });
        }

        let kind = classify(raw, &fields);
        segments.push(ParsedSegment {
            raw: raw.to_string(),
            kind,
            num_fields: fields.len(),
            converters: bindings,
        });
    }

    Ok(ParsedTemplate {
        raw: template.to_string(),
        segments,
    })
}

/// Find every field expression in a segment.
///
/// A `{...}` run that does not parse as a field expression (for example an
/// unclosed argument list) is left in place as literal text rather than
/// reported as an error, matching the template grammar: only well-formed
/// expressions are fields.
fn scan_fields(segment: &str) -> Vec<FieldExpr> {
    let bytes = segment.as_bytes();
    let mut fields = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        let close = match bytes[i + 1..].iter().position(|&b| b == b'}') {
            Some(offset) => i + 1 + offset,
            // No `}` anywhere ahead, so no further fields are possible.
            None => break,
        };

        match parse_field(&segment[i + 1..close]) {
            Some((name, converter, argstr)) => {
                fields.push(FieldExpr {
                    name,
                    converter,
                    argstr,
                    start: i,
                    end: close + 1,
                });
                i = close + 1;
            }
            None => i += 1,
        }
    }

    fields
}

/// Split the inside of a `{...}` run into name, converter, and argstr.
fn parse_field(inner: &str) -> Option<(String, Option<String>, Option<String>)> {
    let (name, rest) = match inner.find(':') {
        Some(colon) => (&inner[..colon], &inner[colon + 1..]),
        None => return Some((inner.to_string(), None, None)),
    };

    match rest.find('(') {
        None => Some((name.to_string(), Some(rest.to_string()), None)),
        Some(open) if rest.ends_with(')') => {
            let argstr = &rest[open + 1..rest.len() - 1];
            Some((
                name.to_string(),
                Some(rest[..open].to_string()),
                Some(argstr.to_string()),
            ))
        }
        // `(` without a closing `)}`: not a field expression.
        Some(_) => None,
    }
}

fn has_whitespace_outside_fields(segment: &str, fields: &[FieldExpr]) -> bool {
    let mut pos = 0;
    for field in fields {
        if segment[pos..field.start].chars().any(char::is_whitespace) {
            return true;
        }
        pos = field.end;
    }
    segment[pos..].chars().any(char::is_whitespace)
}

fn classify(raw: &str, fields: &[FieldExpr]) -> SegmentKind {
    if fields.is_empty() {
        return SegmentKind::Literal;
    }
    if fields.len() == 1 && fields[0].start == 0 && fields[0].end == raw.len() {
        return SegmentKind::SimpleField {
            name: fields[0].name.clone(),
        };
    }
    SegmentKind::ComplexField {
        pattern: ComplexSegmentRegex::new(&pattern_text(raw, fields)),
        signature: signature(raw, fields),
    }
}

/// The regex for a mixed segment: literal runs escaped, each field a named
/// group over `.+`, the whole pattern anchored at both ends.
fn pattern_text(raw: &str, fields: &[FieldExpr]) -> String {
    let mut out = String::from("^");
    let mut pos = 0;
    for field in fields {
        out.push_str(&regex::escape(&raw[pos..field.start]));
        out.push_str("(?P<");
        out.push_str(&field.name);
        out.push_str(">.+)");
        pos = field.end;
    }
    out.push_str(&regex::escape(&raw[pos..]));
    out.push('$');
    out
}

/// The segment with every field expression replaced by a placeholder,
/// used to detect conflicting mixed-segment siblings.
fn signature(raw: &str, fields: &[FieldExpr]) -> String {
    let mut out = String::new();
    let mut pos = 0;
    for field in fields {
        out.push_str(&raw[pos..field.start]);
        out.push('v');
        pos = field.end;
    }
    out.push_str(&raw[pos..]);
    out
}
