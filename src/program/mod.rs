//! The decision program compiled from the routing tree.
//!
//! The tree is lowered into a tree of typed constructs (length guards,
//! literal and pattern tests, converter guards, fragment staging, deferred
//! parameter assignments, and returns) whose shape is fixed at compile
//! time. The runtime interprets the constructs directly; a host could just
//! as well translate them into generated code, since every decision is
//! already explicit in the structure.

use std::fmt::Write;
use std::sync::Arc;

use crate::converters::FieldConverter;
use crate::tree::node::Terminal;
use crate::tree::regex::ComplexSegmentRegex;

pub(crate) mod compile;
mod exec;

/// One node of the decision program.
///
/// Constructs with children are guards: the body runs only when the test
/// passes. The `Set*` constructs stage state for the constructs that
/// follow them in the same body.
#[derive(Clone, Debug)]
pub(crate) enum Construct {
    /// Run the body iff the request has more than `len` segments.
    IfPathLengthGt { len: usize, children: Vec<Construct> },
    /// Run the body iff the request has exactly `len` segments.
    IfPathLengthEq { len: usize, children: Vec<Construct> },
    /// Run the body iff segment `index` equals `literal` exactly.
    IfSegmentLiteral {
        index: usize,
        literal: String,
        children: Vec<Construct>,
    },
    /// Match segment `index` against a pattern, exposing its named
    /// captures to the body on success.
    IfSegmentPattern {
        index: usize,
        pattern: usize,
        children: Vec<Construct>,
    },
    /// Run converter `converter` on the staged fragment; on acceptance
    /// bind the value to `slot` and run the body.
    IfConverted {
        slot: usize,
        converter: usize,
        children: Vec<Construct>,
    },
    /// Stage segment `index` as the conversion fragment.
    SetFragmentFromPath { index: usize },
    /// Stage every segment from `index` onward as the conversion fragment.
    SetFragmentFromRemaining { index: usize },
    /// Stage the named capture `name`, removing it from the group map.
    SetFragmentFromGroup { name: String },
    /// Copy the current pattern captures into the poppable group map.
    PrefetchGroups,
    /// Store a group map in `slot`: the poppable map when `prefetched`,
    /// otherwise the current pattern captures.
    StashGroups { slot: usize, prefetched: bool },
    /// Deferred: write segment `index` under `name` in the params map.
    SetParamFromPath { name: String, index: usize },
    /// Deferred: write the converted value in `slot` under `name`.
    SetParamFromSlot { name: String, slot: usize },
    /// Deferred: write every entry of the group map stored in `slot`.
    SetParamsFromGroups { slot: usize },
    /// No route matches on this branch.
    ReturnNone,
    /// The route bound at `binding` matches.
    ReturnMatch { binding: usize },
}

/// The compiled matcher: the construct tree plus the tables it indexes
/// into. Immutable once built, shared across lookups without locking.
pub(crate) struct CompiledMatcher<R, M> {
    program: Vec<Construct>,
    patterns: Vec<ComplexSegmentRegex>,
    converters: Vec<Arc<dyn FieldConverter>>,
    bindings: Vec<Terminal<R, M>>,
    slot_count: usize,
    source: String,
}

impl<R, M> CompiledMatcher<R, M> {
    /// The terminal binding for a `ReturnMatch` index.
    pub(crate) fn binding(&self, index: usize) -> &Terminal<R, M> {
        &self.bindings[index]
    }

    /// The human-readable rendering of the program. Advisory only.
    pub(crate) fn source(&self) -> &str {
        &self.source
    }
}

/// Render the program as pseudocode for diagnostics.
fn render(program: &[Construct], patterns: &[ComplexSegmentRegex]) -> String {
    let mut out = String::new();
    render_level(&mut out, program, patterns, 0);
    out
}

fn render_level(
    out: &mut String,
    constructs: &[Construct],
    patterns: &[ComplexSegmentRegex],
    depth: usize,
) {
    for construct in constructs {
        let pad = "    ".repeat(depth);
        match construct {
            Construct::IfPathLengthGt { len, children } => {
                let _ = writeln!(out, "{}if path_len > {} {{", pad, len);
                render_level(out, children, patterns, depth + 1);
                let _ = writeln!(out, "{}}}", pad);
            }
            Construct::IfPathLengthEq { len, children } => {
                let _ = writeln!(out, "{}if path_len == {} {{", pad, len);
                render_level(out, children, patterns, depth + 1);
                let _ = writeln!(out, "{}}}", pad);
            }
            Construct::IfSegmentLiteral {
                index,
                literal,
                children,
            } => {
                let _ = writeln!(out, "{}if path[{}] == {:?} {{", pad, index, literal);
                render_level(out, children, patterns, depth + 1);
                let _ = writeln!(out, "{}}}", pad);
            }
            Construct::IfSegmentPattern {
                index,
                pattern,
                children,
            } => {
                let _ = writeln!(
                    out,
                    "{}if patterns[{}].captures(path[{}]) {{  // {}",
                    pad,
                    pattern,
                    index,
                    patterns[*pattern].as_str()
                );
                render_level(out, children, patterns, depth + 1);
                let _ = writeln!(out, "{}}}", pad);
            }
            Construct::IfConverted {
                slot,
                converter,
                children,
            } => {
                let _ = writeln!(
                    out,
                    "{}if let Some(slot_{}) = converters[{}].convert(fragment) {{",
                    pad, slot, converter
                );
                render_level(out, children, patterns, depth + 1);
                let _ = writeln!(out, "{}}}", pad);
            }
            Construct::SetFragmentFromPath { index } => {
                let _ = writeln!(out, "{}fragment = path[{}];", pad, index);
            }
            Construct::SetFragmentFromRemaining { index } => {
                let _ = writeln!(out, "{}fragment = path[{}..];", pad, index);
            }
            Construct::SetFragmentFromGroup { name } => {
                let _ = writeln!(out, "{}fragment = groups.remove({:?});", pad, name);
            }
            Construct::PrefetchGroups => {
                let _ = writeln!(out, "{}groups = captures.clone();", pad);
            }
            Construct::StashGroups { slot, prefetched } => {
                let source = if *prefetched { "groups" } else { "captures" };
                let _ = writeln!(out, "{}slot_{} = {};", pad, slot, source);
            }
            Construct::SetParamFromPath { name, index } => {
                let _ = writeln!(out, "{}params[{:?}] = path[{}];", pad, name, index);
            }
            Construct::SetParamFromSlot { name, slot } => {
                let _ = writeln!(out, "{}params[{:?}] = slot_{};", pad, name, slot);
            }
            Construct::SetParamsFromGroups { slot } => {
                let _ = writeln!(out, "{}params.extend(slot_{});", pad, slot);
            }
            Construct::ReturnNone => {
                let _ = writeln!(out, "{}return None;", pad);
            }
            Construct::ReturnMatch { binding } => {
                let _ = writeln!(out, "{}return Some(routes[{}]);", pad, binding);
            }
        }
    }
}
