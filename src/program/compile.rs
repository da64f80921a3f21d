//! Lowers the routing tree into the decision program.
//!
//! Siblings are visited from most to least specific (literals, then mixed
//! segments, then the simple field) so that static text wins over
//! captures. Parameter writes are deferred onto a per-branch stack that is
//! flushed immediately before each return, and subtrees that hold no field
//! children fail fast with an immediate no-match return.

use std::sync::Arc;

use log::debug;

use crate::converters::FieldConverter;
use crate::program::{render, CompiledMatcher, Construct};
use crate::tree::node::{Node, SegmentKind, Terminal};
use crate::tree::regex::ComplexSegmentRegex;

struct Tables<R, M> {
    patterns: Vec<ComplexSegmentRegex>,
    converters: Vec<Arc<dyn FieldConverter>>,
    bindings: Vec<Terminal<R, M>>,
    slot_count: usize,
}

impl<R, M> Tables<R, M> {
    fn allot_slot(&mut self, slot: usize) {
        if slot + 1 > self.slot_count {
            self.slot_count = slot + 1;
        }
    }
}

/// Compile the tree rooted at `roots` into an immutable matcher.
pub(crate) fn compile<R, M>(roots: &[Node<R, M>]) -> CompiledMatcher<R, M> {
    let mut tables = Tables {
        patterns: Vec::new(),
        converters: Vec::new(),
        bindings: Vec::new(),
        slot_count: 0,
    };

    let mut program = Vec::new();
    generate_level(roots, &mut program, &[], 0, true, &mut tables);
    program.push(Construct::ReturnNone);

    let source = render(&program, &tables.patterns);
    debug!(
        " compiled matcher: {} bindings, {} patterns, {} converters",
        tables.bindings.len(),
        tables.patterns.len(),
        tables.converters.len()
    );

    CompiledMatcher {
        program,
        patterns: tables.patterns,
        converters: tables.converters,
        bindings: tables.bindings,
        slot_count: tables.slot_count,
        source,
    }
}

fn generate_level<R, M>(
    nodes: &[Node<R, M>],
    out: &mut Vec<Construct>,
    params_stack: &[Construct],
    level: usize,
    mut fast_return: bool,
    tables: &mut Tables<R, M>,
) {
    if nodes.is_empty() {
        return;
    }

    // Visit order: literals, then mixed segments, then the simple field.
    // Stable, so siblings of one kind keep their registration order.
    let mut ordered: Vec<&Node<R, M>> = nodes.iter().collect();
    ordered.sort_by_key(|node| match node.kind {
        SegmentKind::Literal => 0u8,
        SegmentKind::ComplexField { .. } => 1,
        SegmentKind::SimpleField { .. } => 2,
    });

    // Once any field child appears among multiple siblings, more than one
    // branch may need to be tried, so the fast no-match return is disabled
    // for this level and everything below it.
    if fast_return && ordered.len() > 1 && ordered.iter().any(|node| node.is_field()) {
        fast_return = false;
    }

    let mut outer = Vec::new();
    let mut found_simple = false;

    for node in ordered {
        let mut params_stack = params_stack.to_vec();
        let mut emitter = Emitter::new();
        let mut consumes_remaining = false;

        match &node.kind {
            SegmentKind::Literal => {
                emitter.open(Parent::Literal {
                    index: level,
                    literal: node.raw.clone(),
                });
            }
            SegmentKind::ComplexField { pattern, .. } => {
                let pattern_ix = tables.patterns.len();
                tables.patterns.push(pattern.clone());
                emitter.open(Parent::Pattern {
                    index: level,
                    pattern: pattern_ix,
                });

                if node.converters.is_empty() {
                    let slot = params_stack.len();
                    tables.allot_slot(slot);
                    emitter.push(Construct::StashGroups {
                        slot,
                        prefetched: false,
                    });
                    params_stack.push(Construct::SetParamsFromGroups { slot });
                } else {
                    // Unroll the converter list into nested guards, each
                    // popping its capture from the prefetched group map.
                    emitter.push(Construct::PrefetchGroups);
                    for binding in &node.converters {
                        debug_assert!(!binding.consumes_remaining);

                        let converter_ix = tables.converters.len();
                        tables.converters.push(Arc::clone(&binding.instance));
                        emitter.push(Construct::SetFragmentFromGroup {
                            name: binding.field.clone(),
                        });

                        let slot = params_stack.len();
                        tables.allot_slot(slot);
                        emitter.open(Parent::Converted {
                            slot,
                            converter: converter_ix,
                        });
                        params_stack.push(Construct::SetParamFromSlot {
                            name: binding.field.clone(),
                            slot,
                        });
                    }

                    // Fields without converters ride along from the group
                    // map that remains after the pops above.
                    if node.num_fields > node.converters.len() {
                        let slot = params_stack.len();
                        tables.allot_slot(slot);
                        emitter.push(Construct::StashGroups {
                            slot,
                            prefetched: true,
                        });
                        params_stack.push(Construct::SetParamsFromGroups { slot });
                    }
                }
            }
            SegmentKind::SimpleField { name } => {
                if let Some(binding) = node.converters.first() {
                    debug_assert_eq!(node.converters.len(), 1);

                    if binding.consumes_remaining {
                        consumes_remaining = true;
                        emitter.push(Construct::SetFragmentFromRemaining { index: level });
                    } else {
                        emitter.push(Construct::SetFragmentFromPath { index: level });
                    }

                    let converter_ix = tables.converters.len();
                    tables.converters.push(Arc::clone(&binding.instance));

                    let slot = params_stack.len();
                    tables.allot_slot(slot);
                    emitter.open(Parent::Converted {
                        slot,
                        converter: converter_ix,
                    });
                    params_stack.push(Construct::SetParamFromSlot {
                        name: name.clone(),
                        slot,
                    });
                } else {
                    params_stack.push(Construct::SetParamFromPath {
                        name: name.clone(),
                        index: level,
                    });
                }
                found_simple = true;
            }
        }

        let binding_ix = node.terminal.as_ref().map(|terminal| {
            let ix = tables.bindings.len();
            tables.bindings.push(terminal.clone());
            ix
        });

        debug_assert!(!(consumes_remaining && !node.children.is_empty()));

        generate_level(
            &node.children,
            emitter.current(),
            &params_stack,
            level + 1,
            fast_return,
            tables,
        );

        match binding_ix {
            None => {
                if fast_return {
                    emitter.push(Construct::ReturnNone);
                }
            }
            Some(binding) if consumes_remaining => {
                // The converter swallows the remainder, so no trailing
                // length check applies.
                for assign in &params_stack {
                    emitter.push(assign.clone());
                }
                emitter.push(Construct::ReturnMatch { binding });
            }
            Some(binding) => {
                // The full path must be consumed, so that `/foo/42/bar`
                // does not match `/foo/{id}`.
                let mut children = params_stack.clone();
                children.push(Construct::ReturnMatch { binding });
                emitter.push(Construct::IfPathLengthEq {
                    len: level + 1,
                    children,
                });
                if fast_return {
                    emitter.push(Construct::ReturnNone);
                }
            }
        }

        outer.append(&mut emitter.finish());
    }

    if !found_simple && fast_return {
        outer.push(Construct::ReturnNone);
    }

    out.push(Construct::IfPathLengthGt {
        len: level,
        children: outer,
    });
}

enum Parent {
    Literal { index: usize, literal: String },
    Pattern { index: usize, pattern: usize },
    Converted { slot: usize, converter: usize },
}

/// Builds one node's construct chain. `open` starts a nested guard that
/// every later `push` lands in; `finish` folds the chain back together.
struct Emitter {
    base: Vec<Construct>,
    stack: Vec<(Parent, Vec<Construct>)>,
}

impl Emitter {
    fn new() -> Emitter {
        Emitter {
            base: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn current(&mut self) -> &mut Vec<Construct> {
        match self.stack.last_mut() {
            Some((_, children)) => children,
            None => &mut self.base,
        }
    }

    fn push(&mut self, construct: Construct) {
        self.current().push(construct);
    }

    fn open(&mut self, parent: Parent) {
        self.stack.push((parent, Vec::new()));
    }

    fn finish(mut self) -> Vec<Construct> {
        while let Some((parent, children)) = self.stack.pop() {
            let construct = match parent {
                Parent::Literal { index, literal } => Construct::IfSegmentLiteral {
                    index,
                    literal,
                    children,
                },
                Parent::Pattern { index, pattern } => Construct::IfSegmentPattern {
                    index,
                    pattern,
                    children,
                },
                Parent::Converted { slot, converter } => Construct::IfConverted {
                    slot,
                    converter,
                    children,
                },
            };
            self.current().push(construct);
        }
        self.base
    }
}
