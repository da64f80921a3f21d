//! Executes the decision program against a pre-split request path.

use std::borrow::Cow;
use std::collections::HashMap;
use std::mem;

use crate::converters::{FieldValue, Fragment, ParamMap};
use crate::program::{CompiledMatcher, Construct};

/// Per-lookup scratch state. Parameter writes land in `params` only via
/// the deferred assignment constructs, immediately before a return, so a
/// branch that fails partway through leaves nothing behind.
struct Scratch<'p> {
    fragment: Option<Fragment<'p>>,
    captures: HashMap<String, String>,
    groups: HashMap<String, String>,
    slots: Vec<Option<SlotValue>>,
    params: ParamMap,
}

enum SlotValue {
    Value(FieldValue),
    Groups(HashMap<String, String>),
}

enum Flow {
    Continue,
    Return(Option<usize>),
}

impl<R, M> CompiledMatcher<R, M> {
    /// Run the program. Returns the binding index of the first matching
    /// route and the extracted parameters, or `None`.
    pub(crate) fn lookup(&self, path: &[&str]) -> Option<(usize, ParamMap)> {
        let mut scratch = Scratch {
            fragment: None,
            captures: HashMap::new(),
            groups: HashMap::new(),
            slots: (0..self.slot_count).map(|_| None).collect(),
            params: ParamMap::new(),
        };

        match self.run(&self.program, path, &mut scratch) {
            Flow::Return(Some(binding)) => Some((binding, mem::take(&mut scratch.params))),
            _ => None,
        }
    }

    fn run<'p>(
        &self,
        constructs: &[Construct],
        path: &'p [&'p str],
        scratch: &mut Scratch<'p>,
    ) -> Flow {
        for construct in constructs {
            match construct {
                Construct::IfPathLengthGt { len, children } => {
                    if path.len() > *len {
                        match self.run(children, path, scratch) {
                            Flow::Continue => {}
                            flow => return flow,
                        }
                    }
                }
                Construct::IfPathLengthEq { len, children } => {
                    if path.len() == *len {
                        match self.run(children, path, scratch) {
                            Flow::Continue => {}
                            flow => return flow,
                        }
                    }
                }
                Construct::IfSegmentLiteral {
                    index,
                    literal,
                    children,
                } => {
                    if path[*index] == literal.as_str() {
                        match self.run(children, path, scratch) {
                            Flow::Continue => {}
                            flow => return flow,
                        }
                    }
                }
                Construct::IfSegmentPattern {
                    index,
                    pattern,
                    children,
                } => {
                    if let Some(captures) = self.patterns[*pattern].captures(path[*index]) {
                        scratch.captures = captures;
                        match self.run(children, path, scratch) {
                            Flow::Continue => {}
                            flow => return flow,
                        }
                    }
                }
                Construct::IfConverted {
                    slot,
                    converter,
                    children,
                } => {
                    let converted = scratch
                        .fragment
                        .as_ref()
                        .and_then(|fragment| self.converters[*converter].convert(fragment));
                    if let Some(value) = converted {
                        scratch.slots[*slot] = Some(SlotValue::Value(value));
                        match self.run(children, path, scratch) {
                            Flow::Continue => {}
                            flow => return flow,
                        }
                    }
                }
                Construct::SetFragmentFromPath { index } => {
                    scratch.fragment = Some(Fragment::Segment(Cow::Borrowed(path[*index])));
                }
                Construct::SetFragmentFromRemaining { index } => {
                    scratch.fragment = Some(Fragment::Remaining(&path[*index..]));
                }
                Construct::SetFragmentFromGroup { name } => {
                    scratch.fragment = scratch
                        .groups
                        .remove(name)
                        .map(|value| Fragment::Segment(Cow::Owned(value)));
                }
                Construct::PrefetchGroups => {
                    scratch.groups = scratch.captures.clone();
                }
                Construct::StashGroups { slot, prefetched } => {
                    let groups = if *prefetched {
                        scratch.groups.clone()
                    } else {
                        scratch.captures.clone()
                    };
                    scratch.slots[*slot] = Some(SlotValue::Groups(groups));
                }
                Construct::SetParamFromPath { name, index } => {
                    scratch
                        .params
                        .insert(name.clone(), FieldValue::Segment(path[*index].to_string()));
                }
                Construct::SetParamFromSlot { name, slot } => {
                    if let Some(SlotValue::Value(value)) = scratch.slots[*slot].take() {
                        scratch.params.insert(name.clone(), value);
                    }
                }
                Construct::SetParamsFromGroups { slot } => {
                    if let Some(SlotValue::Groups(groups)) = scratch.slots[*slot].take() {
                        scratch.params.extend(
                            groups
                                .into_iter()
                                .map(|(name, value)| (name, FieldValue::Segment(value))),
                        );
                    }
                }
                Construct::ReturnNone => return Flow::Return(None),
                Construct::ReturnMatch { binding } => return Flow::Return(Some(*binding)),
            }
        }
        Flow::Continue
    }
}
