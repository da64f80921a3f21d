//! The routing tree: one node per template segment, with conflict
//! detection at insertion time.

use log::trace;

use crate::error::UnacceptableRouteError;
use crate::template::ParsedTemplate;
use crate::tree::node::{Node, ParsedSegment, SegmentKind, Terminal};

pub(crate) mod node;
pub(crate) mod regex;

/// The authoritative routing data model. Templates are inserted one
/// segment at a time; lookups never touch the tree directly but run the
/// decision program compiled from it.
pub(crate) struct Tree<R, M> {
    roots: Vec<Node<R, M>>,
}

impl<R, M> Tree<R, M> {
    pub(crate) fn new() -> Tree<R, M> {
        Tree { roots: Vec::new() }
    }

    /// The top-level segment nodes.
    pub(crate) fn roots(&self) -> &[Node<R, M>] {
        &self.roots
    }

    /// Insert a validated template, writing `terminal` at its final
    /// segment. On any error the tree is left exactly as it was: the
    /// conflict checks run before mutation and a fresh branch is built
    /// completely before being attached.
    pub(crate) fn insert(
        &mut self,
        template: &ParsedTemplate,
        terminal: Terminal<R, M>,
    ) -> Result<(), UnacceptableRouteError> {
        trace!(" inserting template `{}`", template.raw);
        insert_at(&mut self.roots, template, 0, terminal)
    }
}

fn insert_at<R, M>(
    nodes: &mut Vec<Node<R, M>>,
    template: &ParsedTemplate,
    index: usize,
    terminal: Terminal<R, M>,
) -> Result<(), UnacceptableRouteError> {
    let segment = &template.segments[index];
    let last = index == template.segments.len() - 1;

    for node in nodes.iter_mut() {
        if node.matches(&segment.raw) {
            if last {
                // Re-registering the same path replaces the binding.
                if node.terminal.is_some() {
                    trace!(" replacing binding for `{}`", template.raw);
                }
                node.terminal = Some(terminal);
                return Ok(());
            }
            if let Some(binding) = node.consuming_converter() {
                return Err(UnacceptableRouteError::ConsumingConverterWithChildren {
                    template: template.raw.clone(),
                    field: binding.field.clone(),
                    converter: binding.name.clone(),
                });
            }
            return insert_at(&mut node.children, template, index + 1, terminal);
        }

        if node.conflicts_with(segment) {
            return Err(UnacceptableRouteError::ConflictingTemplate {
                segment: segment.raw.clone(),
            });
        }
    }

    // No sibling matched: the rest of the template becomes a fresh branch,
    // validated and built in full before it is attached.
    let branch = build_branch(template, index, terminal)?;
    nodes.push(branch);
    Ok(())
}

fn build_branch<R, M>(
    template: &ParsedTemplate,
    index: usize,
    terminal: Terminal<R, M>,
) -> Result<Node<R, M>, UnacceptableRouteError> {
    let segment = &template.segments[index];
    let last = index == template.segments.len() - 1;

    check_consuming_converter(template, segment, last)?;

    let mut node = Node::from_segment(segment);
    if last {
        node.terminal = Some(terminal);
    } else {
        node.children
            .push(build_branch(template, index + 1, terminal)?);
    }
    Ok(node)
}

fn check_consuming_converter(
    template: &ParsedTemplate,
    segment: &ParsedSegment,
    last: bool,
) -> Result<(), UnacceptableRouteError> {
    let binding = match segment.consuming_converter() {
        Some(binding) => binding,
        None => return Ok(()),
    };

    if let SegmentKind::ComplexField { .. } = segment.kind {
        return Err(UnacceptableRouteError::ConsumingConverterInComplexSegment {
            field: binding.field.clone(),
            converter: binding.name.clone(),
        });
    }
    if !last {
        return Err(UnacceptableRouteError::ConsumingConverterWithChildren {
            template: template.raw.clone(),
            field: binding.field.clone(),
            converter: binding.name.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::options::ConverterMap;
    use crate::template::parse_template;

    fn terminal(template: &str) -> Terminal<&'static str, ()> {
        Terminal {
            resource: Arc::new("resource"),
            method_map: Arc::new(()),
            template: Arc::from(template),
        }
    }

    fn insert(tree: &mut Tree<&'static str, ()>, template: &str) -> Result<(), UnacceptableRouteError> {
        let converters = ConverterMap::with_builtins();
        let parsed = parse_template(template, &converters).unwrap();
        tree.insert(&parsed, terminal(template))
    }

    #[test]
    fn shared_prefixes_share_nodes() {
        let mut tree = Tree::new();
        insert(&mut tree, "/a/b").unwrap();
        insert(&mut tree, "/a/c").unwrap();

        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.roots()[0].children.len(), 2);
    }

    #[test]
    fn simple_field_siblings_conflict() {
        let mut tree = Tree::new();
        insert(&mut tree, "/a/{x}").unwrap();

        match insert(&mut tree, "/a/{y}") {
            Err(UnacceptableRouteError::ConflictingTemplate { segment }) => {
                assert_eq!(segment, "{y}");
            }
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[test]
    fn complex_siblings_conflict_only_on_matching_shape() {
        let mut tree = Tree::new();
        insert(&mut tree, "/img/{name}.{ext}").unwrap();
        insert(&mut tree, "/img/{name}.detail.{ext}").unwrap();

        assert!(insert(&mut tree, "/img/{stem}.{suffix}").is_err());
    }

    #[test]
    fn literal_never_conflicts_with_fields() {
        let mut tree = Tree::new();
        insert(&mut tree, "/a/{x}").unwrap();
        insert(&mut tree, "/a/all").unwrap();
        insert(&mut tree, "/a/{v}.{w}").unwrap();

        assert_eq!(tree.roots()[0].children.len(), 3);
    }

    #[test]
    fn consuming_converter_must_terminate_the_template() {
        let mut tree = Tree::new();
        assert!(matches!(
            insert(&mut tree, "/files/{rest:path}/tail"),
            Err(UnacceptableRouteError::ConsumingConverterWithChildren { .. })
        ));

        insert(&mut tree, "/files/{rest:path}").unwrap();
        assert!(matches!(
            insert(&mut tree, "/files/{rest:path}/deeper"),
            Err(UnacceptableRouteError::ConsumingConverterWithChildren { .. })
        ));
    }

    #[test]
    fn consuming_converter_cannot_mix_with_literal_text() {
        let mut tree = Tree::new();
        assert!(matches!(
            insert(&mut tree, "/x/{rest:path}.zip"),
            Err(UnacceptableRouteError::ConsumingConverterInComplexSegment { .. })
        ));
        assert!(tree.roots().is_empty());
    }

    #[test]
    fn failed_insert_leaves_the_tree_untouched() {
        let mut tree = Tree::new();
        insert(&mut tree, "/a/b").unwrap();

        insert(&mut tree, "/a/{rest:path}/c").unwrap_err();

        assert_eq!(tree.roots().len(), 1);
        let a = &tree.roots()[0];
        assert_eq!(a.children.len(), 1);
        assert!(a.children[0].matches("b"));
    }

    #[test]
    fn reregistration_overwrites_the_terminal() {
        let mut tree = Tree::new();
        insert(&mut tree, "/a/b").unwrap();
        insert(&mut tree, "/a/b").unwrap();

        let a = &tree.roots()[0];
        assert_eq!(a.children.len(), 1);
        assert!(a.children[0].terminal.is_some());
    }
}
