//! Static per-subtree subscriber sets.
//!
//! A node deciding whether to skip a subtree needs to know whether any
//! descendant subscribes to a cell. That awareness is resolved statically:
//! each subtree is tagged with the set of cells subscribed below it,
//! computed bottom-up once per tree shape change, so no live back-reference
//! graph is needed during propagation.

use super::{Component, NodeId, Tree};
use crate::context::{CellId, ContextCell};
use std::collections::{HashMap, HashSet};

/// Per-subtree "contains subscribers to cell C" sets.
#[derive(Debug, Default)]
pub struct SubscriberIndex {
    below: HashMap<usize, HashSet<CellId>>,
}

impl SubscriberIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the index for the current tree shape.
    pub fn rebuild(&mut self, tree: &Tree) {
        self.below.clear();
        if let Some(root) = tree.root() {
            let _ = self.collect(tree, root);
        }
    }

    fn collect(&mut self, tree: &Tree, id: NodeId) -> HashSet<CellId> {
        let mut cells = HashSet::new();
        if let Ok(node) = tree.node(id) {
            if let Component::Consumer(kind) = &node.component {
                cells.insert(kind.cell().id());
            }
            for child in &node.children {
                cells.extend(self.collect(tree, *child));
            }
        }
        self.below.insert(id.0, cells.clone());
        cells
    }

    /// Whether the subtree rooted at `id` (inclusive) subscribes to `cell`.
    #[must_use]
    pub fn subtree_subscribes(&self, id: NodeId, cell: &ContextCell) -> bool {
        self.below
            .get(&id.0)
            .is_some_and(|cells| cells.contains(&cell.id()))
    }

    /// Whether the subtree rooted at `id` subscribes to any of `cells`.
    #[must_use]
    pub fn subtree_subscribes_any<'a>(
        &self,
        id: NodeId,
        cells: impl IntoIterator<Item = &'a CellId>,
    ) -> bool {
        self.below.get(&id.0).is_some_and(|below| {
            cells.into_iter().any(|cell| below.contains(cell))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{declare_cell, ContextValue};
    use crate::tree::{Output, RenderFn};
    use std::sync::Arc;

    fn render() -> RenderFn {
        Arc::new(|_: &ContextValue| Output::Empty)
    }

    #[test]
    fn test_bottom_up_sets() {
        let theme = declare_cell("theme", ContextValue::undefined());
        let locale = declare_cell("locale", ContextValue::undefined());

        let mut tree = crate::tree::Tree::new();
        let theme_consumer = tree.consumer(theme.clone(), render());
        let locale_consumer = tree.consumer(locale.clone(), render());
        let left = tree.host("div", vec![theme_consumer]);
        let right = tree.host("div", vec![locale_consumer]);
        let root = tree.host("body", vec![left, right]);
        tree.set_root(root);

        let mut index = SubscriberIndex::new();
        index.rebuild(&tree);

        assert!(index.subtree_subscribes(root, &theme));
        assert!(index.subtree_subscribes(root, &locale));
        assert!(index.subtree_subscribes(left, &theme));
        assert!(!index.subtree_subscribes(left, &locale));
        assert!(!index.subtree_subscribes(right, &theme));
        assert!(index.subtree_subscribes(theme_consumer, &theme));
    }

    #[test]
    fn test_rebuild_after_shape_change() {
        let theme = declare_cell("theme", ContextValue::undefined());

        let mut tree = crate::tree::Tree::new();
        let consumer = tree.consumer(theme.clone(), render());
        let root = tree.host("body", vec![consumer]);
        tree.set_root(root);

        let mut index = SubscriberIndex::new();
        index.rebuild(&tree);
        assert!(index.subtree_subscribes(root, &theme));

        tree.detach_child(root, consumer).unwrap();
        tree.remove_subtree(consumer).unwrap();
        index.rebuild(&tree);
        assert!(!index.subtree_subscribes(root, &theme));
    }

    #[test]
    fn test_subscribes_any() {
        let theme = declare_cell("theme", ContextValue::undefined());
        let locale = declare_cell("locale", ContextValue::undefined());

        let mut tree = crate::tree::Tree::new();
        let consumer = tree.consumer(theme.clone(), render());
        let root = tree.host("body", vec![consumer]);
        tree.set_root(root);

        let mut index = SubscriberIndex::new();
        index.rebuild(&tree);

        let theme_id = theme.id();
        let locale_id = locale.id();
        assert!(index.subtree_subscribes_any(root, [&theme_id, &locale_id]));
        assert!(!index.subtree_subscribes_any(root, [&locale_id]));
    }
}
