#![forbid(unsafe_code)]

use crate::ids::GoalId;
use crate::tree::GoalForest;
use std::collections::HashSet;

/// Ids visible on the canvas: roots, plus every node whose parent is visible
/// and not collapsed. Derived on every render, never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilitySet {
    visible: HashSet<GoalId>,
}

impl VisibilitySet {
    pub fn compute(forest: &GoalForest) -> Self {
        let mut flags = vec![false; forest.len()];
        let mut visible = HashSet::with_capacity(forest.len());
        // Pre-order: a parent's flag is settled before any of its children.
        for (idx, node) in forest.iter() {
            let shown = match node.parent {
                None => true,
                Some(parent) => flags[parent.get()] && !forest.node(parent).record.collapsed,
            };
            flags[idx.get()] = shown;
            if shown {
                visible.insert(node.id());
            }
        }
        Self { visible }
    }

    pub fn is_visible(&self, id: GoalId) -> bool {
        self.visible.contains(&id)
    }

    /// Edges are hidden when either end is hidden or the parent is collapsed.
    pub fn is_edge_visible(&self, forest: &GoalForest, parent: GoalId, child: GoalId) -> bool {
        let parent_collapsed = forest.get(parent).is_some_and(|node| node.record.collapsed);
        self.is_visible(parent) && self.is_visible(child) && !parent_collapsed
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{id, open};

    fn forest(collapsed: &[i64]) -> GoalForest {
        let mut records = vec![
            open(1, None),
            open(2, Some(1)),
            open(3, Some(2)),
            open(4, Some(3)),
            open(5, Some(1)),
        ];
        for record in records.iter_mut() {
            record.collapsed = collapsed.contains(&record.id.get());
        }
        GoalForest::assemble(records).forest
    }

    #[test]
    fn everything_visible_without_collapse() {
        let plain = forest(&[]);
        let set = VisibilitySet::compute(&plain);
        assert_eq!(set.len(), 5);
        assert!(set.is_edge_visible(&plain, id(3), id(4)));
    }

    #[test]
    fn collapse_hides_descendants_but_not_the_node() {
        let collapsed = forest(&[2]);
        let set = VisibilitySet::compute(&collapsed);
        assert!(set.is_visible(id(2)));
        assert!(!set.is_visible(id(3)));
        assert!(!set.is_visible(id(4)));
        assert!(set.is_visible(id(5)));
        assert!(set.is_edge_visible(&collapsed, id(1), id(2)));
        assert!(!set.is_edge_visible(&collapsed, id(2), id(3)));
        assert!(!set.is_edge_visible(&collapsed, id(3), id(4)));
    }

    #[test]
    fn collapsed_ancestor_wins_over_expanded_descendant() {
        let collapsed = forest(&[1, 3]);
        let set = VisibilitySet::compute(&collapsed);
        assert_eq!(set.len(), 1);
        assert!(set.is_visible(id(1)));

        // Expanding the root restores everything down to the still collapsed node.
        let expanded = forest(&[3]);
        let set = VisibilitySet::compute(&expanded);
        assert!(set.is_visible(id(3)));
        assert!(!set.is_visible(id(4)));
    }
}
