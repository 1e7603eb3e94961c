#![forbid(unsafe_code)]

mod assemble;

pub use assemble::Assembly;

use crate::ids::GoalId;
use crate::model::GoalRecord;
use std::collections::HashMap;

/// Position of a node inside one forest's arena. Only meaningful for the
/// forest that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct GoalTreeNode {
    pub record: GoalRecord,
    /// `None` for roots, including nodes promoted to root to break a cycle.
    pub parent: Option<NodeIndex>,
    /// Ascending creation time, ties by id.
    pub children: Vec<NodeIndex>,
    pub depth: usize,
    pub progress: u8,
    pub descendant_count: usize,
}

impl GoalTreeNode {
    pub fn id(&self) -> GoalId {
        self.record.id
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A forest assembled from one record snapshot.
///
/// Nodes live in a single arena laid out in pre-order, so every child sits at
/// a higher index than its parent and each subtree occupies a contiguous
/// range. The forest is never edited; the next snapshot produces a new one.
#[derive(Clone, Debug, Default)]
pub struct GoalForest {
    nodes: Vec<GoalTreeNode>,
    roots: Vec<NodeIndex>,
    by_id: HashMap<GoalId, NodeIndex>,
}

impl GoalForest {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn root_ids(&self) -> Vec<GoalId> {
        self.roots.iter().map(|idx| self.node(*idx).id()).collect()
    }

    pub fn node(&self, idx: NodeIndex) -> &GoalTreeNode {
        &self.nodes[idx.0]
    }

    /// Nodes in pre-order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NodeIndex, &GoalTreeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i), node))
    }

    pub fn index_of(&self, id: GoalId) -> Option<NodeIndex> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: GoalId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn get(&self, id: GoalId) -> Option<&GoalTreeNode> {
        self.index_of(id).map(|idx| self.node(idx))
    }

    pub fn parent_of(&self, id: GoalId) -> Option<GoalId> {
        let node = self.get(id)?;
        node.parent.map(|p| self.node(p).id())
    }

    pub fn children_of(&self, id: GoalId) -> Vec<GoalId> {
        self.get(id)
            .map(|node| {
                node.children
                    .iter()
                    .map(|child| self.node(*child).id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ancestors from the direct parent up to the root.
    pub fn ancestors(&self, id: GoalId) -> Vec<GoalId> {
        let mut out = Vec::new();
        let mut current = self.index_of(id).and_then(|idx| self.node(idx).parent);
        while let Some(idx) = current {
            let node = self.node(idx);
            out.push(node.id());
            current = node.parent;
        }
        out
    }

    /// Copy of the tree rooted at `id`, with `id` as its only root.
    pub fn subtree(&self, id: GoalId) -> Option<GoalForest> {
        let start = self.index_of(id)?.0;
        let end = start + self.nodes[start].descendant_count;
        let shift = |idx: NodeIndex| NodeIndex(idx.0 - start);

        let mut nodes = Vec::with_capacity(end - start + 1);
        let mut by_id = HashMap::with_capacity(end - start + 1);
        let base_depth = self.nodes[start].depth;
        for (offset, node) in self.nodes[start..=end].iter().enumerate() {
            let mut copy = node.clone();
            copy.parent = if offset == 0 { None } else { node.parent.map(shift) };
            copy.children = node.children.iter().copied().map(shift).collect();
            copy.depth = node.depth - base_depth;
            by_id.insert(copy.id(), NodeIndex(offset));
            nodes.push(copy);
        }
        Some(GoalForest {
            nodes,
            roots: vec![NodeIndex(0)],
            by_id,
        })
    }

    /// All records of the forest in pre-order.
    pub fn records(&self) -> impl Iterator<Item = &GoalRecord> {
        self.nodes.iter().map(|node| &node.record)
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [GoalTreeNode] {
        &mut self.nodes
    }
}
