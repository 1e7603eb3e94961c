#![forbid(unsafe_code)]

//! Structural edits that have to treat a whole subtree as one unit.
//!
//! Nothing here touches the record store. Each function reads an assembled
//! forest and returns the patches or position batches a caller should write;
//! the caller then re-assembles from the store.

use crate::error::GoalError;
use crate::ids::GoalId;
use crate::layout::{LayoutPositions, child_slot};
use crate::model::{GoalPatch, Position, PositionUpdate};
use crate::tree::GoalForest;

/// Every transitive descendant of `root`, parents before children.
/// Empty when `root` is unknown.
pub fn descendants(forest: &GoalForest, root: GoalId) -> Vec<GoalId> {
    let Some(start) = forest.index_of(root) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut stack: Vec<_> = forest.node(start).children.iter().rev().copied().collect();
    while let Some(idx) = stack.pop() {
        let node = forest.node(idx);
        out.push(node.id());
        stack.extend(node.children.iter().rev().copied());
    }
    out
}

/// `root` followed by all of its descendants.
pub fn subtree_ids(forest: &GoalForest, root: GoalId) -> Result<Vec<GoalId>, GoalError> {
    if !forest.contains(root) {
        return Err(GoalError::NotFound { id: root });
    }
    let mut out = vec![root];
    out.extend(descendants(forest, root));
    Ok(out)
}

/// The root of the tree that contains `id`.
pub fn forest_root(forest: &GoalForest, id: GoalId) -> Option<GoalId> {
    let mut idx = forest.index_of(id)?;
    while let Some(parent) = forest.node(idx).parent {
        idx = parent;
    }
    Some(forest.node(idx).id())
}

/// Shifts every listed position by the same delta. Ids without a position are skipped.
pub fn translate_subtree(positions: &mut LayoutPositions, ids: &[GoalId], dx: i64, dy: i64) {
    for id in ids {
        if let Some(position) = positions.get_mut(id) {
            *position = position.offset(dx, dy);
        }
    }
}

/// One drag gesture on a goal. The whole subtree follows the dragged node.
///
/// `step` takes the movement since the previous step, never since the drag
/// started, so replaying a step sequence lands on the same positions.
#[derive(Clone, Debug)]
pub struct DragSession {
    root: GoalId,
    members: Vec<GoalId>,
    positions: LayoutPositions,
    moved: (i64, i64),
}

impl DragSession {
    /// Captures the subtree under `root` and the current positions of its members.
    pub fn begin(
        forest: &GoalForest,
        positions: &LayoutPositions,
        root: GoalId,
    ) -> Result<Self, GoalError> {
        let members = subtree_ids(forest, root)?;
        let positions = members
            .iter()
            .map(|id| (*id, positions.get(id).copied().unwrap_or_default()))
            .collect();
        Ok(Self {
            root,
            members,
            positions,
            moved: (0, 0),
        })
    }

    pub fn root(&self) -> GoalId {
        self.root
    }

    pub fn members(&self) -> &[GoalId] {
        &self.members
    }

    pub fn positions(&self) -> &LayoutPositions {
        &self.positions
    }

    pub fn total_delta(&self) -> (i64, i64) {
        self.moved
    }

    pub fn step(&mut self, dx: i64, dy: i64) {
        translate_subtree(&mut self.positions, &self.members, dx, dy);
        self.moved = (self.moved.0.saturating_add(dx), self.moved.1.saturating_add(dy));
    }

    /// Step expressed as the dragged node's new absolute position, which is
    /// what canvases usually report.
    pub fn step_to(&mut self, target: Position) {
        let current = self.positions.get(&self.root).copied().unwrap_or_default();
        self.step(
            target.x.saturating_sub(current.x),
            target.y.saturating_sub(current.y),
        );
    }

    /// Final positions of the root and every moved descendant as one batch.
    /// Empty when the drag ended where it started.
    pub fn finish(self) -> Vec<PositionUpdate> {
        if self.moved == (0, 0) {
            return Vec::new();
        }
        self.members
            .iter()
            .filter_map(|id| self.positions.get(id).map(|p| PositionUpdate::new(*id, *p)))
            .collect()
    }
}

/// Patch flipping the collapsed flag of `id` and nothing else.
pub fn toggle_collapsed(forest: &GoalForest, id: GoalId) -> Result<GoalPatch, GoalError> {
    let node = forest.get(id).ok_or(GoalError::NotFound { id })?;
    Ok(GoalPatch::collapsed(!node.record.collapsed))
}

/// What a cascade delete of `root` removes, root first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletePlan {
    pub root: GoalId,
    pub removed: Vec<GoalId>,
}

pub fn plan_delete(forest: &GoalForest, root: GoalId) -> Result<DeletePlan, GoalError> {
    Ok(DeletePlan {
        root,
        removed: subtree_ids(forest, root)?,
    })
}

/// Grid slot for a new child appended under `parent`, matching the seeding
/// rule with the parent's child count raised by one.
pub fn next_child_position(
    forest: &GoalForest,
    positions: &LayoutPositions,
    parent: GoalId,
) -> Result<Position, GoalError> {
    let node = forest.get(parent).ok_or(GoalError::NotFound { id: parent })?;
    let origin = positions.get(&parent).copied().unwrap_or_default();
    let k = node.children.len();
    let slot = child_slot(origin, k, k + 1);
    // New goals must not start at negative coordinates.
    Ok(Position::new(slot.x.max(0), slot.y.max(0)))
}
