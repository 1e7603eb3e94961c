#![forbid(unsafe_code)]

use super::LayoutPositions;
use crate::model::Position;
use crate::tree::GoalForest;

const ROOT_SPACING: i64 = 400;
const ROOT_Y: i64 = 50;
const CHILD_SPACING: i64 = 200;
const CHILD_DROP: i64 = 200;

/// Grid placement for every node, ignoring persisted coordinates.
pub fn seed_positions(forest: &GoalForest) -> LayoutPositions {
    place(forest, false)
}

/// Persisted coordinates where a node has them, grid seeding elsewhere.
/// Children of a placed parent are seeded relative to that placement.
pub fn effective_positions(forest: &GoalForest) -> LayoutPositions {
    place(forest, true)
}

/// Slot `k` of `count` children centred under `origin`.
pub(crate) fn child_slot(origin: Position, k: usize, count: usize) -> Position {
    let k = k as i64;
    let count = count as i64;
    origin.offset(
        k * CHILD_SPACING - (count - 1) * (CHILD_SPACING / 2),
        CHILD_DROP,
    )
}

fn place(forest: &GoalForest, keep_persisted: bool) -> LayoutPositions {
    let mut slots = vec![Position::UNPLACED; forest.len()];
    for (i, root) in forest.roots().iter().enumerate() {
        slots[root.get()] = Position::new(i as i64 * ROOT_SPACING, ROOT_Y);
    }
    // Pre-order guarantees the parent's slot is final before its children are seeded.
    for (idx, node) in forest.iter() {
        let persisted = node.record.position();
        if keep_persisted && persisted.is_placed() {
            slots[idx.get()] = persisted;
        }
        let origin = slots[idx.get()];
        let count = node.children.len();
        for (k, child) in node.children.iter().enumerate() {
            slots[child.get()] = child_slot(origin, k, count);
        }
    }
    forest
        .iter()
        .map(|(idx, node)| (node.id(), slots[idx.get()]))
        .collect()
}
