#![forbid(unsafe_code)]

use crate::model::{GoalRecord, GoalStatus};
use crate::tree::GoalForest;

/// How leaf goals turn into a completion percentage.
///
/// Non-leaf progress is always the rounded mean of the direct children; only
/// the leaf weighting is pluggable.
pub trait ProgressPolicy {
    fn leaf_progress(&self, record: &GoalRecord) -> u8;
}

/// Done 100, In Progress 50, everything else 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusTable;

impl ProgressPolicy for StatusTable {
    fn leaf_progress(&self, record: &GoalRecord) -> u8 {
        match record.status {
            GoalStatus::Done => 100,
            GoalStatus::InProgress => 50,
            GoalStatus::NotStarted => 0,
        }
    }
}

/// Mean rounded half-up, in integer arithmetic.
pub fn rounded_mean(values: &[u8]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let sum: u64 = values.iter().map(|v| u64::from(*v)).sum();
    let n = values.len() as u64;
    ((2 * sum + n) / (2 * n)).min(100) as u8
}

/// Writes `progress` on every node, children before parents.
pub fn annotate(forest: &mut GoalForest, policy: &dyn ProgressPolicy) {
    let nodes = forest.nodes_mut();
    // Pre-order arena: walking backwards visits every child before its parent.
    for i in (0..nodes.len()).rev() {
        let progress = if nodes[i].children.is_empty() {
            policy.leaf_progress(&nodes[i].record).min(100)
        } else {
            let values: Vec<u8> = nodes[i]
                .children
                .iter()
                .map(|child| nodes[child.get()].progress)
                .collect();
            rounded_mean(&values)
        };
        nodes[i].progress = progress;
    }
}
