#![forbid(unsafe_code)]

use crate::error::GoalError;
use crate::ids::GoalId;
use crate::model::{GoalPatch, GoalRecord, NewGoal, PositionUpdate};

/// Authoritative flat storage for goal records.
///
/// Implementations own referential integrity: `create` checks that the parent
/// exists, `update` rejects parent reassignments that would form a cycle, and
/// `delete` removes the whole subtree. `update_positions` must be atomic: either
/// every entry is written or none is.
pub trait RecordStore {
    type Error: Into<GoalError>;

    fn list_all(&mut self) -> Result<Vec<GoalRecord>, Self::Error>;

    fn get(&mut self, id: GoalId) -> Result<Option<GoalRecord>, Self::Error>;

    /// Direct children ordered by creation time. `None` lists the roots.
    fn list_children(&mut self, parent: Option<GoalId>) -> Result<Vec<GoalRecord>, Self::Error>;

    fn create(&mut self, goal: NewGoal) -> Result<GoalRecord, Self::Error>;

    fn update(&mut self, id: GoalId, patch: GoalPatch) -> Result<GoalRecord, Self::Error>;

    /// Returns whether a record was removed.
    fn delete(&mut self, id: GoalId) -> Result<bool, Self::Error>;

    /// Returns the number of rows written.
    fn update_positions(&mut self, batch: &[PositionUpdate]) -> Result<usize, Self::Error>;
}
