#![forbid(unsafe_code)]

use crate::ids::GoalId;
use crate::model::{GoalPriority, GoalRecord, GoalStatus};

pub(crate) fn id(value: i64) -> GoalId {
    GoalId::try_new(value).expect("test ids are positive")
}

/// Record created at `id * 10` ms so creation order follows id order.
pub(crate) fn record(value: i64, parent: Option<i64>, status: GoalStatus) -> GoalRecord {
    GoalRecord {
        id: id(value),
        parent_id: parent.map(id),
        title: format!("Goal {value}"),
        description: None,
        status,
        color: None,
        priority: GoalPriority::None,
        x: 0,
        y: 0,
        collapsed: false,
        created_at_ms: value * 10,
        updated_at_ms: value * 10,
    }
}

pub(crate) fn open(value: i64, parent: Option<i64>) -> GoalRecord {
    record(value, parent, GoalStatus::NotStarted)
}
