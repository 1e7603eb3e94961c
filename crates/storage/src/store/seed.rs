#![forbid(unsafe_code)]

use super::goals::insert_goal_tx;
use super::{SqliteStore, StoreError};
use gm_core::time::now_ms;
use gm_core::{GoalRecord, GoalStatus, NewGoal};
use tracing::info;

struct SeedGoal {
    title: &'static str,
    description: &'static str,
    /// Index of the parent inside `DEMO_GOALS`.
    parent: Option<usize>,
    status: GoalStatus,
    color: &'static str,
}

const fn seed(
    title: &'static str,
    description: &'static str,
    parent: Option<usize>,
    status: GoalStatus,
    color: &'static str,
) -> SeedGoal {
    SeedGoal {
        title,
        description,
        parent,
        status,
        color,
    }
}

const DEMO_GOALS: &[SeedGoal] = &[
    seed(
        "Build \"1%\" App",
        "Create the ultimate goal visualization tool",
        None,
        GoalStatus::InProgress,
        "#6366f1",
    ),
    seed(
        "Backend Architecture",
        "Storage engine and record API",
        Some(0),
        GoalStatus::InProgress,
        "#ec4899",
    ),
    seed(
        "Database Schema",
        "Design tables for goals and users",
        Some(1),
        GoalStatus::Done,
        "#ec4899",
    ),
    seed(
        "API Endpoints",
        "CRUD operations for goals",
        Some(1),
        GoalStatus::InProgress,
        "#ec4899",
    ),
    seed(
        "Frontend Interface",
        "Canvas front end over the goal engine",
        Some(0),
        GoalStatus::NotStarted,
        "#3b82f6",
    ),
    seed(
        "Infinite Canvas",
        "Implement node-based goal visualization",
        Some(4),
        GoalStatus::NotStarted,
        "#3b82f6",
    ),
    seed(
        "Drag & Drop",
        "Allow rearranging goals",
        Some(5),
        GoalStatus::NotStarted,
        "#3b82f6",
    ),
    seed(
        "Zoom & Pan",
        "Navigation controls",
        Some(5),
        GoalStatus::NotStarted,
        "#3b82f6",
    ),
    seed(
        "UI/UX Design",
        "Modern, dark-themed aesthetic",
        Some(0),
        GoalStatus::Done,
        "#10b981",
    ),
    seed(
        "Color Palette",
        "Define primary and accent colors",
        Some(8),
        GoalStatus::Done,
        "#10b981",
    ),
    seed(
        "Typography",
        "Select readable and sleek fonts",
        Some(8),
        GoalStatus::Done,
        "#10b981",
    ),
];

impl SqliteStore {
    /// Replaces every goal with the demo tree and restarts id numbering.
    /// Returns the inserted records in insertion order.
    pub fn seed_demo(&mut self) -> Result<Vec<GoalRecord>, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM goals", [])?;
        tx.execute("DELETE FROM sqlite_sequence WHERE name='goals'", [])?;

        let base = now_ms();
        let mut inserted: Vec<GoalRecord> = Vec::with_capacity(DEMO_GOALS.len());
        for (offset, goal) in (0i64..).zip(DEMO_GOALS) {
            let parent_id = match goal.parent {
                Some(index) => Some(
                    inserted
                        .get(index)
                        .map(|parent| parent.id)
                        .ok_or(StoreError::InvalidInput("seed parent must precede its child"))?,
                ),
                None => None,
            };
            let new_goal = NewGoal {
                title: goal.title.to_string(),
                description: Some(goal.description.to_string()),
                parent_id,
                status: Some(goal.status),
                color: Some(goal.color.to_string()),
                ..NewGoal::default()
            };
            inserted.push(insert_goal_tx(&tx, &new_goal, base + offset)?);
        }

        tx.commit()?;
        info!(goals = inserted.len(), "demo goals seeded");
        Ok(inserted)
    }
}
