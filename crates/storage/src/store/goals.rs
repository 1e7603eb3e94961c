#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError};
use gm_core::time::now_ms;
use gm_core::{
    GoalId, GoalPatch, GoalPriority, GoalRecord, GoalStatus, NewGoal, PositionUpdate,
    RecordStore, ValidationError,
};
use rusqlite::{OptionalExtension, Row, Transaction, params};
use tracing::{debug, info};

const GOAL_COLUMNS: &str = "id, parent_id, title, description, status, color, priority, \
     x, y, collapsed, created_at_ms, updated_at_ms";

fn goal_id(raw: i64) -> Result<GoalId, StoreError> {
    GoalId::try_new(raw).map_err(|_| StoreError::InvalidRow("goal id must be positive"))
}

fn goal_from_row(row: &Row<'_>) -> Result<GoalRecord, StoreError> {
    Ok(GoalRecord {
        id: goal_id(row.get(0)?)?,
        parent_id: row.get::<_, Option<i64>>(1)?.map(goal_id).transpose()?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: GoalStatus::parse_lenient(&row.get::<_, String>(4)?),
        color: row.get(5)?,
        priority: GoalPriority::parse_lenient(&row.get::<_, String>(6)?),
        x: row.get(7)?,
        y: row.get(8)?,
        collapsed: row.get::<_, i64>(9)? != 0,
        created_at_ms: row.get(10)?,
        updated_at_ms: row.get(11)?,
    })
}

fn query_goals(
    tx: &Transaction<'_>,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<GoalRecord>, StoreError> {
    let sql = format!(
        "SELECT {GOAL_COLUMNS} FROM goals {filter} ORDER BY created_at_ms ASC, id ASC"
    );
    let mut stmt = tx.prepare(&sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(goal_from_row(row)?);
    }
    Ok(out)
}

fn get_goal_tx(tx: &Transaction<'_>, id: GoalId) -> Result<Option<GoalRecord>, StoreError> {
    let mut goals = query_goals(tx, "WHERE id=?1", params![id.get()])?;
    Ok(goals.pop())
}

fn goal_exists_tx(tx: &Transaction<'_>, id: GoalId) -> Result<bool, StoreError> {
    let found = tx
        .query_row("SELECT 1 FROM goals WHERE id=?1", params![id.get()], |_| {
            Ok(())
        })
        .optional()?;
    Ok(found.is_some())
}

fn parent_of_tx(tx: &Transaction<'_>, id: GoalId) -> Result<Option<GoalId>, StoreError> {
    let parent = tx
        .query_row(
            "SELECT parent_id FROM goals WHERE id=?1",
            params![id.get()],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()?
        .flatten();
    parent.map(goal_id).transpose()
}

/// Walks up from `parent`; reaching `id` means the move would close a loop.
fn ensure_no_cycle_tx(tx: &Transaction<'_>, id: GoalId, parent: GoalId) -> Result<(), StoreError> {
    if parent == id {
        return Err(ValidationError::SelfParent { id }.into());
    }
    let total: i64 = tx.query_row("SELECT COUNT(1) FROM goals", [], |row| row.get(0))?;
    let mut current = Some(parent);
    let mut steps = 0i64;
    while let Some(cursor) = current {
        if cursor == id {
            return Err(ValidationError::ParentCycle { id, parent }.into());
        }
        steps += 1;
        if steps > total {
            break;
        }
        current = parent_of_tx(tx, cursor)?;
    }
    Ok(())
}

pub(super) fn insert_goal_tx(
    tx: &Transaction<'_>,
    goal: &NewGoal,
    now: i64,
) -> Result<GoalRecord, StoreError> {
    tx.execute(
        "INSERT INTO goals(parent_id, title, description, status, color, priority, x, y, \
         collapsed, created_at_ms, updated_at_ms) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)",
        params![
            goal.parent_id.map(GoalId::get),
            goal.title,
            goal.description,
            goal.status.unwrap_or_default().as_str(),
            goal.color,
            goal.priority.unwrap_or_default().as_str(),
            goal.x.unwrap_or(0),
            goal.y.unwrap_or(0),
            now,
        ],
    )?;
    let id = goal_id(tx.last_insert_rowid())?;
    get_goal_tx(tx, id)?.ok_or(StoreError::UnknownGoal { id })
}

fn write_goal_tx(tx: &Transaction<'_>, goal: &GoalRecord) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE goals SET parent_id=?2, title=?3, description=?4, status=?5, color=?6, \
         priority=?7, x=?8, y=?9, collapsed=?10, updated_at_ms=?11 WHERE id=?1",
        params![
            goal.id.get(),
            goal.parent_id.map(GoalId::get),
            goal.title,
            goal.description,
            goal.status.as_str(),
            goal.color,
            goal.priority.as_str(),
            goal.x,
            goal.y,
            goal.collapsed,
            goal.updated_at_ms,
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    pub fn count_goals(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM goals", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| StoreError::InvalidRow("negative goal count"))
    }
}

impl RecordStore for SqliteStore {
    type Error = StoreError;

    fn list_all(&mut self) -> Result<Vec<GoalRecord>, StoreError> {
        let tx = self.conn.transaction()?;
        let goals = query_goals(&tx, "", [])?;
        tx.commit()?;
        debug!(goals = goals.len(), "listed goals");
        Ok(goals)
    }

    fn get(&mut self, id: GoalId) -> Result<Option<GoalRecord>, StoreError> {
        let tx = self.conn.transaction()?;
        let goal = get_goal_tx(&tx, id)?;
        tx.commit()?;
        Ok(goal)
    }

    fn list_children(&mut self, parent: Option<GoalId>) -> Result<Vec<GoalRecord>, StoreError> {
        let tx = self.conn.transaction()?;
        let goals = match parent {
            Some(parent) => query_goals(&tx, "WHERE parent_id=?1", params![parent.get()])?,
            None => query_goals(&tx, "WHERE parent_id IS NULL", [])?,
        };
        tx.commit()?;
        Ok(goals)
    }

    fn create(&mut self, goal: NewGoal) -> Result<GoalRecord, StoreError> {
        let goal = goal.normalized()?;
        let tx = self.conn.transaction()?;
        if let Some(parent) = goal.parent_id
            && !goal_exists_tx(&tx, parent)?
        {
            return Err(StoreError::UnknownGoal { id: parent });
        }
        let record = insert_goal_tx(&tx, &goal, now_ms())?;
        tx.commit()?;
        debug!(goal = %record.id, "goal created");
        Ok(record)
    }

    fn update(&mut self, id: GoalId, patch: GoalPatch) -> Result<GoalRecord, StoreError> {
        let tx = self.conn.transaction()?;
        let mut goal = get_goal_tx(&tx, id)?.ok_or(StoreError::UnknownGoal { id })?;
        let patch = patch.normalized()?;
        if let Some(Some(parent)) = patch.parent_id {
            if !goal_exists_tx(&tx, parent)? {
                return Err(StoreError::UnknownGoal { id: parent });
            }
            ensure_no_cycle_tx(&tx, id, parent)?;
        }
        if !patch.is_empty() {
            patch.apply_to(&mut goal);
            goal.updated_at_ms = now_ms().max(goal.updated_at_ms);
            write_goal_tx(&tx, &goal)?;
        }
        tx.commit()?;
        Ok(goal)
    }

    fn delete(&mut self, id: GoalId) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM goals WHERE id=?1", params![id.get()])?;
        tx.commit()?;
        if removed > 0 {
            info!(goal = %id, "goal deleted with its subtree");
        }
        Ok(removed > 0)
    }

    /// Writes the whole batch in one transaction. An unknown id rolls back
    /// every update in the batch.
    fn update_positions(&mut self, batch: &[PositionUpdate]) -> Result<usize, StoreError> {
        let now = now_ms();
        let tx = self.conn.transaction()?;
        for update in batch {
            let changed = tx.execute(
                "UPDATE goals SET x=?2, y=?3, updated_at_ms=?4 WHERE id=?1",
                params![update.id.get(), update.x, update.y, now],
            )?;
            if changed == 0 {
                return Err(StoreError::UnknownGoal { id: update.id });
            }
        }
        tx.commit()?;
        debug!(updates = batch.len(), "position batch committed");
        Ok(batch.len())
    }
}

