#![forbid(unsafe_code)]

use crate::error::{GoalError, ValidationError};
use crate::ids::GoalId;
use crate::model::{GoalPatch, GoalRecord, NewGoal, PositionUpdate};
use crate::store::RecordStore;
use crate::time::now_ms;
use std::collections::BTreeMap;

/// Record store held entirely in memory. Used for headless sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<GoalId, GoalRecord>,
    next_id: i64,
    last_ts_ms: i64,
    fail_position_batches: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing records, e.g. a snapshot from elsewhere.
    /// No integrity checks are applied, which makes it possible to load
    /// malformed data.
    pub fn with_records(records: impl IntoIterator<Item = GoalRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.next_id = store.next_id.max(record.id.get());
            store.last_ts_ms = store.last_ts_ms.max(record.created_at_ms);
            store.records.insert(record.id, record);
        }
        store
    }

    /// Makes every following `update_positions` call fail without writing.
    pub fn fail_position_batches(&mut self, fail: bool) {
        self.fail_position_batches = fail;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Strictly increasing timestamps keep sibling order stable even when
    /// several goals are created within one millisecond.
    fn tick(&mut self) -> i64 {
        let now = now_ms().max(self.last_ts_ms + 1);
        self.last_ts_ms = now;
        now
    }

    fn ensure_no_cycle(&self, id: GoalId, parent: GoalId) -> Result<(), GoalError> {
        if parent == id {
            return Err(ValidationError::SelfParent { id }.into());
        }
        let mut current = Some(parent);
        let mut steps = 0usize;
        while let Some(cursor) = current {
            if cursor == id {
                return Err(ValidationError::ParentCycle { id, parent }.into());
            }
            steps += 1;
            if steps > self.records.len() {
                break;
            }
            current = self.records.get(&cursor).and_then(|r| r.parent_id);
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    type Error = GoalError;

    fn list_all(&mut self) -> Result<Vec<GoalRecord>, GoalError> {
        Ok(self.records.values().cloned().collect())
    }

    fn get(&mut self, id: GoalId) -> Result<Option<GoalRecord>, GoalError> {
        Ok(self.records.get(&id).cloned())
    }

    fn list_children(&mut self, parent: Option<GoalId>) -> Result<Vec<GoalRecord>, GoalError> {
        let mut out: Vec<GoalRecord> = self
            .records
            .values()
            .filter(|r| r.parent_id == parent)
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.created_at_ms, r.id));
        Ok(out)
    }

    fn create(&mut self, goal: NewGoal) -> Result<GoalRecord, GoalError> {
        let goal = goal.normalized()?;
        if let Some(parent) = goal.parent_id
            && !self.records.contains_key(&parent)
        {
            return Err(GoalError::NotFound { id: parent });
        }
        self.next_id += 1;
        let id = GoalId::try_new(self.next_id)
            .map_err(|err| ValidationError::InvalidId(err.message()))?;
        let now = self.tick();
        let record = GoalRecord {
            id,
            parent_id: goal.parent_id,
            title: goal.title,
            description: goal.description,
            status: goal.status.unwrap_or_default(),
            color: goal.color,
            priority: goal.priority.unwrap_or_default(),
            x: goal.x.unwrap_or(0),
            y: goal.y.unwrap_or(0),
            collapsed: false,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.records.insert(id, record.clone());
        Ok(record)
    }

    fn update(&mut self, id: GoalId, patch: GoalPatch) -> Result<GoalRecord, GoalError> {
        if !self.records.contains_key(&id) {
            return Err(GoalError::NotFound { id });
        }
        let patch = patch.normalized()?;
        if let Some(Some(parent)) = patch.parent_id {
            if !self.records.contains_key(&parent) {
                return Err(GoalError::NotFound { id: parent });
            }
            self.ensure_no_cycle(id, parent)?;
        }
        let now = self.tick();
        let record = self
            .records
            .get_mut(&id)
            .ok_or(GoalError::NotFound { id })?;
        if !patch.is_empty() {
            patch.apply_to(record);
            record.updated_at_ms = now;
        }
        Ok(record.clone())
    }

    fn delete(&mut self, id: GoalId) -> Result<bool, GoalError> {
        if !self.records.contains_key(&id) {
            return Ok(false);
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            self.records.remove(&current);
            stack.extend(
                self.records
                    .values()
                    .filter(|r| r.parent_id == Some(current))
                    .map(|r| r.id),
            );
        }
        Ok(true)
    }

    fn update_positions(&mut self, batch: &[PositionUpdate]) -> Result<usize, GoalError> {
        if self.fail_position_batches {
            return Err(GoalError::store(std::io::Error::other(
                "position batch rejected",
            )));
        }
        if let Some(missing) = batch.iter().find(|u| !self.records.contains_key(&u.id)) {
            return Err(GoalError::NotFound { id: missing.id });
        }
        let now = self.tick();
        for update in batch {
            if let Some(record) = self.records.get_mut(&update.id) {
                record.x = update.x;
                record.y = update.y;
                record.updated_at_ms = now;
            }
        }
        Ok(batch.len())
    }
}
