#![forbid(unsafe_code)]

use crate::editor::{self, DeletePlan, DragSession};
use crate::error::GoalError;
use crate::ids::GoalId;
use crate::layout::{
    LayoutDirection, LayoutInput, LayoutPositions, LayoutSpacing, compute_layout,
    effective_positions,
};
use crate::model::{GoalPatch, GoalRecord, NewGoal, PositionUpdate};
use crate::progress::{self, ProgressPolicy, StatusTable};
use crate::projection::{self, RenderEdit, RenderGraph, RenderSettings};
use crate::store::RecordStore;
use crate::tree::GoalForest;
use crate::visibility::VisibilitySet;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionConfig {
    pub spacing: LayoutSpacing,
    pub render: RenderSettings,
    pub direction: LayoutDirection,
}

/// Identifies one refresh. Later refreshes carry larger tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefreshToken(u64);

/// Everything derived from one record snapshot.
#[derive(Debug, Default)]
struct Snapshot {
    forest: GoalForest,
    positions: LayoutPositions,
    visibility: VisibilitySet,
    diagnostics: Vec<GoalError>,
}

impl Snapshot {
    fn build(records: Vec<GoalRecord>, policy: &dyn ProgressPolicy) -> Self {
        let assembly = GoalForest::assemble(records);
        let mut forest = assembly.forest;
        progress::annotate(&mut forest, policy);
        let positions = effective_positions(&forest);
        let visibility = VisibilitySet::compute(&forest);
        Self {
            forest,
            positions,
            visibility,
            diagnostics: assembly.diagnostics,
        }
    }
}

/// One editor session over a record store.
///
/// The session keeps the latest assembled snapshot. Every mutation goes to the
/// store first and is followed by a refresh; the snapshot itself is never
/// patched. When a write fails in a way that leaves the store state uncertain
/// the session re-fetches before reporting the error.
pub struct GoalSession<S> {
    store: S,
    config: SessionConfig,
    policy: Box<dyn ProgressPolicy>,
    issued: u64,
    applied: u64,
    snapshot: Snapshot,
}

impl<S: RecordStore> GoalSession<S> {
    pub fn open(store: S, config: SessionConfig) -> Result<Self, GoalError> {
        let mut session = Self {
            store,
            config,
            policy: Box::new(StatusTable),
            issued: 0,
            applied: 0,
            snapshot: Snapshot::default(),
        };
        session.refresh()?;
        Ok(session)
    }

    /// Swaps the leaf weighting and recomputes progress on the current snapshot.
    pub fn set_progress_policy(&mut self, policy: impl ProgressPolicy + 'static) {
        self.policy = Box::new(policy);
        progress::annotate(&mut self.snapshot.forest, self.policy.as_ref());
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_render_settings(&mut self, render: RenderSettings) {
        self.config.render = render;
    }

    pub fn forest(&self) -> &GoalForest {
        &self.snapshot.forest
    }

    pub fn positions(&self) -> &LayoutPositions {
        &self.snapshot.positions
    }

    pub fn visibility(&self) -> &VisibilitySet {
        &self.snapshot.visibility
    }

    /// Orphans and cycles found by the last applied refresh.
    pub fn diagnostics(&self) -> &[GoalError] {
        &self.snapshot.diagnostics
    }

    pub fn begin_refresh(&mut self) -> RefreshToken {
        self.issued += 1;
        RefreshToken(self.issued)
    }

    /// Applies a fetched snapshot unless a newer refresh was already applied.
    /// Returns whether the snapshot was used.
    pub fn complete_refresh(&mut self, token: RefreshToken, records: Vec<GoalRecord>) -> bool {
        if token.0 <= self.applied {
            debug!(token = token.0, applied = self.applied, "discarding stale refresh");
            return false;
        }
        self.applied = token.0;
        self.snapshot = Snapshot::build(records, self.policy.as_ref());
        true
    }

    pub fn refresh(&mut self) -> Result<(), GoalError> {
        let token = self.begin_refresh();
        let records = self.store.list_all().map_err(Into::into)?;
        self.complete_refresh(token, records);
        Ok(())
    }

    pub fn render(&self) -> RenderGraph {
        projection::project(
            &self.snapshot.forest,
            &self.snapshot.positions,
            &self.snapshot.visibility,
            &self.config.render,
        )
    }

    /// Re-fetches when the error leaves the store state in doubt, then hands
    /// the error back.
    fn recover(&mut self, err: GoalError) -> GoalError {
        if err.requires_refresh() {
            warn!(error = %err, "store write failed; re-fetching goals");
            if let Err(refresh_err) = self.refresh() {
                warn!(error = %refresh_err, "re-fetch after failed write also failed");
            }
        }
        err
    }

    fn settle<T>(&mut self, result: Result<T, S::Error>) -> Result<T, GoalError> {
        match result.map_err(Into::into) {
            Ok(value) => {
                self.refresh()?;
                Ok(value)
            }
            Err(err) => Err(self.recover(err)),
        }
    }

    pub fn create_goal(&mut self, goal: NewGoal) -> Result<GoalRecord, GoalError> {
        let result = self.store.create(goal);
        self.settle(result)
    }

    /// Creates a child placed at the next free grid slot under `parent`.
    pub fn add_subgoal(
        &mut self,
        parent: GoalId,
        goal: NewGoal,
    ) -> Result<GoalRecord, GoalError> {
        let slot =
            match editor::next_child_position(&self.snapshot.forest, &self.snapshot.positions, parent) {
                Ok(slot) => slot,
                Err(err) => return Err(self.recover(err)),
            };
        let goal = NewGoal {
            parent_id: Some(parent),
            x: goal.x.or(Some(slot.x)),
            y: goal.y.or(Some(slot.y)),
            ..goal
        };
        self.create_goal(goal)
    }

    pub fn update_goal(&mut self, id: GoalId, patch: GoalPatch) -> Result<GoalRecord, GoalError> {
        let result = self.store.update(id, patch);
        self.settle(result)
    }

    /// Moves `id` under `parent`, or makes it a root. The store rejects cycles.
    pub fn reparent(
        &mut self,
        id: GoalId,
        parent: Option<GoalId>,
    ) -> Result<GoalRecord, GoalError> {
        self.update_goal(
            id,
            GoalPatch {
                parent_id: Some(parent),
                ..GoalPatch::default()
            },
        )
    }

    pub fn set_collapsed(&mut self, id: GoalId, collapsed: bool) -> Result<GoalRecord, GoalError> {
        self.update_goal(id, GoalPatch::collapsed(collapsed))
    }

    /// Returns the new collapsed state.
    pub fn toggle_collapsed(&mut self, id: GoalId) -> Result<bool, GoalError> {
        let patch = match editor::toggle_collapsed(&self.snapshot.forest, id) {
            Ok(patch) => patch,
            Err(err) => return Err(self.recover(err)),
        };
        let record = self.update_goal(id, patch)?;
        Ok(record.collapsed)
    }

    /// Deletes `id` and its whole subtree, then confirms against a fresh snapshot.
    pub fn delete_goal(&mut self, id: GoalId) -> Result<DeletePlan, GoalError> {
        let plan = match editor::plan_delete(&self.snapshot.forest, id) {
            Ok(plan) => plan,
            Err(err) => return Err(self.recover(err)),
        };
        let result = self.store.delete(id);
        let removed = self.settle(result)?;
        if !removed {
            return Err(GoalError::NotFound { id });
        }
        let remaining = plan
            .removed
            .iter()
            .filter(|gone| self.snapshot.forest.contains(**gone))
            .count();
        if remaining > 0 {
            warn!(goal = %id, remaining, "cascade delete was incomplete");
            return Err(GoalError::PartialCascade { id, remaining });
        }
        info!(goal = %id, removed = plan.removed.len(), "deleted goal subtree");
        Ok(plan)
    }

    pub fn begin_drag(&self, id: GoalId) -> Result<DragSession, GoalError> {
        DragSession::begin(&self.snapshot.forest, &self.snapshot.positions, id)
    }

    /// Persists the drag result as one batch.
    pub fn finish_drag(&mut self, drag: DragSession) -> Result<usize, GoalError> {
        let batch = drag.finish();
        self.write_positions(&batch)
    }

    /// Translates `id` and all of its descendants by `(dx, dy)`.
    pub fn move_subtree(&mut self, id: GoalId, dx: i64, dy: i64) -> Result<usize, GoalError> {
        let mut drag = match self.begin_drag(id) {
            Ok(drag) => drag,
            Err(err) => return Err(self.recover(err)),
        };
        drag.step(dx, dy);
        self.finish_drag(drag)
    }

    fn write_positions(&mut self, batch: &[PositionUpdate]) -> Result<usize, GoalError> {
        if batch.is_empty() {
            return Ok(0);
        }
        debug!(updates = batch.len(), "writing position batch");
        let result = self.store.update_positions(batch);
        self.settle(result)
    }

    /// Runs the layered layout and persists every position it computed.
    ///
    /// `scope` limits the layout to that goal's visible subtree and leaves
    /// every other goal where it is. A scope hidden under a collapsed
    /// ancestor is laid out as if it were shown.
    pub fn auto_layout(
        &mut self,
        direction: LayoutDirection,
        scope: Option<GoalId>,
    ) -> Result<LayoutPositions, GoalError> {
        let input = match scope {
            None => LayoutInput::visible(
                &self.snapshot.forest,
                &self.snapshot.visibility,
                &self.snapshot.positions,
                &self.config.spacing,
            ),
            Some(root) => {
                let Some(subtree) = self.snapshot.forest.subtree(root) else {
                    return Err(self.recover(GoalError::NotFound { id: root }));
                };
                let visibility = VisibilitySet::compute(&subtree);
                LayoutInput::visible(
                    &subtree,
                    &visibility,
                    &self.snapshot.positions,
                    &self.config.spacing,
                )
            }
        };
        let computed = match compute_layout(&input, direction, scope, &self.config.spacing) {
            Ok(computed) => computed,
            Err(err) => return Err(self.recover(err)),
        };
        let batch: Vec<PositionUpdate> = computed
            .iter()
            .map(|(id, position)| PositionUpdate::new(*id, *position))
            .collect();
        self.write_positions(&batch)?;
        match scope {
            Some(root) => debug!(scope = %root, nodes = batch.len(), "scoped layout applied"),
            None => info!(nodes = batch.len(), direction = direction.as_str(), "full layout applied"),
        }
        Ok(computed)
    }

    /// Lays out the whole tree that contains `id`.
    pub fn auto_layout_tree_of(
        &mut self,
        id: GoalId,
        direction: LayoutDirection,
    ) -> Result<LayoutPositions, GoalError> {
        let Some(root) = editor::forest_root(&self.snapshot.forest, id) else {
            let err = GoalError::NotFound { id };
            return Err(self.recover(err));
        };
        self.auto_layout(direction, Some(root))
    }

    /// Applies a canvas edit: position batch first, then field patches.
    pub fn apply_edit(&mut self, edit: RenderEdit) -> Result<(), GoalError> {
        let plan = match projection::plan_edit(&self.snapshot.forest, &self.snapshot.positions, edit)
        {
            Ok(plan) => plan,
            Err(err) => return Err(self.recover(err)),
        };
        self.write_positions(&plan.positions)?;
        for (id, patch) in plan.patches {
            self.update_goal(id, patch)?;
        }
        Ok(())
    }
}
