#![forbid(unsafe_code)]

use gm_core::layout::LayoutDirection;
use gm_core::memory::MemoryStore;
use gm_core::projection::RenderEdit;
use gm_core::{
    GoalError, GoalId, GoalRecord, GoalSession, GoalStatus, NewGoal, Position, RecordStore,
    SessionConfig, ValidationError,
};

fn id(value: i64) -> GoalId {
    GoalId::try_new(value).unwrap()
}

fn record(value: i64, parent: Option<i64>, status: GoalStatus) -> GoalRecord {
    GoalRecord {
        id: id(value),
        parent_id: parent.map(id),
        title: format!("Goal {value}"),
        description: None,
        status,
        color: None,
        priority: Default::default(),
        x: 0,
        y: 0,
        collapsed: false,
        created_at_ms: value * 10,
        updated_at_ms: value * 10,
    }
}

fn session(records: Vec<GoalRecord>) -> GoalSession<MemoryStore> {
    GoalSession::open(MemoryStore::with_records(records), SessionConfig::default()).unwrap()
}

fn three_goals() -> GoalSession<MemoryStore> {
    session(vec![
        record(1, None, GoalStatus::Done),
        record(2, Some(1), GoalStatus::InProgress),
        record(3, Some(1), GoalStatus::NotStarted),
    ])
}

fn progress_of(session: &GoalSession<MemoryStore>, value: i64) -> u8 {
    session.forest().get(id(value)).unwrap().progress
}

#[test]
fn assembled_progress_matches_children() {
    let session = three_goals();
    assert_eq!(session.forest().root_ids(), vec![id(1)]);
    assert_eq!(session.forest().children_of(id(1)), vec![id(2), id(3)]);
    assert_eq!(progress_of(&session, 2), 50);
    assert_eq!(progress_of(&session, 3), 0);
    assert_eq!(progress_of(&session, 1), 25);
    assert!(session.diagnostics().is_empty());
}

#[test]
fn status_change_flows_up_after_refresh() {
    let mut session = three_goals();
    session
        .update_goal(
            id(3),
            gm_core::GoalPatch {
                status: Some(GoalStatus::Done),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(progress_of(&session, 3), 100);
    assert_eq!(progress_of(&session, 1), 75);
}

#[test]
fn created_children_keep_creation_order() {
    let mut session = three_goals();
    let first = session.add_subgoal(id(2), NewGoal::titled("  first  ")).unwrap();
    let second = session.add_subgoal(id(2), NewGoal::titled("second")).unwrap();
    assert_eq!(first.title, "first");
    assert_eq!(session.forest().children_of(id(2)), vec![first.id, second.id]);
    assert!(first.position().is_placed());
    assert_eq!(first.position().y, session.positions()[&id(2)].y + 200);

    let err = session.add_subgoal(id(2), NewGoal::titled("   ")).unwrap_err();
    assert!(matches!(err, GoalError::Validation(ValidationError::EmptyTitle)));
}

#[test]
fn create_under_missing_parent_is_not_found() {
    let mut session = three_goals();
    let err = session
        .create_goal(NewGoal::titled("lost").under(id(40)))
        .unwrap_err();
    assert!(matches!(err, GoalError::NotFound { id: missing } if missing == id(40)));
    assert_eq!(session.forest().len(), 3);
}

#[test]
fn reparent_into_own_subtree_is_rejected() {
    let mut session = session(vec![
        record(1, None, GoalStatus::NotStarted),
        record(2, Some(1), GoalStatus::NotStarted),
        record(3, Some(2), GoalStatus::NotStarted),
    ]);
    let err = session.reparent(id(1), Some(id(3))).unwrap_err();
    assert!(matches!(
        err,
        GoalError::Validation(ValidationError::ParentCycle { .. })
    ));
    session.reparent(id(3), None).unwrap();
    assert_eq!(session.forest().root_ids(), vec![id(1), id(3)]);
}

#[test]
fn auto_layout_is_idempotent() {
    let mut session = three_goals();
    let first = session
        .auto_layout(LayoutDirection::TopBottom, None)
        .unwrap();
    let persisted = session.positions().clone();
    let second = session
        .auto_layout(LayoutDirection::TopBottom, None)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(&persisted, session.positions());
    for goal in session.store_mut().list_all().unwrap() {
        assert_eq!(goal.position(), first[&goal.id]);
    }
}

#[test]
fn layout_of_one_tree_leaves_others_alone() {
    let mut session = session(vec![
        record(1, None, GoalStatus::NotStarted),
        record(2, Some(1), GoalStatus::NotStarted),
        record(3, None, GoalStatus::NotStarted),
        record(4, Some(3), GoalStatus::NotStarted),
    ]);
    let before = session.positions().clone();
    let laid_out = session
        .auto_layout_tree_of(id(4), LayoutDirection::LeftRight)
        .unwrap();
    assert!(laid_out.contains_key(&id(3)));
    assert!(!laid_out.contains_key(&id(1)));
    assert_eq!(session.positions()[&id(1)], before[&id(1)]);
    assert_eq!(session.positions()[&id(2)], before[&id(2)]);
    assert_eq!(session.positions()[&id(3)], before[&id(3)]);
}

#[test]
fn moving_a_goal_drags_its_subtree() {
    let mut session = session(vec![
        record(1, None, GoalStatus::NotStarted),
        record(2, Some(1), GoalStatus::NotStarted),
        record(3, Some(2), GoalStatus::NotStarted),
        record(4, Some(1), GoalStatus::NotStarted),
    ]);
    let before = session.positions().clone();
    let written = session.move_subtree(id(2), 30, -10).unwrap();
    assert_eq!(written, 2);
    let after = session.positions();
    assert_eq!(after[&id(2)], before[&id(2)].offset(30, -10));
    assert_eq!(after[&id(3)], before[&id(3)].offset(30, -10));
    assert_eq!(after[&id(1)], before[&id(1)]);
    assert_eq!(after[&id(4)], before[&id(4)]);
}

#[test]
fn canvas_move_edit_goes_through_one_batch() {
    let mut session = three_goals();
    let start = session.positions()[&id(1)];
    session
        .apply_edit(RenderEdit::NodeMoved {
            id: "1".to_string(),
            x: (start.x + 100) as f64,
            y: (start.y + 20) as f64,
        })
        .unwrap();
    assert_eq!(session.positions()[&id(1)], start.offset(100, 20));

    let err = session
        .apply_edit(RenderEdit::NodeMoved {
            id: "1".to_string(),
            x: f64::NAN,
            y: 0.0,
        })
        .unwrap_err();
    assert!(matches!(err, GoalError::Validation(_)));
}

#[test]
fn far_canvas_move_is_rejected_without_writing() {
    let mut session = three_goals();
    let before = session.positions().clone();
    assert_eq!(before[&id(2)], Position::new(-100, 250));
    let err = session
        .apply_edit(RenderEdit::NodeMoved {
            id: "2".to_string(),
            x: 1e300,
            y: 0.0,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        GoalError::Validation(ValidationError::CoordinateOutOfRange { axis: 'x' })
    ));
    assert_eq!(session.positions(), &before);
}

#[test]
fn subgoal_under_raised_parent_lands_on_canvas() {
    let mut session = three_goals();
    session.move_subtree(id(1), 0, -400).unwrap();
    assert_eq!(session.positions()[&id(1)], Position::new(0, -350));

    let child = session.add_subgoal(id(1), NewGoal::titled("child")).unwrap();
    assert_eq!(child.position(), Position::new(200, 0));
    assert_eq!(session.forest().children_of(id(1)).len(), 3);
}

#[test]
fn patch_with_negative_placement_is_rejected() {
    let mut session = three_goals();
    let err = session
        .update_goal(id(2), gm_core::GoalPatch::position(Position::new(-100, 250)))
        .unwrap_err();
    assert!(matches!(
        err,
        GoalError::Validation(ValidationError::NegativeCoordinate { axis: 'x' })
    ));
    let stored = session.store_mut().get(id(2)).unwrap().unwrap();
    assert_eq!(stored.position(), Position::UNPLACED);
}

#[test]
fn scoped_layout_reaches_goals_under_a_collapsed_root() {
    let mut session = session(vec![
        record(1, None, GoalStatus::NotStarted),
        record(2, Some(1), GoalStatus::NotStarted),
        record(3, Some(2), GoalStatus::NotStarted),
        record(4, Some(2), GoalStatus::NotStarted),
    ]);
    session.set_collapsed(id(1), true).unwrap();
    assert!(!session.visibility().is_visible(id(2)));
    let before = session.positions().clone();

    let laid_out = session
        .auto_layout(LayoutDirection::TopBottom, Some(id(2)))
        .unwrap();
    let keys: Vec<GoalId> = laid_out.keys().copied().collect();
    assert_eq!(keys, vec![id(2), id(3), id(4)]);
    assert_eq!(laid_out[&id(2)], before[&id(2)]);
    assert!(laid_out[&id(3)].y > laid_out[&id(2)].y);
    assert_eq!(session.positions()[&id(1)], before[&id(1)]);
    assert_eq!(session.positions()[&id(3)], laid_out[&id(3)]);
    assert!(session.forest().get(id(1)).unwrap().record.collapsed);
}

#[test]
fn cascade_delete_leaves_no_dangling_edges() {
    let mut session = session(vec![
        record(1, None, GoalStatus::NotStarted),
        record(2, Some(1), GoalStatus::Done),
        record(3, Some(2), GoalStatus::Done),
        record(4, Some(1), GoalStatus::NotStarted),
    ]);
    let plan = session.delete_goal(id(2)).unwrap();
    assert_eq!(plan.removed, vec![id(2), id(3)]);
    assert_eq!(session.store().len(), 2);

    let graph = session.render();
    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "4"]);
    for edge in &graph.edges {
        assert!(ids.contains(&edge.source.as_str()));
        assert!(ids.contains(&edge.target.as_str()));
    }
    assert_eq!(progress_of(&session, 1), 0);
}

#[test]
fn collapse_hides_descendants_and_expand_restores_them() {
    let mut session = session(vec![
        record(1, None, GoalStatus::NotStarted),
        record(2, Some(1), GoalStatus::NotStarted),
        record(3, Some(2), GoalStatus::NotStarted),
    ]);
    assert!(session.toggle_collapsed(id(1)).unwrap());
    let graph = session.render();
    assert_eq!(graph.visible_nodes().count(), 1);
    assert_eq!(graph.visible_edges().count(), 0);
    assert!(!session.visibility().is_visible(id(3)));

    assert!(!session.toggle_collapsed(id(1)).unwrap());
    assert_eq!(session.render().visible_nodes().count(), 3);
}

#[test]
fn stale_refresh_is_discarded() {
    let mut session = three_goals();
    let older = session.begin_refresh();
    let newer = session.begin_refresh();
    assert!(session.complete_refresh(newer, vec![record(9, None, GoalStatus::Done)]));
    assert!(!session.complete_refresh(older, Vec::new()));
    assert_eq!(session.forest().root_ids(), vec![id(9)]);
}

#[test]
fn failed_batch_refreshes_and_keeps_state() {
    let mut session = three_goals();
    let before = session.positions().clone();
    session.store_mut().fail_position_batches(true);
    let err = session
        .auto_layout(LayoutDirection::TopBottom, None)
        .unwrap_err();
    assert_eq!(err.code(), "STORE");
    assert_eq!(session.positions(), &before);
    for goal in session.store_mut().list_all().unwrap() {
        assert_eq!(goal.position(), Position::UNPLACED);
    }
}

#[test]
fn write_against_vanished_goal_refreshes_view() {
    let mut session = three_goals();
    // another writer removes goal 3 behind the session's back
    assert!(session.store_mut().delete(id(3)).unwrap());
    assert!(session.forest().contains(id(3)));

    let err = session.set_collapsed(id(3), true).unwrap_err();
    assert!(matches!(err, GoalError::NotFound { .. }));
    assert!(!session.forest().contains(id(3)));
    assert_eq!(session.forest().children_of(id(1)), vec![id(2)]);
}

#[test]
fn orphans_are_reported_not_rendered() {
    let session = session(vec![
        record(1, None, GoalStatus::NotStarted),
        record(5, Some(77), GoalStatus::NotStarted),
    ]);
    assert_eq!(session.forest().len(), 1);
    assert_eq!(session.diagnostics().len(), 1);
    assert_eq!(session.diagnostics()[0].code(), "MALFORMED_TREE");
    assert_eq!(session.render().nodes.len(), 1);
}

struct DoneOnly;

impl gm_core::progress::ProgressPolicy for DoneOnly {
    fn leaf_progress(&self, record: &GoalRecord) -> u8 {
        if record.status == GoalStatus::Done { 100 } else { 0 }
    }
}

#[test]
fn swapped_leaf_policy_recomputes_progress() {
    let mut session = three_goals();
    session.set_progress_policy(DoneOnly);
    assert_eq!(progress_of(&session, 2), 0);
    assert_eq!(progress_of(&session, 1), 0);
    session
        .update_goal(
            id(2),
            gm_core::GoalPatch {
                status: Some(GoalStatus::Done),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(progress_of(&session, 1), 50);
}
