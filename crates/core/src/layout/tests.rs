use super::*;
use crate::error::GoalError;
use crate::test_support::{id, open};
use crate::tree::GoalForest;

fn sample_forest() -> GoalForest {
    GoalForest::assemble(vec![
        open(1, None),
        open(2, Some(1)),
        open(3, Some(1)),
        open(4, Some(1)),
        open(5, Some(3)),
        open(6, Some(3)),
        open(7, None),
        open(8, Some(7)),
    ])
    .forest
}

fn full_input(forest: &GoalForest, spacing: &LayoutSpacing) -> LayoutInput {
    let visibility = VisibilitySet::compute(forest);
    let positions = effective_positions(forest);
    LayoutInput::visible(forest, &visibility, &positions, spacing)
}

fn overlaps(a: Position, b: Position, spacing: &LayoutSpacing) -> bool {
    let (w, h) = (spacing.node_width as i64, spacing.node_height as i64);
    a.x < b.x + w && b.x < a.x + w && a.y < b.y + h && b.y < a.y + h
}

#[test]
fn grid_seeding_follows_root_and_child_offsets() {
    let forest = sample_forest();
    let seeded = seed_positions(&forest);

    assert_eq!(seeded[&id(1)], Position::new(0, 50));
    assert_eq!(seeded[&id(7)], Position::new(400, 50));
    // three children: x offsets -200, 0, +200 around the parent
    assert_eq!(seeded[&id(2)], Position::new(-200, 250));
    assert_eq!(seeded[&id(3)], Position::new(0, 250));
    assert_eq!(seeded[&id(4)], Position::new(200, 250));
    // two children of 3: -100, +100
    assert_eq!(seeded[&id(5)], Position::new(-100, 450));
    assert_eq!(seeded[&id(6)], Position::new(100, 450));
    assert_eq!(seeded[&id(8)], Position::new(400, 250));
}

#[test]
fn persisted_positions_win_and_anchor_seeded_children() {
    let mut root = open(1, None);
    root.x = 1000;
    root.y = 300;
    let forest = GoalForest::assemble(vec![root, open(2, Some(1))]).forest;
    let positions = effective_positions(&forest);
    assert_eq!(positions[&id(1)], Position::new(1000, 300));
    assert_eq!(positions[&id(2)], Position::new(1000, 500));
}

#[test]
fn full_layout_ranks_by_depth_without_overlap() {
    let forest = sample_forest();
    let spacing = LayoutSpacing::default();
    let input = full_input(&forest, &spacing);
    let positions =
        compute_layout(&input, LayoutDirection::TopBottom, None, &spacing).expect("layout");

    assert_eq!(positions.len(), forest.len());
    let y = |v: i64| positions[&id(v)].y;
    assert_eq!(y(1), y(7));
    assert_eq!(y(2), y(3));
    assert_eq!(y(3), y(8));
    assert!(y(2) > y(1));
    assert!(y(5) > y(2));
    assert_eq!(y(1), spacing.margin as i64);

    let all: Vec<_> = positions.iter().collect();
    for (i, (a_id, a)) in all.iter().enumerate() {
        for (b_id, b) in &all[i + 1..] {
            assert!(!overlaps(**a, **b, &spacing), "{a_id} overlaps {b_id}");
        }
    }

    // siblings keep creation order left to right; parent sits over its children
    let x = |v: i64| positions[&id(v)].x;
    assert!(x(2) < x(3) && x(3) < x(4));
    assert!(x(4) < x(8));
    assert_eq!(x(3), (x(5) + x(6)) / 2);
}

#[test]
fn full_layout_is_idempotent() {
    let forest = sample_forest();
    let spacing = LayoutSpacing::default();
    let input = full_input(&forest, &spacing);
    let first = compute_layout(&input, LayoutDirection::TopBottom, None, &spacing).unwrap();

    let mut relaid = input.clone();
    for node in relaid.nodes.iter_mut() {
        node.position = first[&node.id];
    }
    let second = compute_layout(&relaid, LayoutDirection::TopBottom, None, &spacing).unwrap();
    assert_eq!(first, second);
}

#[test]
fn left_right_layout_swaps_axes() {
    let forest = sample_forest();
    let spacing = LayoutSpacing::default();
    let input = full_input(&forest, &spacing);
    let positions = compute_layout(&input, LayoutDirection::LeftRight, None, &spacing).unwrap();
    assert_eq!(positions[&id(1)].x, positions[&id(7)].x);
    assert!(positions[&id(2)].x > positions[&id(1)].x);

    let reversed = compute_layout(&input, LayoutDirection::RightLeft, None, &spacing).unwrap();
    assert!(reversed[&id(2)].x < reversed[&id(1)].x);
    assert!(reversed[&id(5)].x < reversed[&id(2)].x);
}

#[test]
fn scoped_layout_only_returns_the_subtree_and_keeps_its_anchor() {
    let forest = sample_forest();
    let spacing = LayoutSpacing::default();
    let mut input = full_input(&forest, &spacing);
    for node in input.nodes.iter_mut() {
        if node.id == id(3) {
            node.position = Position::new(900, 700);
        }
    }

    let positions =
        compute_layout(&input, LayoutDirection::TopBottom, Some(id(3)), &spacing).unwrap();
    let keys: Vec<GoalId> = positions.keys().copied().collect();
    assert_eq!(keys, vec![id(3), id(5), id(6)]);
    assert_eq!(positions[&id(3)], Position::new(900, 700));
    assert!(positions[&id(5)].y > 700);
    assert!(positions[&id(5)].x < positions[&id(6)].x);
}

#[test]
fn scoped_layout_rejects_unknown_scope() {
    let forest = sample_forest();
    let spacing = LayoutSpacing::default();
    let input = full_input(&forest, &spacing);
    let err = compute_layout(&input, LayoutDirection::TopBottom, Some(id(99)), &spacing)
        .unwrap_err();
    assert!(matches!(err, GoalError::NotFound { id: missing } if missing == id(99)));
}

#[test]
fn hidden_nodes_are_left_out_of_layout_input() {
    let mut records = vec![open(1, None), open(2, Some(1)), open(3, Some(2))];
    records[1].collapsed = true;
    let forest = GoalForest::assemble(records).forest;
    let spacing = LayoutSpacing::default();
    let input = full_input(&forest, &spacing);
    let ids: Vec<GoalId> = input.nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![id(1), id(2)]);
    assert_eq!(input.edges.len(), 1);
}

#[test]
fn direction_parsing() {
    assert_eq!(LayoutDirection::from_str("tb"), Some(LayoutDirection::TopBottom));
    assert_eq!(LayoutDirection::from_str("TD"), Some(LayoutDirection::TopBottom));
    assert_eq!(LayoutDirection::from_str("rl"), Some(LayoutDirection::RightLeft));
    assert_eq!(LayoutDirection::from_str("diagonal"), None);
}
