#![forbid(unsafe_code)]

use super::{LayoutDirection, LayoutInput, LayoutPositions, LayoutSpacing};
use crate::error::GoalError;
use crate::ids::GoalId;
use crate::model::Position;
use std::collections::HashMap;
use tracing::debug;

struct LayoutGraph {
    ids: Vec<GoalId>,
    cross: Vec<f64>,
    along: Vec<f64>,
    children: Vec<Vec<usize>>,
    has_parent: Vec<bool>,
}

impl LayoutGraph {
    fn build(input: &LayoutInput, direction: LayoutDirection) -> Self {
        let n = input.nodes.len();
        let mut index: HashMap<GoalId, usize> = HashMap::with_capacity(n);
        let mut ids = Vec::with_capacity(n);
        let mut cross = Vec::with_capacity(n);
        let mut along = Vec::with_capacity(n);
        for node in &input.nodes {
            if index.contains_key(&node.id) {
                continue;
            }
            index.insert(node.id, ids.len());
            ids.push(node.id);
            let (c, a) = if direction.is_vertical() {
                (node.width, node.height)
            } else {
                (node.height, node.width)
            };
            cross.push(c.max(0.0));
            along.push(a.max(0.0));
        }

        let mut children = vec![Vec::new(); ids.len()];
        let mut has_parent = vec![false; ids.len()];
        for edge in &input.edges {
            let (Some(&source), Some(&target)) = (index.get(&edge.source), index.get(&edge.target))
            else {
                continue;
            };
            if source == target || has_parent[target] {
                debug!(source = %edge.source, target = %edge.target, "ignoring non-tree edge");
                continue;
            }
            has_parent[target] = true;
            children[source].push(target);
        }

        Self {
            ids,
            cross,
            along,
            children,
            has_parent,
        }
    }
}

// ── Phase 1: ranks ──────────────────────────────────────────────────

/// Rank buckets by depth from the given roots.
///
/// Each rank is ordered by the barycenter of its parents in the rank above.
/// With a single parent per node that is the parent's slot, so walking the
/// previous rank in order and emitting each node's children in edge order
/// yields the crossing-free ordering directly.
fn rank_buckets(graph: &LayoutGraph, roots: &[usize]) -> Vec<Vec<usize>> {
    let mut seen = vec![false; graph.ids.len()];
    let mut ranks: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for &root in roots {
        if !seen[root] {
            seen[root] = true;
            current.push(root);
        }
    }
    while !current.is_empty() {
        let mut next = Vec::new();
        for &node in &current {
            for &child in &graph.children[node] {
                if !seen[child] {
                    seen[child] = true;
                    next.push(child);
                }
            }
        }
        ranks.push(current);
        current = next;
    }
    ranks
}

// ── Phase 2: cross-axis extents ─────────────────────────────────────

/// Width each subtree needs along the cross axis: its own box, or its
/// children side by side, whichever is larger.
fn subtree_extents(graph: &LayoutGraph, ranks: &[Vec<usize>], gap: f64) -> Vec<f64> {
    let mut extent = graph.cross.clone();
    for rank in ranks.iter().rev() {
        for &node in rank {
            let kids = &graph.children[node];
            if kids.is_empty() {
                continue;
            }
            let span: f64 =
                kids.iter().map(|c| extent[*c]).sum::<f64>() + gap * (kids.len() - 1) as f64;
            extent[node] = extent[node].max(span);
        }
    }
    extent
}

// ── Phase 3: coordinates ────────────────────────────────────────────

fn assign_cross(
    graph: &LayoutGraph,
    roots: &[usize],
    extent: &[f64],
    spacing: &LayoutSpacing,
) -> Vec<f64> {
    let mut cross_pos = vec![0.0; graph.ids.len()];
    let mut stack: Vec<(usize, f64)> = Vec::new();
    let mut cursor = 0.0;
    for &root in roots {
        stack.push((root, cursor));
        cursor += extent[root] + spacing.tree_gap;
    }
    while let Some((node, start)) = stack.pop() {
        // Centred within the band reserved for the subtree.
        cross_pos[node] = start + (extent[node] - graph.cross[node]) / 2.0;
        let kids = &graph.children[node];
        if kids.is_empty() {
            continue;
        }
        let span: f64 = kids.iter().map(|c| extent[*c]).sum::<f64>()
            + spacing.node_gap * (kids.len() - 1) as f64;
        let mut child_start = start + (extent[node] - span) / 2.0;
        for &child in kids {
            stack.push((child, child_start));
            child_start += extent[child] + spacing.node_gap;
        }
    }
    cross_pos
}

fn assign_along(
    graph: &LayoutGraph,
    ranks: &[Vec<usize>],
    direction: LayoutDirection,
    spacing: &LayoutSpacing,
) -> Vec<f64> {
    let depths: Vec<f64> = ranks
        .iter()
        .map(|rank| rank.iter().map(|n| graph.along[*n]).fold(0.0, f64::max))
        .collect();
    let mut offsets = Vec::with_capacity(ranks.len());
    let mut cursor = 0.0;
    for depth in &depths {
        offsets.push(cursor);
        cursor += depth + spacing.rank_gap;
    }
    let total = (cursor - spacing.rank_gap).max(0.0);

    let mut along_pos = vec![0.0; graph.ids.len()];
    for (r, rank) in ranks.iter().enumerate() {
        for &node in rank {
            along_pos[node] = if direction.is_reversed() {
                total - offsets[r] - depths[r]
            } else {
                offsets[r]
            };
        }
    }
    along_pos
}

/// Layered layout of a forest, or of one subtree of it.
///
/// Without `scope_root` every input node is positioned, starting at the
/// configured margin. With `scope_root` only that node and its descendants
/// (through input edges) are positioned, shifted so the scope root keeps its
/// current position; no other id appears in the result.
///
/// Output is a pure function of the input: same nodes, edges and spacing give
/// the same positions.
pub fn compute_layout(
    input: &LayoutInput,
    direction: LayoutDirection,
    scope_root: Option<GoalId>,
    spacing: &LayoutSpacing,
) -> Result<LayoutPositions, GoalError> {
    let graph = LayoutGraph::build(input, direction);
    let roots: Vec<usize> = match scope_root {
        Some(scope) => {
            let idx = graph
                .ids
                .iter()
                .position(|id| *id == scope)
                .ok_or(GoalError::NotFound { id: scope })?;
            vec![idx]
        }
        None => (0..graph.ids.len()).filter(|n| !graph.has_parent[*n]).collect(),
    };

    let ranks = rank_buckets(&graph, &roots);
    let extent = subtree_extents(&graph, &ranks, spacing.node_gap);
    let cross_pos = assign_cross(&graph, &roots, &extent, spacing);
    let along_pos = assign_along(&graph, &ranks, direction, spacing);

    let mut raw: Vec<(usize, f64, f64)> = Vec::new();
    for rank in &ranks {
        for &node in rank {
            let (x, y) = if direction.is_vertical() {
                (cross_pos[node], along_pos[node])
            } else {
                (along_pos[node], cross_pos[node])
            };
            raw.push((node, x + spacing.margin, y + spacing.margin));
        }
    }

    let (shift_x, shift_y) = match (scope_root, roots.first()) {
        (Some(_), Some(&root)) => {
            let anchor = input
                .nodes
                .iter()
                .find(|n| n.id == graph.ids[root])
                .map(|n| n.position)
                .unwrap_or_default();
            let computed = raw
                .iter()
                .find(|(node, _, _)| *node == root)
                .map(|(_, x, y)| (*x, *y))
                .unwrap_or((0.0, 0.0));
            if anchor.is_placed() {
                (anchor.x as f64 - computed.0, anchor.y as f64 - computed.1)
            } else {
                (0.0, 0.0)
            }
        }
        _ => (0.0, 0.0),
    };

    let positions: LayoutPositions = raw
        .into_iter()
        .map(|(node, x, y)| {
            (
                graph.ids[node],
                Position::new((x + shift_x).round() as i64, (y + shift_y).round() as i64),
            )
        })
        .collect();
    debug!(
        nodes = positions.len(),
        ranks = ranks.len(),
        direction = direction.as_str(),
        scoped = scope_root.is_some(),
        "computed layered layout"
    );
    Ok(positions)
}
