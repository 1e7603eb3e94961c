#![forbid(unsafe_code)]

mod layered;
mod seed;

pub use layered::compute_layout;
pub(crate) use seed::child_slot;
pub use seed::{effective_positions, seed_positions};

use crate::ids::GoalId;
use crate::model::Position;
use crate::tree::GoalForest;
use crate::visibility::VisibilitySet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Node id to canvas position.
pub type LayoutPositions = BTreeMap<GoalId, Position>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutDirection {
    /// Roots on top, ranks grow downwards.
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    #[serde(rename = "BT")]
    BottomTop,
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

impl LayoutDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopBottom => "TB",
            Self::BottomTop => "BT",
            Self::LeftRight => "LR",
            Self::RightLeft => "RL",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TB" | "TD" => Some(Self::TopBottom),
            "BT" => Some(Self::BottomTop),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    /// Ranks stack along y for vertical directions, along x otherwise.
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::TopBottom | Self::BottomTop)
    }

    fn is_reversed(self) -> bool {
        matches!(self, Self::BottomTop | Self::RightLeft)
    }
}

/// Footprint and spacing used by the layered layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpacing {
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between neighbouring boxes in the same rank.
    pub node_gap: f64,
    /// Extra gap between two separate trees of the forest.
    pub tree_gap: f64,
    /// Gap between consecutive ranks.
    pub rank_gap: f64,
    /// Offset of the whole layout from the canvas origin.
    pub margin: f64,
}

impl Default for LayoutSpacing {
    fn default() -> Self {
        Self {
            node_width: 250.0,
            node_height: 120.0,
            node_gap: 50.0,
            tree_gap: 100.0,
            rank_gap: 80.0,
            margin: 50.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
    pub id: GoalId,
    /// Current effective position; anchors scoped layouts.
    pub position: Position,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutEdge {
    pub source: GoalId,
    pub target: GoalId,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutInput {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

impl LayoutInput {
    /// Visible nodes and the parent edges between them, in forest pre-order.
    pub fn visible(
        forest: &GoalForest,
        visibility: &VisibilitySet,
        positions: &LayoutPositions,
        spacing: &LayoutSpacing,
    ) -> Self {
        let mut input = Self::default();
        for (_, node) in forest.iter() {
            let id = node.id();
            if !visibility.is_visible(id) {
                continue;
            }
            input.nodes.push(LayoutNode {
                id,
                position: positions.get(&id).copied().unwrap_or_default(),
                width: spacing.node_width,
                height: spacing.node_height,
            });
            if let Some(parent) = node.parent {
                let source = forest.node(parent).id();
                if visibility.is_edge_visible(forest, source, id) {
                    input.edges.push(LayoutEdge { source, target: id });
                }
            }
        }
        input
    }
}

#[cfg(test)]
mod tests;
