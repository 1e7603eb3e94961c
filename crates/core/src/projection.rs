#![forbid(unsafe_code)]

use crate::editor::subtree_ids;
use crate::error::{GoalError, ValidationError};
use crate::ids::GoalId;
use crate::layout::LayoutPositions;
use crate::model::{GoalPatch, GoalPriority, GoalStatus, Position, PositionUpdate};
use crate::time::ts_ms_to_rfc3339;
use crate::tree::GoalForest;
use crate::visibility::VisibilitySet;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub show_descriptions: bool,
    /// Longer descriptions are cut and end with "...". Zero disables the cut.
    pub max_description_length: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            show_descriptions: true,
            max_description_length: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderNodeData {
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub color: Option<String>,
    pub priority: GoalPriority,
    pub progress: u8,
    pub collapsed: bool,
    pub has_children: bool,
    pub descendant_count: usize,
    pub created_at: String,
    pub updated_at: String,
    pub is_root: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub position: Position,
    pub hidden: bool,
    pub data: RenderNodeData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub hidden: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl RenderGraph {
    pub fn visible_nodes(&self) -> impl Iterator<Item = &RenderNode> {
        self.nodes.iter().filter(|n| !n.hidden)
    }

    pub fn visible_edges(&self) -> impl Iterator<Item = &RenderEdge> {
        self.edges.iter().filter(|e| !e.hidden)
    }
}

pub fn edge_id(parent: GoalId, child: GoalId) -> String {
    format!("e{parent}-{child}")
}

fn shorten(description: &str, max: usize) -> String {
    if max == 0 || description.chars().count() <= max {
        return description.to_string();
    }
    let mut out: String = description.chars().take(max).collect();
    out.push_str("...");
    out
}

/// Flattens the forest into canvas nodes and parent edges, pre-order.
pub fn project(
    forest: &GoalForest,
    positions: &LayoutPositions,
    visibility: &VisibilitySet,
    settings: &RenderSettings,
) -> RenderGraph {
    let mut graph = RenderGraph::default();
    for (_, node) in forest.iter() {
        let record = &node.record;
        let id = record.id;
        let description = if settings.show_descriptions {
            record
                .description
                .as_deref()
                .map(|d| shorten(d, settings.max_description_length))
        } else {
            None
        };
        graph.nodes.push(RenderNode {
            id: id.to_string(),
            kind: "goal",
            position: positions.get(&id).copied().unwrap_or_else(|| record.position()),
            hidden: !visibility.is_visible(id),
            data: RenderNodeData {
                title: record.title.clone(),
                description,
                status: record.status,
                color: record.color.clone(),
                priority: record.priority,
                progress: node.progress,
                collapsed: record.collapsed,
                has_children: !node.children.is_empty(),
                descendant_count: node.descendant_count,
                created_at: ts_ms_to_rfc3339(record.created_at_ms),
                updated_at: ts_ms_to_rfc3339(record.updated_at_ms),
                is_root: node.is_root(),
            },
        });
        if let Some(parent) = node.parent {
            let parent_id = forest.node(parent).id();
            graph.edges.push(RenderEdge {
                id: edge_id(parent_id, id),
                source: parent_id.to_string(),
                target: id.to_string(),
                hidden: !visibility.is_edge_visible(forest, parent_id, id),
            });
        }
    }
    graph
}

/// Change reported by the canvas, addressed by render id.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderEdit {
    /// Drag finished with the node at `(x, y)`; its subtree follows.
    NodeMoved { id: String, x: f64, y: f64 },
    /// Text field edits. Empty description or color clears the field.
    FieldsEdited {
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        priority: Option<String>,
    },
    ToggleCollapsed { id: String },
}

/// Record store writes that realize one canvas edit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditPlan {
    pub patches: Vec<(GoalId, GoalPatch)>,
    /// Written as one atomic batch.
    pub positions: Vec<PositionUpdate>,
}

fn render_id(raw: &str) -> Result<GoalId, ValidationError> {
    GoalId::parse(raw).map_err(|err| ValidationError::InvalidId(err.message()))
}

fn parse_field<T>(
    field: &'static str,
    value: Option<String>,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ValidationError> {
    value
        .map(|raw| parse(&raw).ok_or(ValidationError::UnknownValue { field, value: raw }))
        .transpose()
}

/// Maps a canvas edit back onto record store writes.
pub fn plan_edit(
    forest: &GoalForest,
    positions: &LayoutPositions,
    edit: RenderEdit,
) -> Result<EditPlan, GoalError> {
    match edit {
        RenderEdit::NodeMoved { id, x, y } => {
            let id = render_id(&id)?;
            let target = Position::from_canvas(x, y)?;
            let members = subtree_ids(forest, id)?;
            let current = positions.get(&id).copied().unwrap_or_default();
            let (dx, dy) = (
                target.x.saturating_sub(current.x),
                target.y.saturating_sub(current.y),
            );
            if (dx, dy) == (0, 0) {
                return Ok(EditPlan::default());
            }
            let positions = members
                .iter()
                .map(|member| {
                    let origin = positions.get(member).copied().unwrap_or_default();
                    PositionUpdate::new(*member, origin.offset(dx, dy))
                })
                .collect();
            Ok(EditPlan {
                patches: Vec::new(),
                positions,
            })
        }
        RenderEdit::FieldsEdited {
            id,
            title,
            description,
            status,
            color,
            priority,
        } => {
            let id = render_id(&id)?;
            if !forest.contains(id) {
                return Err(GoalError::NotFound { id });
            }
            let patch = GoalPatch {
                title,
                description: description.map(Some),
                status: parse_field("status", status, GoalStatus::from_str)?,
                color: color.map(Some),
                priority: parse_field("priority", priority, GoalPriority::from_str)?,
                ..GoalPatch::default()
            }
            .normalized()?;
            let patches = if patch.is_empty() {
                Vec::new()
            } else {
                vec![(id, patch)]
            };
            Ok(EditPlan {
                patches,
                positions: Vec::new(),
            })
        }
        RenderEdit::ToggleCollapsed { id } => {
            let id = render_id(&id)?;
            let patch = crate::editor::toggle_collapsed(forest, id)?;
            Ok(EditPlan {
                patches: vec![(id, patch)],
                positions: Vec::new(),
            })
        }
    }
}
