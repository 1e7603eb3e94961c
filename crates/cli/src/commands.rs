#![forbid(unsafe_code)]

use crate::args::{Cli, Command, CreateArgs, UpdateArgs};
use crate::response;
use gm_core::layout::{LayoutPositions, LayoutSpacing};
use gm_core::projection::RenderEdit;
use gm_core::time::ts_ms_to_rfc3339;
use gm_core::tree::{GoalForest, NodeIndex};
use gm_core::{
    GoalError, GoalId, GoalPatch, GoalRecord, GoalSession, NewGoal, RecordStore, SessionConfig,
    ValidationError,
};
use gm_storage::SqliteStore;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::debug;

/// Runs one command and returns the response envelope.
pub(crate) fn execute(cli: Cli) -> Result<Value, GoalError> {
    let mut store = SqliteStore::open(&cli.storage_dir)?;
    debug!(path = %store.db_path().display(), "using goal database");

    let seeded = match cli.command {
        Command::Seed => Some(store.seed_demo()?),
        _ => None,
    };

    let config = SessionConfig {
        spacing: LayoutSpacing::default(),
        render: cli.render_settings(),
        direction: cli.direction,
    };
    let mut session = GoalSession::open(store, config)?;

    let (intent, result) = match cli.command {
        Command::List => ("list", records_json(&session.store_mut().list_all()?)?),
        Command::Tree { root } => ("tree", tree_result(session.forest(), root)?),
        Command::Show { id } => ("show", show_result(session.forest(), id)?),
        Command::Children { parent } => {
            let children = session.store_mut().list_children(parent)?;
            ("children", records_json(&children)?)
        }
        Command::Create(args) => ("create", record_json(&create(&mut session, args)?)?),
        Command::Update(args) => ("update", record_json(&update(&mut session, args)?)?),
        Command::Reparent { id, parent, root } => {
            let parent = if root { None } else { parent };
            ("reparent", record_json(&session.reparent(id, parent)?)?)
        }
        Command::Move { id, dx, dy } => {
            let moved = session.move_subtree(id, dx, dy)?;
            ("move", json!({ "id": id, "moved": moved }))
        }
        Command::Collapse { id } => ("collapse", record_json(&session.set_collapsed(id, true)?)?),
        Command::Expand { id } => ("expand", record_json(&session.set_collapsed(id, false)?)?),
        Command::Delete { id } => {
            let plan = session.delete_goal(id)?;
            ("delete", json!({ "root": plan.root, "removed": plan.removed }))
        }
        Command::Layout { scope, tree_of } => {
            let direction = session.config().direction;
            let positions = match tree_of {
                Some(member) => session.auto_layout_tree_of(member, direction)?,
                None => session.auto_layout(direction, scope)?,
            };
            ("layout", positions_json(&positions, direction.as_str()))
        }
        Command::Render => ("render", to_json(&session.render())?),
        Command::Apply { edit } => {
            let edit: RenderEdit = serde_json::from_str(&edit).map_err(|err| {
                ValidationError::UnknownValue {
                    field: "edit",
                    value: err.to_string(),
                }
            })?;
            session.apply_edit(edit)?;
            ("apply", to_json(&session.render())?)
        }
        Command::Seed => {
            let seeded = seeded.unwrap_or_default();
            (
                "seed",
                json!({
                    "seeded": seeded.len(),
                    "roots": seeded.iter().filter(|g| g.is_root()).map(|g| g.id).collect::<Vec<_>>(),
                }),
            )
        }
    };

    let warnings = response::diagnostics(session.diagnostics());
    Ok(response::ok_with_warnings(intent, result, warnings))
}

fn create(session: &mut GoalSession<SqliteStore>, args: CreateArgs) -> Result<GoalRecord, GoalError> {
    let goal = NewGoal {
        title: args.title,
        description: args.description,
        parent_id: args.parent,
        status: args.status,
        color: args.color,
        priority: args.priority,
        x: args.x,
        y: args.y,
    };
    match goal.parent_id {
        Some(parent) => session.add_subgoal(parent, goal),
        None => session.create_goal(goal),
    }
}

fn update(session: &mut GoalSession<SqliteStore>, args: UpdateArgs) -> Result<GoalRecord, GoalError> {
    let patch = GoalPatch {
        title: args.title,
        description: args.description.map(Some),
        status: args.status,
        color: args.color.map(Some),
        priority: args.priority,
        ..GoalPatch::default()
    };
    session.update_goal(args.id, patch)
}

fn to_json(value: &impl serde::Serialize) -> Result<Value, GoalError> {
    serde_json::to_value(value).map_err(GoalError::store)
}

fn record_json(record: &GoalRecord) -> Result<Value, GoalError> {
    let mut value = to_json(record)?;
    if let Value::Object(map) = &mut value {
        map.insert(
            "created_at".to_string(),
            Value::String(ts_ms_to_rfc3339(record.created_at_ms)),
        );
        map.insert(
            "updated_at".to_string(),
            Value::String(ts_ms_to_rfc3339(record.updated_at_ms)),
        );
    }
    Ok(value)
}

fn records_json(records: &[GoalRecord]) -> Result<Value, GoalError> {
    records
        .iter()
        .map(record_json)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn positions_json(positions: &LayoutPositions, direction: &str) -> Value {
    let nodes: Vec<Value> = positions
        .iter()
        .map(|(id, position)| json!({ "id": id, "x": position.x, "y": position.y }))
        .collect();
    json!({ "direction": direction, "positions": nodes })
}

/// Nested view of the forest, children inlined under their parent.
fn tree_result(forest: &GoalForest, root: Option<GoalId>) -> Result<Value, GoalError> {
    match root {
        Some(id) => {
            let subtree = forest.subtree(id).ok_or(GoalError::NotFound { id })?;
            let mut nested = nest(&subtree)?;
            Ok(nested.pop().unwrap_or(Value::Null))
        }
        None => nest(forest).map(Value::Array),
    }
}

fn nest(forest: &GoalForest) -> Result<Vec<Value>, GoalError> {
    // Pre-order arena: walking backwards finishes every child before its parent.
    let mut built: HashMap<NodeIndex, Value> = HashMap::with_capacity(forest.len());
    for (idx, node) in forest.iter().rev() {
        let children: Vec<Value> = node
            .children
            .iter()
            .filter_map(|child| built.remove(child))
            .collect();
        built.insert(
            idx,
            json!({
                "id": node.id(),
                "title": node.record.title,
                "status": node.record.status,
                "progress": node.progress,
                "collapsed": node.record.collapsed,
                "children": children,
            }),
        );
    }
    Ok(forest
        .roots()
        .iter()
        .filter_map(|root| built.remove(root))
        .collect())
}

fn show_result(forest: &GoalForest, id: GoalId) -> Result<Value, GoalError> {
    let node = forest.get(id).ok_or(GoalError::NotFound { id })?;
    let mut value = record_json(&node.record)?;
    if let Value::Object(map) = &mut value {
        map.insert("progress".to_string(), json!(node.progress));
        map.insert("depth".to_string(), json!(node.depth));
        map.insert("descendant_count".to_string(), json!(node.descendant_count));
        map.insert("ancestors".to_string(), json!(forest.ancestors(id)));
        map.insert("children".to_string(), json!(forest.children_of(id)));
    }
    Ok(value)
}
