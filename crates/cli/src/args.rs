#![forbid(unsafe_code)]

use clap::{Args, Parser, Subcommand};
use gm_core::layout::LayoutDirection;
use gm_core::projection::RenderSettings;
use gm_core::{GoalId, GoalPriority, GoalStatus};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "goalmap")]
#[command(about = "Goal hierarchies: progress roll-up, layered layout and subtree edits")]
pub(crate) struct Cli {
    /// Directory holding the goal database
    #[arg(long, env = "GOALMAP_STORAGE_DIR", default_value = ".goalmap", global = true)]
    pub storage_dir: PathBuf,

    /// Layout direction: tb, bt, lr or rl
    #[arg(long, env = "GOALMAP_DIRECTION", default_value = "tb", value_parser = parse_direction, global = true)]
    pub direction: LayoutDirection,

    /// Include descriptions in rendered nodes
    #[arg(long, env = "GOALMAP_SHOW_DESCRIPTIONS", default_value_t = true, action = clap::ArgAction::Set, global = true)]
    pub show_descriptions: bool,

    /// Rendered descriptions are cut to this many characters (0 keeps them whole)
    #[arg(long, env = "GOALMAP_MAX_DESCRIPTION_LENGTH", default_value_t = 50, global = true)]
    pub max_description_length: usize,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            show_descriptions: self.show_descriptions,
            max_description_length: self.max_description_length,
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Every goal as a flat list
    List,
    /// Assembled forest with progress, or one subtree of it
    Tree {
        #[arg(long, value_parser = parse_goal_id)]
        root: Option<GoalId>,
    },
    /// One goal with its progress and ancestry
    Show {
        #[arg(value_parser = parse_goal_id)]
        id: GoalId,
    },
    /// Direct children of a goal, or the roots
    Children {
        #[arg(long, value_parser = parse_goal_id)]
        parent: Option<GoalId>,
    },
    Create(CreateArgs),
    Update(UpdateArgs),
    /// Move a goal under another parent
    Reparent {
        #[arg(value_parser = parse_goal_id)]
        id: GoalId,
        #[arg(long, value_parser = parse_goal_id, conflicts_with = "root", required_unless_present = "root")]
        parent: Option<GoalId>,
        /// Detach the goal and make it a root
        #[arg(long)]
        root: bool,
    },
    /// Translate a goal and its whole subtree
    Move {
        #[arg(value_parser = parse_goal_id)]
        id: GoalId,
        #[arg(long, allow_negative_numbers = true)]
        dx: i64,
        #[arg(long, allow_negative_numbers = true)]
        dy: i64,
    },
    Collapse {
        #[arg(value_parser = parse_goal_id)]
        id: GoalId,
    },
    Expand {
        #[arg(value_parser = parse_goal_id)]
        id: GoalId,
    },
    /// Delete a goal and all of its descendants
    Delete {
        #[arg(value_parser = parse_goal_id)]
        id: GoalId,
    },
    /// Run the layered auto-layout and persist the result
    Layout {
        /// Lay out only this goal's subtree
        #[arg(long, value_parser = parse_goal_id, conflicts_with = "tree_of")]
        scope: Option<GoalId>,
        /// Lay out the whole tree containing this goal
        #[arg(long, value_parser = parse_goal_id)]
        tree_of: Option<GoalId>,
    },
    /// Canvas view: nodes and edges with visibility flags
    Render,
    /// Apply a canvas edit given as JSON, e.g. {"kind":"toggle_collapsed","id":"3"}
    Apply {
        edit: String,
    },
    /// Replace all goals with the demo tree
    Seed,
}

#[derive(Debug, Args)]
pub(crate) struct CreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_parser = parse_goal_id)]
    pub parent: Option<GoalId>,
    #[arg(long, value_parser = parse_status)]
    pub status: Option<GoalStatus>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<GoalPriority>,
    #[arg(long, requires = "y")]
    pub x: Option<i64>,
    #[arg(long, requires = "x")]
    pub y: Option<i64>,
}

#[derive(Debug, Args)]
pub(crate) struct UpdateArgs {
    #[arg(value_parser = parse_goal_id)]
    pub id: GoalId,
    #[arg(long)]
    pub title: Option<String>,
    /// New description; an empty string clears it
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_parser = parse_status)]
    pub status: Option<GoalStatus>,
    /// New color; an empty string clears it
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<GoalPriority>,
}

fn parse_goal_id(raw: &str) -> Result<GoalId, String> {
    GoalId::parse(raw).map_err(|err| err.message().to_string())
}

fn parse_direction(raw: &str) -> Result<LayoutDirection, String> {
    LayoutDirection::from_str(raw).ok_or_else(|| format!("unknown direction: {raw}"))
}

fn parse_status(raw: &str) -> Result<GoalStatus, String> {
    GoalStatus::from_str(raw).ok_or_else(|| format!("unknown status: {raw}"))
}

fn parse_priority(raw: &str) -> Result<GoalPriority, String> {
    GoalPriority::from_str(raw).ok_or_else(|| format!("unknown priority: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["goalmap", "render"]).unwrap();
        assert_eq!(cli.storage_dir, PathBuf::from(".goalmap"));
        assert_eq!(cli.direction, LayoutDirection::TopBottom);
        assert_eq!(cli.render_settings(), RenderSettings::default());
        assert!(matches!(cli.command, Command::Render));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "goalmap",
            "layout",
            "--tree-of",
            "goal-4",
            "--direction",
            "lr",
            "--show-descriptions",
            "false",
        ])
        .unwrap();
        assert_eq!(cli.direction, LayoutDirection::LeftRight);
        assert!(!cli.show_descriptions);
        match cli.command {
            Command::Layout { scope, tree_of } => {
                assert_eq!(scope, None);
                assert_eq!(tree_of, Some(GoalId::try_new(4).unwrap()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn move_accepts_negative_deltas() {
        let cli = Cli::try_parse_from(["goalmap", "move", "3", "--dx", "-40", "--dy", "15"]).unwrap();
        match cli.command {
            Command::Move { id, dx, dy } => {
                assert_eq!(id.get(), 3);
                assert_eq!((dx, dy), (-40, 15));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Cli::try_parse_from(["goalmap", "show", "0"]).is_err());
        assert!(Cli::try_parse_from(["goalmap", "--direction", "up", "render"]).is_err());
        assert!(
            Cli::try_parse_from(["goalmap", "create", "--title", "x", "--status", "someday"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["goalmap", "reparent", "2", "--parent", "1", "--root"]).is_err());
    }
}
