#![forbid(unsafe_code)]

use crate::error::ValidationError;
use crate::ids::GoalId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "not started" | "notstarted" | "todo" => Some(Self::NotStarted),
            "in progress" | "inprogress" | "doing" => Some(Self::InProgress),
            "done" | "complete" | "completed" => Some(Self::Done),
            _ => None,
        }
    }

    /// Stored rows may carry statuses written by older clients; anything
    /// unrecognized counts as not started.
    pub fn parse_lenient(value: &str) -> Self {
        Self::from_str(value).unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl GoalPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn parse_lenient(value: &str) -> Self {
        Self::from_str(value).unwrap_or_default()
    }
}

/// Integer canvas coordinates. `(0, 0)` means "never placed".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub const UNPLACED: Position = Position { x: 0, y: 0 };

    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn is_placed(self) -> bool {
        self != Self::UNPLACED
    }

    pub fn offset(self, dx: i64, dy: i64) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Rounds renderer coordinates to the persisted integer grid.
    pub fn from_canvas(x: f64, y: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            x: canvas_axis(x, 'x')?,
            y: canvas_axis(y, 'y')?,
        })
    }
}

/// A goal exactly as the record store keeps it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub id: GoalId,
    pub parent_id: Option<GoalId>,
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub color: Option<String>,
    pub priority: GoalPriority,
    pub x: i64,
    pub y: i64,
    pub collapsed: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl GoalRecord {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Fields accepted when creating a goal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub parent_id: Option<GoalId>,
    pub status: Option<GoalStatus>,
    pub color: Option<String>,
    pub priority: Option<GoalPriority>,
    pub x: Option<i64>,
    pub y: Option<i64>,
}

impl NewGoal {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn under(mut self, parent: GoalId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_status(mut self, status: GoalStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn at(mut self, position: Position) -> Self {
        self.x = Some(position.x);
        self.y = Some(position.y);
        self
    }

    /// Trims text fields and rejects empty titles and negative placements.
    /// Parent existence is checked by the store.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let title = normalize_title(&self.title)?;
        check_placement(self.x, self.y)?;
        Ok(Self {
            title,
            description: normalize_optional(self.description),
            color: normalize_optional(self.color),
            ..self
        })
    }
}

/// Partial update. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub status: Option<GoalStatus>,
    pub color: Option<Option<String>>,
    pub priority: Option<GoalPriority>,
    /// `Some(None)` turns the goal into a root.
    pub parent_id: Option<Option<GoalId>>,
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub collapsed: Option<bool>,
}

impl GoalPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn position(position: Position) -> Self {
        Self {
            x: Some(position.x),
            y: Some(position.y),
            ..Self::default()
        }
    }

    pub fn collapsed(collapsed: bool) -> Self {
        Self {
            collapsed: Some(collapsed),
            ..Self::default()
        }
    }

    /// Same placement rule as [`NewGoal::normalized`]. Engine moves go through
    /// position batches instead.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let title = self.title.as_deref().map(normalize_title).transpose()?;
        check_placement(self.x, self.y)?;
        Ok(Self {
            title,
            description: self.description.map(normalize_optional),
            color: self.color.map(normalize_optional),
            ..self
        })
    }

    /// Applies the patch to a record in memory. Timestamps are left to the store.
    pub fn apply_to(&self, record: &mut GoalRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(color) = &self.color {
            record.color = color.clone();
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(parent_id) = self.parent_id {
            record.parent_id = parent_id;
        }
        if let Some(x) = self.x {
            record.x = x;
        }
        if let Some(y) = self.y {
            record.y = y;
        }
        if let Some(collapsed) = self.collapsed {
            record.collapsed = collapsed;
        }
    }
}

/// One entry of an atomic position batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: GoalId,
    pub x: i64,
    pub y: i64,
}

impl PositionUpdate {
    pub fn new(id: GoalId, position: Position) -> Self {
        Self {
            id,
            x: position.x,
            y: position.y,
        }
    }
}

fn normalize_title(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

const CANVAS_LIMIT: f64 = i32::MAX as f64;

fn canvas_axis(value: f64, axis: char) -> Result<i64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteCoordinate { axis });
    }
    let value = value.round();
    if value.abs() > CANVAS_LIMIT {
        return Err(ValidationError::CoordinateOutOfRange { axis });
    }
    Ok(value as i64)
}

fn check_placement(x: Option<i64>, y: Option<i64>) -> Result<(), ValidationError> {
    if x.is_some_and(|x| x < 0) {
        return Err(ValidationError::NegativeCoordinate { axis: 'x' });
    }
    if y.is_some_and(|y| y < 0) {
        return Err(ValidationError::NegativeCoordinate { axis: 'y' });
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
