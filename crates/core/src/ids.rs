#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a goal record, assigned by the record store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalId(i64);

impl GoalId {
    pub fn get(self) -> i64 {
        self.0
    }

    pub fn try_new(value: i64) -> Result<Self, GoalIdError> {
        if value <= 0 {
            return Err(GoalIdError::NotPositive);
        }
        Ok(Self(value))
    }

    /// Parses both plain ids (`"12"`) and render ids carrying the node prefix
    /// some canvases add (`"goal-12"`).
    pub fn parse(value: &str) -> Result<Self, GoalIdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(GoalIdError::Empty);
        }
        let raw = trimmed.strip_prefix("goal-").unwrap_or(trimmed);
        let parsed = raw.parse::<i64>().map_err(|_| GoalIdError::NotNumeric)?;
        Self::try_new(parsed)
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GoalIdError {
    Empty,
    NotNumeric,
    NotPositive,
}

impl GoalIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "goal id must not be empty",
            Self::NotNumeric => "goal id must be an integer",
            Self::NotPositive => "goal id must be positive",
        }
    }
}

impl fmt::Display for GoalIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for GoalIdError {}
