#![forbid(unsafe_code)]

use crate::ids::GoalId;
use thiserror::Error;

/// Bad input shape or content. Always surfaced to the caller for correction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("{axis} coordinate must be a finite number")]
    NonFiniteCoordinate { axis: char },
    #[error("{axis} coordinate is outside the canvas")]
    CoordinateOutOfRange { axis: char },
    #[error("{axis} coordinate must not be negative")]
    NegativeCoordinate { axis: char },
    #[error("goal {id} cannot be its own parent")]
    SelfParent { id: GoalId },
    #[error("goal {parent} is a descendant of goal {id}; reparenting would create a cycle")]
    ParentCycle { id: GoalId, parent: GoalId },
    #[error("invalid goal id: {0}")]
    InvalidId(&'static str),
    #[error("unknown {field} value: {value}")]
    UnknownValue { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum GoalError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("goal {id} not found")]
    NotFound { id: GoalId },
    #[error("goal {id} references missing parent {parent}")]
    MalformedTree { id: GoalId, parent: GoalId },
    #[error("goal {id} closes a parent cycle; treated as a root")]
    Cycle { id: GoalId },
    #[error("deleting goal {id} left {remaining} descendant(s) behind")]
    PartialCascade { id: GoalId, remaining: usize },
    #[error("record store failure: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GoalError {
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Box::new(err))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::MalformedTree { .. } => "MALFORMED_TREE",
            Self::Cycle { .. } => "CYCLE",
            Self::PartialCascade { .. } => "PARTIAL_CASCADE",
            Self::Store(_) => "STORE",
        }
    }

    /// Errors after which the in-memory view may no longer match the store.
    pub fn requires_refresh(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::PartialCascade { .. } | Self::Store(_)
        )
    }
}
