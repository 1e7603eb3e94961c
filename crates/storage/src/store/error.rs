#![forbid(unsafe_code)]

use gm_core::{GoalError, GoalId, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unknown goal {id}")]
    UnknownGoal { id: GoalId },
    #[error("invalid row: {0}")]
    InvalidRow(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

impl From<StoreError> for GoalError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(err) => GoalError::Validation(err),
            StoreError::UnknownGoal { id } => GoalError::NotFound { id },
            other => GoalError::store(other),
        }
    }
}
