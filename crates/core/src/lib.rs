#![forbid(unsafe_code)]

pub mod editor;
pub mod error;
pub mod ids;
pub mod layout;
pub mod memory;
pub mod model;
pub mod progress;
pub mod projection;
pub mod session;
pub mod store;
pub mod time;
pub mod tree;
pub mod visibility;

#[cfg(test)]
mod test_support;

pub use error::{GoalError, ValidationError};
pub use ids::GoalId;
pub use model::{GoalPatch, GoalPriority, GoalRecord, GoalStatus, NewGoal, Position, PositionUpdate};
pub use session::{GoalSession, RefreshToken, SessionConfig};
pub use store::RecordStore;
