//! Runtime for driving the conversation
//!
//! The coordinator owns the conversation state and is the only writer to the
//! turn store. Storage and integrity failures surface as [`CoordinatorError`];
//! inference failures never do, they end up as failed turns.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::TurnCoordinator;
pub use traits::*;

use crate::context::Budget;
use crate::db::{Database, DbError};
use crate::llm::InferenceClient;
use crate::state_machine::TransitionError;
use std::sync::Arc;
use thiserror::Error;

/// Type alias for the production coordinator with concrete implementations
pub type ProductionCoordinator = TurnCoordinator<Database, Arc<dyn InferenceClient>>;

/// How history is windowed before each inference call
#[derive(Debug, Clone)]
pub struct WindowSettings {
    /// Most recent turns considered at all
    pub history_turns: usize,
    /// Size ceiling applied to those turns
    pub token_budget: Budget,
    pub system_prompt: String,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("A reply is still being generated, try again shortly")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Storage(DbError),
    #[error("Integrity violation: {0}")]
    Integrity(String),
}

impl From<DbError> for CoordinatorError {
    fn from(e: DbError) -> Self {
        if e.is_integrity() {
            CoordinatorError::Integrity(e.to_string())
        } else {
            CoordinatorError::Storage(e)
        }
    }
}

impl From<TransitionError> for CoordinatorError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Busy => CoordinatorError::Busy,
            TransitionError::EmptyMessage => CoordinatorError::EmptyMessage,
            TransitionError::InvalidTransition(msg) => CoordinatorError::Integrity(msg),
        }
    }
}
