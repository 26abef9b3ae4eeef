//! API request and response types

use crate::db::{Turn, TurnId};
use crate::state_machine::ConvState;
use serde::{Deserialize, Serialize};

/// Browser form submission
#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub user_input: String,
}

/// JSON chat submission
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response for an accepted message
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub pending_turn: TurnId,
}

/// Full history with the coordinator state
#[derive(Debug, Serialize)]
pub struct TurnsResponse {
    pub turns: Vec<Turn>,
    pub state: ConvState,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
