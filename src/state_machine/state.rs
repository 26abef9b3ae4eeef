//! Conversation state types

use crate::db::TurnId;
use serde::Serialize;

/// State of the single conversation.
///
/// `AwaitingResponse` always names the one pending assistant turn; there is
/// never more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready to accept a user message
    #[default]
    Idle,
    /// A pending assistant turn exists and is waiting to be completed
    AwaitingResponse {
        pending_turn: TurnId,
        /// An inference call for `pending_turn` is outstanding
        in_flight: bool,
    },
}

impl ConvState {
    pub fn is_busy(&self) -> bool {
        matches!(self, ConvState::AwaitingResponse { .. })
    }

    pub fn pending_turn(&self) -> Option<TurnId> {
        match self {
            ConvState::Idle => None,
            ConvState::AwaitingResponse { pending_turn, .. } => Some(*pending_turn),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::AwaitingResponse { in_flight: false, .. } => "awaiting_response",
            ConvState::AwaitingResponse { in_flight: true, .. } => "requesting",
        }
    }
}
