//! Effects produced by state transitions

use crate::db::{TurnId, TurnStatus};

/// Effects to be executed by the coordinator after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append the user turn and the pending assistant turn
    RecordExchange { text: String },

    /// Build the context window and call the inference backend
    RequestCompletion { pending_turn: TurnId },

    /// Move the pending turn to its final status
    FinalizeTurn {
        turn_id: TurnId,
        status: TurnStatus,
        content: String,
    },
}

impl Effect {
    pub fn complete_turn(turn_id: TurnId, text: String) -> Self {
        Effect::FinalizeTurn {
            turn_id,
            status: TurnStatus::Complete,
            content: text,
        }
    }

    pub fn fail_turn(turn_id: TurnId, notice: String) -> Self {
        Effect::FinalizeTurn {
            turn_id,
            status: TurnStatus::Failed,
            content: notice,
        }
    }
}
