//! Events that can occur in a conversation

use crate::db::TurnId;
use crate::llm::FailureKind;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
    },
    /// Follow-up refresh from the client; advances a waiting turn
    Poll,

    // Store events
    ExchangeRecorded {
        user_turn: TurnId,
        pending_turn: TurnId,
    },

    // Inference events
    InferenceSucceeded {
        text: String,
    },
    InferenceFailed {
        kind: FailureKind,
        notice: String,
    },
}
