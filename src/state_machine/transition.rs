//! Pure state transition function

use super::{ConvState, Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A reply is still being generated, try again shortly")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(state: &ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (*state, event) {
        // ============================================================
        // User Message Handling
        // ============================================================

        (ConvState::Idle, Event::UserMessage { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            // Stay idle until the store has assigned the turn ids
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::RecordExchange { text }))
        }

        (ConvState::AwaitingResponse { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::Busy)
        }

        (ConvState::Idle, Event::ExchangeRecorded { pending_turn, .. }) => {
            Ok(TransitionResult::new(ConvState::AwaitingResponse {
                pending_turn,
                in_flight: false,
            }))
        }

        // ============================================================
        // Polling
        // ============================================================

        (
            ConvState::AwaitingResponse {
                pending_turn,
                in_flight: false,
            },
            Event::Poll,
        ) => Ok(TransitionResult::new(ConvState::AwaitingResponse {
            pending_turn,
            in_flight: true,
        })
        .with_effect(Effect::RequestCompletion { pending_turn })),

        // Nothing to advance: either idle or the call is already outstanding
        (ConvState::Idle | ConvState::AwaitingResponse { in_flight: true, .. }, Event::Poll) => {
            Ok(TransitionResult::new(*state))
        }

        // ============================================================
        // Inference Outcome
        // ============================================================

        (
            ConvState::AwaitingResponse {
                pending_turn,
                in_flight: true,
            },
            Event::InferenceSucceeded { text },
        ) => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::complete_turn(pending_turn, text))),

        (
            ConvState::AwaitingResponse {
                pending_turn,
                in_flight: true,
            },
            Event::InferenceFailed { notice, .. },
        ) => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::fail_turn(pending_turn, notice))),

        // ============================================================
        // Everything else is a bug in the caller
        // ============================================================

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} in state {}",
            state.name()
        ))),
    }
}
