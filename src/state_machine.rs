//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! `Idle` accepts a user message; `AwaitingResponse` holds the one pending
//! assistant turn until a poll drives its inference call to an outcome.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::ConvState;
pub use transition::{transition, TransitionError};
