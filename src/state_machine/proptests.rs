//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::db::{TurnId, TurnStatus};
use crate::llm::FailureKind;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_failure_kind() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::Unreachable),
        Just(FailureKind::BadResponse),
        Just(FailureKind::Empty),
    ]
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::Idle),
        (1i64..1000, any::<bool>()).prop_map(|(id, in_flight)| ConvState::AwaitingResponse {
            pending_turn: TurnId(id),
            in_flight,
        }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|text| Event::UserMessage { text }),
        Just(Event::Poll),
        (1i64..1000).prop_map(|id| Event::ExchangeRecorded {
            user_turn: TurnId(id),
            pending_turn: TurnId(id + 1),
        }),
        "[a-z ]{1,20}".prop_map(|text| Event::InferenceSucceeded { text }),
        (arb_failure_kind(), "[a-z ]{1,20}")
            .prop_map(|(kind, notice)| Event::InferenceFailed { kind, notice }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // A user message is never accepted while a reply is outstanding
    #[test]
    fn prop_busy_never_records(state in arb_state(), text in "[a-z]{1,20}") {
        let result = transition(&state, Event::UserMessage { text });
        if state.is_busy() {
            prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
        } else {
            let result = result.unwrap();
            prop_assert_eq!(result.new_state, ConvState::Idle);
            prop_assert_eq!(result.effects.len(), 1);
        }
    }

    // At most one completion request per pending turn, whatever the event order
    #[test]
    fn prop_single_flight(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = ConvState::Idle;
        let mut outstanding = 0u32;

        for event in events {
            let Ok(result) = transition(&state, event) else { continue };
            for effect in &result.effects {
                match effect {
                    Effect::RequestCompletion { pending_turn } => {
                        prop_assert_eq!(state.pending_turn(), Some(*pending_turn));
                        outstanding += 1;
                    }
                    Effect::FinalizeTurn { turn_id, .. } => {
                        prop_assert_eq!(state.pending_turn(), Some(*turn_id));
                        outstanding -= 1;
                    }
                    Effect::RecordExchange { .. } => {
                        prop_assert!(!state.is_busy());
                    }
                }
                prop_assert!(outstanding <= 1);
            }
            state = result.new_state;
        }
    }

    // Every finalize names a final status and leaves the machine idle
    #[test]
    fn prop_finalize_returns_to_idle(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            let finalizes = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::FinalizeTurn { .. }))
                .count();
            if finalizes > 0 {
                prop_assert_eq!(finalizes, 1);
                prop_assert_eq!(result.new_state, ConvState::Idle);
                for effect in &result.effects {
                    if let Effect::FinalizeTurn { status, .. } = effect {
                        prop_assert_ne!(*status, TurnStatus::Pending);
                    }
                }
            }
        }
    }

    // Pure: the same input always yields the same output
    #[test]
    fn prop_deterministic(state in arb_state(), event in arb_event()) {
        let a = transition(&state, event.clone());
        let b = transition(&state, event);
        match (a, b) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.new_state, b.new_state);
                prop_assert_eq!(a.effects, b.effects);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            _ => prop_assert!(false, "outcomes diverged"),
        }
    }
}
