//! Turn coordinator: runs the state machine against the store and the
//! inference backend

use super::traits::TurnStore;
use super::{CoordinatorError, WindowSettings};

use crate::context::{build_context, Budget};
use crate::db::{Turn, TurnId, TurnStatus};
use crate::llm::{InferenceClient, LlmRequest};
use crate::state_machine::{transition, ConvState, Effect, Event};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Drives the single conversation through `Idle` and `AwaitingResponse`.
///
/// The state lock serializes every store write. It is never held across the
/// inference call; the `in_flight` flag keeps concurrent polls from starting
/// a second call meanwhile.
pub struct TurnCoordinator<S, C>
where
    S: TurnStore + 'static,
    C: InferenceClient + 'static,
{
    store: S,
    client: C,
    settings: WindowSettings,
    state: Mutex<ConvState>,
}

impl<S, C> TurnCoordinator<S, C>
where
    S: TurnStore + 'static,
    C: InferenceClient + 'static,
{
    pub fn new(store: S, client: C, settings: WindowSettings) -> Self {
        Self {
            store,
            client,
            settings,
            state: Mutex::new(ConvState::Idle),
        }
    }

    /// Build a coordinator whose state matches the store: a leftover pending
    /// turn puts it straight into `AwaitingResponse`.
    pub async fn restore(
        store: S,
        client: C,
        settings: WindowSettings,
    ) -> Result<Self, CoordinatorError> {
        let pending = store.pending_turn().await?;
        let coordinator = Self::new(store, client, settings);
        if let Some(turn) = pending {
            tracing::info!(turn_id = %turn.id, "Resuming with pending turn");
            *coordinator.state.lock().await = ConvState::AwaitingResponse {
                pending_turn: turn.id,
                in_flight: false,
            };
        }
        Ok(coordinator)
    }

    /// Current state snapshot
    pub async fn status(&self) -> ConvState {
        *self.state.lock().await
    }

    pub async fn is_busy(&self) -> bool {
        self.status().await.is_busy()
    }

    /// Full history in canonical order
    pub async fn history(&self) -> Result<Vec<Turn>, CoordinatorError> {
        Ok(self.store.list_ordered(None).await?)
    }

    /// Accept a user message. Returns the id of the pending assistant turn.
    pub async fn submit(&self, text: &str) -> Result<TurnId, CoordinatorError> {
        let mut state = self.state.lock().await;
        self.process_event(
            &mut state,
            Event::UserMessage {
                text: text.to_string(),
            },
        )
        .await?;

        state.pending_turn().ok_or_else(|| {
            CoordinatorError::Integrity("no pending turn after recording exchange".to_string())
        })
    }

    /// Advance a waiting turn: build the context, call the backend once and
    /// record the outcome. A no-op when idle or when the call is already
    /// outstanding.
    pub async fn poll(self: &Arc<Self>) -> Result<(), CoordinatorError> {
        let pending_turn = {
            let mut state = self.state.lock().await;
            match self.process_event(&mut state, Event::Poll).await? {
                Some(id) => id,
                None => return Ok(()),
            }
        };

        // Run detached so a dropped request cannot strand the in-flight flag
        let this = Arc::clone(self);
        let task = tokio::spawn(async move { this.complete_turn(pending_turn).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                self.release(pending_turn).await;
                Err(CoordinatorError::Integrity(format!(
                    "completion task for turn {pending_turn} failed: {e}"
                )))
            }
        }
    }

    async fn complete_turn(&self, pending_turn: TurnId) -> Result<(), CoordinatorError> {
        let request = match self.build_request(pending_turn).await {
            Ok(request) => request,
            Err(e) => {
                self.release(pending_turn).await;
                return Err(e);
            }
        };

        tracing::debug!(
            turn_id = %pending_turn,
            messages = request.messages.len(),
            "Requesting completion"
        );

        let event = match self.client.complete(&request).await {
            Ok(response) => Event::InferenceSucceeded {
                text: response.text,
            },
            Err(e) => Event::InferenceFailed {
                kind: e.kind,
                notice: e.user_notice(),
            },
        };

        if let Event::InferenceFailed { kind, .. } = &event {
            tracing::debug!(turn_id = %pending_turn, kind = kind.as_str(), "Recording failed turn");
        }

        let mut state = self.state.lock().await;
        if let Err(e) = self.process_event(&mut state, event).await {
            // The turn is still pending in the store; a later poll may finish it
            tracing::error!(turn_id = %pending_turn, error = %e, "Failed to record outcome");
            *state = ConvState::AwaitingResponse {
                pending_turn,
                in_flight: false,
            };
            return Err(e);
        }
        Ok(())
    }

    /// Context for the pending turn: the most recent complete turns, windowed
    /// by count and then by size, behind the system prompt.
    async fn build_request(&self, pending_turn: TurnId) -> Result<LlmRequest, CoordinatorError> {
        let recent = self
            .store
            .list_ordered(Some(self.settings.history_turns.saturating_add(1)))
            .await?;

        let history: Vec<Turn> = recent
            .into_iter()
            .filter(|t| t.id != pending_turn && t.status == TurnStatus::Complete)
            .collect();

        let by_count = build_context(&history, &Budget::Turns(self.settings.history_turns));
        let window = build_context(by_count, &self.settings.token_budget);

        Ok(LlmRequest::new(&self.settings.system_prompt, window))
    }

    /// Clear the in-flight flag after a call that never produced an outcome
    async fn release(&self, pending_turn: TurnId) {
        let mut state = self.state.lock().await;
        if *state
            == (ConvState::AwaitingResponse {
                pending_turn,
                in_flight: true,
            })
        {
            *state = ConvState::AwaitingResponse {
                pending_turn,
                in_flight: false,
            };
        }
    }

    /// Run an event and every event its effects generate. The state is only
    /// committed once a transition's effects have all succeeded.
    ///
    /// Returns the turn to request a completion for, if the transition asked
    /// for one; that call happens outside the lock.
    async fn process_event(
        &self,
        state: &mut ConvState,
        event: Event,
    ) -> Result<Option<TurnId>, CoordinatorError> {
        let mut events_to_process = vec![event];
        let mut completion = None;

        while let Some(current_event) = events_to_process.pop() {
            let result = transition(state, current_event)?;

            for effect in result.effects {
                match effect {
                    Effect::RequestCompletion { pending_turn } => {
                        completion = Some(pending_turn);
                    }
                    other => {
                        if let Some(generated) = self.execute_effect(other).await? {
                            events_to_process.push(generated);
                        }
                    }
                }
            }

            if *state != result.new_state {
                tracing::debug!(from = state.name(), to = result.new_state.name(), "State change");
            }
            *state = result.new_state;
        }

        Ok(completion)
    }

    /// Execute a store effect and optionally return a generated event
    async fn execute_effect(&self, effect: Effect) -> Result<Option<Event>, CoordinatorError> {
        match effect {
            Effect::RecordExchange { text } => {
                let (user_turn, pending_turn) = self.store.append_exchange(&text).await?;
                tracing::info!(%user_turn, %pending_turn, chars = text.len(), "Recorded user message");
                Ok(Some(Event::ExchangeRecorded {
                    user_turn,
                    pending_turn,
                }))
            }

            Effect::FinalizeTurn {
                turn_id,
                status,
                content,
            } => {
                self.store
                    .update_status(turn_id, status, Some(&content))
                    .await?;
                tracing::info!(%turn_id, status = status.as_str(), "Turn finalized");
                Ok(None)
            }

            Effect::RequestCompletion { pending_turn } => Err(CoordinatorError::Integrity(
                format!("completion for turn {pending_turn} requested inside the state lock"),
            )),
        }
    }
}
