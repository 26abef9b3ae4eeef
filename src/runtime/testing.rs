//! Mock implementations for testing
//!
//! These mocks enable coordinator testing without real I/O.

use super::traits::*;
use crate::db::{Database, DbError, DbResult, Turn, TurnId, TurnStatus};
use crate::llm::{CompletionResult, InferenceClient, InferenceError, LlmRequest, LlmResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock Inference Client
// ============================================================================

/// Mock inference client that returns queued results
pub struct MockInferenceClient {
    responses: Mutex<VecDeque<CompletionResult>>,
    delay: Option<Duration>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockInferenceClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Hold every call for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response
    pub fn queue_response(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(LlmResponse::from_text(text)));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: InferenceError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn complete(&self, request: &LlmRequest) -> CompletionResult {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::unreachable("no response queued")))
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Failing Store
// ============================================================================

/// In-memory store whose writes can be switched to fail
pub struct FailingStore {
    db: Database,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Sqlite(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_READONLY),
                Some("attempt to write a readonly database".to_string()),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TurnStore for FailingStore {
    async fn append_exchange(&self, user_text: &str) -> DbResult<(TurnId, TurnId)> {
        self.check_writable()?;
        self.db.append_exchange(user_text)
    }

    async fn update_status(
        &self,
        id: TurnId,
        status: TurnStatus,
        content: Option<&str>,
    ) -> DbResult<()> {
        self.check_writable()?;
        self.db.update_status(id, status, content)
    }

    async fn list_ordered(&self, limit: Option<usize>) -> DbResult<Vec<Turn>> {
        self.db.list_ordered(limit)
    }

    async fn pending_turn(&self) -> DbResult<Option<Turn>> {
        self.db.pending_turn()
    }
}

// ============================================================================
// Coordinator Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Budget, CharHeuristic};
    use crate::db::{NewTurn, Role};
    use crate::llm::{FailureKind, MessageRole};
    use crate::runtime::{CoordinatorError, TurnCoordinator, WindowSettings};
    use crate::state_machine::ConvState;
    use std::sync::Arc;

    type TestCoordinator = TurnCoordinator<Database, Arc<MockInferenceClient>>;

    fn settings(history_turns: usize) -> WindowSettings {
        WindowSettings {
            history_turns,
            token_budget: Budget::tokens(4096, CharHeuristic),
            system_prompt: "You are a helpful assistant.".to_string(),
        }
    }

    fn setup(history_turns: usize) -> (Arc<TestCoordinator>, Database, Arc<MockInferenceClient>) {
        let db = Database::open_in_memory().unwrap();
        let client = Arc::new(MockInferenceClient::new());
        let coordinator = Arc::new(TurnCoordinator::new(
            db.clone(),
            client.clone(),
            settings(history_turns),
        ));
        (coordinator, db, client)
    }

    fn roles_and_text(request: &LlmRequest) -> Vec<(MessageRole, String)> {
        request
            .messages
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_submit_then_poll_completes_turn() {
        let (coordinator, _db, client) = setup(20);
        client.queue_response("hello");

        let pending = coordinator.submit("hi").await.unwrap();
        assert_eq!(
            coordinator.status().await,
            ConvState::AwaitingResponse {
                pending_turn: pending,
                in_flight: false
            }
        );

        // Placeholder is visible before the poll
        let history = coordinator.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[1].is_pending());

        coordinator.poll().await.unwrap();

        let history = coordinator.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text(), "hi");
        assert_eq!(history[1].id, pending);
        assert_eq!(history[1].status, TurnStatus::Complete);
        assert_eq!(history[1].text(), "hello");
        assert_eq!(coordinator.status().await, ConvState::Idle);

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            roles_and_text(&requests[0]),
            vec![
                (MessageRole::System, "You are a helpful assistant.".to_string()),
                (MessageRole::User, "hi".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_timeout_records_failed_turn() {
        let (coordinator, _db, client) = setup(20);
        client.queue_error(InferenceError::unreachable("request timed out"));

        coordinator.submit("hi").await.unwrap();
        coordinator.poll().await.unwrap();

        let history = coordinator.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].status, TurnStatus::Failed);
        assert!(history[1].text().contains("could not be reached"));
        assert!(!coordinator.is_busy().await);
    }

    #[tokio::test]
    async fn test_submit_while_awaiting_is_busy() {
        let (coordinator, db, _client) = setup(20);

        coordinator.submit("first").await.unwrap();
        let err = coordinator.submit("second").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Busy));

        let turns = db.list_ordered(None).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns.iter().filter(|t| t.is_pending()).count(), 1);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (coordinator, db, _client) = setup(20);

        let err = coordinator.submit("   ").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::EmptyMessage));
        assert!(db.list_ordered(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_while_idle_makes_no_call() {
        let (coordinator, _db, client) = setup(20);

        coordinator.poll().await.unwrap();
        assert!(client.recorded_requests().is_empty());
        assert_eq!(coordinator.status().await, ConvState::Idle);
    }

    #[tokio::test]
    async fn test_concurrent_polls_make_one_call() {
        let db = Database::open_in_memory().unwrap();
        let client =
            Arc::new(MockInferenceClient::new().with_delay(Duration::from_millis(100)));
        client.queue_response("only once");
        let coordinator = Arc::new(TurnCoordinator::new(db, client.clone(), settings(20)));

        coordinator.submit("hi").await.unwrap();
        let (a, b) = tokio::join!(coordinator.poll(), coordinator.poll());
        a.unwrap();
        b.unwrap();

        assert_eq!(client.recorded_requests().len(), 1);
        let history = coordinator.history().await.unwrap();
        assert_eq!(history[1].text(), "only once");
    }

    #[tokio::test]
    async fn test_storage_failure_on_submit_stays_idle() {
        let store = Arc::new(FailingStore::new(Database::open_in_memory().unwrap()));
        let client = Arc::new(MockInferenceClient::new());
        let coordinator = TurnCoordinator::new(store.clone(), client, settings(20));

        store.set_failing(true);
        let err = coordinator.submit("hi").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Storage(_)));
        assert_eq!(coordinator.status().await, ConvState::Idle);
        assert!(coordinator.history().await.unwrap().is_empty());

        store.set_failing(false);
        coordinator.submit("hi").await.unwrap();
        assert!(coordinator.is_busy().await);
    }

    #[tokio::test]
    async fn test_storage_failure_on_finalize_keeps_turn_pending() {
        let store = Arc::new(FailingStore::new(Database::open_in_memory().unwrap()));
        let client = Arc::new(MockInferenceClient::new());
        client.queue_response("lost");
        client.queue_response("saved");
        let coordinator = Arc::new(TurnCoordinator::new(store.clone(), client, settings(20)));

        let pending = coordinator.submit("hi").await.unwrap();
        store.set_failing(true);
        let err = coordinator.poll().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Storage(_)));
        assert_eq!(
            coordinator.status().await,
            ConvState::AwaitingResponse {
                pending_turn: pending,
                in_flight: false
            }
        );

        store.set_failing(false);
        coordinator.poll().await.unwrap();
        let history = coordinator.history().await.unwrap();
        assert_eq!(history[1].text(), "saved");
        assert_eq!(coordinator.status().await, ConvState::Idle);
    }

    #[tokio::test]
    async fn test_context_excludes_pending_and_failed_turns() {
        let (coordinator, _db, client) = setup(20);
        client.queue_error(InferenceError::new(FailureKind::BadResponse, "HTTP 500"));
        client.queue_response("second answer");

        coordinator.submit("first").await.unwrap();
        coordinator.poll().await.unwrap();
        coordinator.submit("second").await.unwrap();
        coordinator.poll().await.unwrap();

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            roles_and_text(&requests[1]),
            vec![
                (MessageRole::System, "You are a helpful assistant.".to_string()),
                (MessageRole::User, "first".to_string()),
                (MessageRole::User, "second".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_turn_budget_of_one_sends_latest_turn() {
        let (coordinator, db, client) = setup(1);
        db.append(&NewTurn::user("a")).unwrap();
        db.append(&NewTurn {
            role: Role::Assistant,
            content: Some("b".to_string()),
            status: TurnStatus::Complete,
        })
        .unwrap();
        client.queue_response("d");

        coordinator.submit("c").await.unwrap();
        coordinator.poll().await.unwrap();

        let requests = client.recorded_requests();
        assert_eq!(
            roles_and_text(&requests[0]),
            vec![
                (MessageRole::System, "You are a helpful assistant.".to_string()),
                (MessageRole::User, "c".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_restore_resumes_pending_turn() {
        let db = Database::open_in_memory().unwrap();
        let (_, pending) = db.append_exchange("left over").unwrap();
        let client = Arc::new(MockInferenceClient::new());
        client.queue_response("resumed");

        let coordinator = Arc::new(
            TurnCoordinator::restore(db.clone(), client, settings(20))
                .await
                .unwrap(),
        );
        assert_eq!(coordinator.status().await.pending_turn(), Some(pending));
        assert!(matches!(
            coordinator.submit("new").await,
            Err(CoordinatorError::Busy)
        ));

        coordinator.poll().await.unwrap();
        assert_eq!(db.get_turn(pending).unwrap().text(), "resumed");
    }
}
