//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the coordinator with mock implementations.

use crate::db::{Database, DbResult, Turn, TurnId, TurnStatus};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage for conversation turns
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Append the user turn and the pending assistant turn together
    async fn append_exchange(&self, user_text: &str) -> DbResult<(TurnId, TurnId)>;

    /// Finalize a pending turn
    async fn update_status(
        &self,
        id: TurnId,
        status: TurnStatus,
        content: Option<&str>,
    ) -> DbResult<()>;

    /// Turns in canonical order, optionally only the most recent `limit`
    async fn list_ordered(&self, limit: Option<usize>) -> DbResult<Vec<Turn>>;

    /// The pending turn, if one exists
    async fn pending_turn(&self) -> DbResult<Option<Turn>>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: TurnStore + ?Sized> TurnStore for Arc<T> {
    async fn append_exchange(&self, user_text: &str) -> DbResult<(TurnId, TurnId)> {
        (**self).append_exchange(user_text).await
    }

    async fn update_status(
        &self,
        id: TurnId,
        status: TurnStatus,
        content: Option<&str>,
    ) -> DbResult<()> {
        (**self).update_status(id, status, content).await
    }

    async fn list_ordered(&self, limit: Option<usize>) -> DbResult<Vec<Turn>> {
        (**self).list_ordered(limit).await
    }

    async fn pending_turn(&self) -> DbResult<Option<Turn>> {
        (**self).pending_turn().await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

#[async_trait]
impl TurnStore for Database {
    async fn append_exchange(&self, user_text: &str) -> DbResult<(TurnId, TurnId)> {
        Database::append_exchange(self, user_text)
    }

    async fn update_status(
        &self,
        id: TurnId,
        status: TurnStatus,
        content: Option<&str>,
    ) -> DbResult<()> {
        Database::update_status(self, id, status, content)
    }

    async fn list_ordered(&self, limit: Option<usize>) -> DbResult<Vec<Turn>> {
        Database::list_ordered(self, limit)
    }

    async fn pending_turn(&self) -> DbResult<Option<Turn>> {
        Database::pending_turn(self)
    }
}
