//! Database schema and turn types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS turns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
    content TEXT,
    status TEXT NOT NULL CHECK (status IN ('complete', 'pending', 'failed')),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_turns_status ON turns(status);
";

/// Identifier of a stored turn. Assigned by the store, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(pub i64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a turn.
///
/// `Pending` is the only non-final status; a pending turn moves to
/// `Complete` or `Failed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Complete,
    Pending,
    Failed,
}

impl TurnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnStatus::Complete => "complete",
            TurnStatus::Pending => "pending",
            TurnStatus::Failed => "failed",
        }
    }

    pub fn is_final(self) -> bool {
        !matches!(self, TurnStatus::Pending)
    }
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    /// Absent while an assistant turn is pending
    pub content: Option<String>,
    pub status: TurnStatus,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_pending(&self) -> bool {
        self.status == TurnStatus::Pending
    }
}

/// A turn that has not been stored yet; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewTurn {
    pub role: Role,
    pub content: Option<String>,
    pub status: TurnStatus,
}

impl NewTurn {
    /// User turns are complete at creation
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(text.into()),
            status: TurnStatus::Complete,
        }
    }

    /// Placeholder for an assistant reply that has not arrived yet
    pub fn pending_assistant() -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            status: TurnStatus::Pending,
        }
    }
}

pub(super) fn parse_role(s: &str) -> rusqlite::Result<Role> {
    match s {
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        other => Err(rusqlite::Error::InvalidColumnType(
            1,
            format!("role={other}"),
            rusqlite::types::Type::Text,
        )),
    }
}

pub(super) fn parse_status(s: &str) -> rusqlite::Result<TurnStatus> {
    match s {
        "complete" => Ok(TurnStatus::Complete),
        "pending" => Ok(TurnStatus::Pending),
        "failed" => Ok(TurnStatus::Failed),
        other => Err(rusqlite::Error::InvalidColumnType(
            3,
            format!("status={other}"),
            rusqlite::types::Type::Text,
        )),
    }
}
