//! Database module for lmchat
//!
//! The message store: an append-only log of conversation turns. Turns are
//! only ever mutated through `update_status`, which accepts pending turns
//! exclusively, so every turn is finalized at most once.

mod schema;

pub use schema::*;
use schema::{parse_role, parse_status};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Turn not found: {0}")]
    TurnNotFound(TurnId),
    #[error("Invalid transition for turn {id}: {from} -> {to}")]
    InvalidTransition {
        id: TurnId,
        from: TurnStatus,
        to: TurnStatus,
    },
}

impl DbError {
    /// Integrity violations cannot happen under correct single-flight use
    pub fn is_integrity(&self) -> bool {
        matches!(self, DbError::TurnNotFound(_) | DbError::InvalidTransition { .. })
    }
}

pub type DbResult<T> = Result<T, DbError>;

const TURN_COLUMNS: &str = "id, role, content, status, created_at";

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.lock();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Writes ====================

    /// Append a turn, assigning its id and timestamp
    #[allow(dead_code)] // Exchanges go through append_exchange
    pub fn append(&self, turn: &NewTurn) -> DbResult<TurnId> {
        let conn = self.lock();
        insert_turn(&conn, turn, Utc::now())
    }

    /// Append a user turn and its pending assistant placeholder in one
    /// transaction. Either both land or neither does.
    pub fn append_exchange(&self, user_text: &str) -> DbResult<(TurnId, TurnId)> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let now = Utc::now();

        let user_id = insert_turn(&tx, &NewTurn::user(user_text), now)?;
        let pending_id = insert_turn(&tx, &NewTurn::pending_assistant(), now)?;

        tx.commit()?;
        Ok((user_id, pending_id))
    }

    /// Finalize a pending turn.
    ///
    /// Fails with `TurnNotFound` for an unknown id and `InvalidTransition`
    /// when the turn is not pending or the target status is `Pending`.
    pub fn update_status(
        &self,
        id: TurnId,
        status: TurnStatus,
        content: Option<&str>,
    ) -> DbResult<()> {
        let conn = self.lock();

        if !status.is_final() {
            let from = current_status(&conn, id)?;
            return Err(DbError::InvalidTransition { id, from, to: status });
        }

        let updated = conn.execute(
            "UPDATE turns SET status = ?1, content = ?2 WHERE id = ?3 AND status = 'pending'",
            params![status.as_str(), content, id.0],
        )?;

        if updated == 0 {
            // Either missing or already final
            let from = current_status(&conn, id)?;
            return Err(DbError::InvalidTransition { id, from, to: status });
        }
        Ok(())
    }

    /// Mark every turn still pending as failed. Returns how many were touched.
    ///
    /// Used at startup: a pending turn left over from a previous process can
    /// never be completed, and leaving it pending would block the single-flight
    /// state forever.
    pub fn fail_interrupted(&self, notice: &str) -> DbResult<usize> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE turns SET status = 'failed', content = ?1 WHERE status = 'pending'",
            params![notice],
        )?;
        Ok(updated)
    }

    /// Delete all turns. Only used by the clear-on-start option.
    pub fn clear(&self) -> DbResult<usize> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM turns", [])?;
        Ok(deleted)
    }

    // ==================== Reads ====================

    /// Get a turn by id
    #[allow(dead_code)] // Used in tests
    pub fn get_turn(&self, id: TurnId) -> DbResult<Turn> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {TURN_COLUMNS} FROM turns WHERE id = ?1"),
            params![id.0],
            parse_turn_row,
        )
        .optional()?
        .ok_or(DbError::TurnNotFound(id))
    }

    /// The newest pending turn, if any
    pub fn pending_turn(&self) -> DbResult<Option<Turn>> {
        let conn = self.lock();
        let turn = conn
            .query_row(
                &format!(
                    "SELECT {TURN_COLUMNS} FROM turns WHERE status = 'pending' ORDER BY id DESC LIMIT 1"
                ),
                [],
                parse_turn_row,
            )
            .optional()?;
        Ok(turn)
    }

    /// Turns in canonical order (ascending id). With a limit, only the most
    /// recent `limit` turns are returned, still oldest first.
    pub fn list_ordered(&self, limit: Option<usize>) -> DbResult<Vec<Turn>> {
        let conn = self.lock();

        let Some(limit) = limit else {
            let mut stmt =
                conn.prepare(&format!("SELECT {TURN_COLUMNS} FROM turns ORDER BY id ASC"))?;
            let rows = stmt.query_map([], parse_turn_row)?;
            return rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from);
        };

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&format!(
            "SELECT {TURN_COLUMNS} FROM (
                 SELECT {TURN_COLUMNS} FROM turns ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![limit], parse_turn_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn insert_turn(conn: &Connection, turn: &NewTurn, now: DateTime<Utc>) -> DbResult<TurnId> {
    conn.execute(
        "INSERT INTO turns (role, content, status, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            turn.role.as_str(),
            turn.content,
            turn.status.as_str(),
            now.to_rfc3339(),
        ],
    )?;
    Ok(TurnId(conn.last_insert_rowid()))
}

fn current_status(conn: &Connection, id: TurnId) -> DbResult<TurnStatus> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM turns WHERE id = ?1",
            params![id.0],
            |row| row.get(0),
        )
        .optional()?;
    let status = status.ok_or(DbError::TurnNotFound(id))?;
    Ok(parse_status(&status)?)
}

/// Parse a turn row from the database
fn parse_turn_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Turn> {
    Ok(Turn {
        id: TurnId(row.get(0)?),
        role: parse_role(&row.get::<_, String>(1)?)?,
        content: row.get(2)?,
        status: parse_status(&row.get::<_, String>(3)?)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
