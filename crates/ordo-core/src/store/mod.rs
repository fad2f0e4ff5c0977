//! SQLite-backed persistence for owners, articles, and category counters.
//!
//! The store owns a single connection behind a mutex (WAL mode, schema
//! embedded at compile time) and exposes row-level operations grouped by
//! table: [`counters`], [`articles`], [`owners`]. All mutation goes
//! through [`SqliteStore::with_transaction`], which commits on success and
//! rolls back on any error, so no operation can leave a partial counter or
//! article mutation behind.
//!
//! Counter operations additionally require the caller to hold the key's
//! exclusive lock from [`crate::lock`]; the `version` column backs a
//! defensive assertion that the discipline was respected, not an
//! optimistic-retry scheme.

// SQLite returns i64 for integer columns; seq and size are always
// non-negative. Mutex poisoning indicates a panic in another thread,
// which is unrecoverable.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::missing_panics_doc
)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use thiserror::Error;

pub mod articles;
pub mod counters;
pub mod owners;

#[cfg(test)]
mod tests;

pub use articles::{ArticleDraft, ArticleRecord};
pub use counters::Counter;
pub use owners::OwnerRecord;

use crate::category::{Category, OwnerId};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Default SQLite busy timeout.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Errors from the persistence layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A counter update observed a version other than the one read under
    /// the key lock. The lock discipline was violated somewhere; this is
    /// a bug signal, never a retry condition.
    #[error("concurrent modification of counter {owner_id}/{category}")]
    ConcurrentModification {
        /// Owner of the counter.
        owner_id: OwnerId,
        /// Category of the counter.
        category: Category,
    },

    /// A decrement would take a counter below zero; the counter and its
    /// article rows have diverged outside the allocator.
    #[error("counter underflow for {owner_id}/{category}")]
    CounterUnderflow {
        /// Owner of the counter.
        owner_id: OwnerId,
        /// Category of the counter.
        category: Category,
    },

    /// A stored category string is outside the closed category set.
    #[error("unknown category in database: {value}")]
    UnknownCategory {
        /// The offending column value.
        value: String,
    },

    /// A stored identifier column is not a valid UUID.
    #[error("malformed identifier in database: {value}")]
    InvalidId {
        /// The offending column value.
        value: String,
    },

    /// Attempted to register an owner that already exists.
    #[error("owner already registered: {owner_id}")]
    OwnerAlreadyExists {
        /// The duplicate owner.
        owner_id: OwnerId,
    },
}

/// The SQLite store behind the allocator.
///
/// Cloning is cheap and shares the underlying connection; the connection
/// mutex serializes statement execution while the key lock table in
/// [`crate::lock`] serializes whole operations per counter key.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens or creates a store at the specified path.
    ///
    /// The schema is applied idempotently and WAL mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Path of the backing database file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Overrides the SQLite busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be applied.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.busy_timeout(timeout)?;
        Ok(())
    }

    fn initialize_connection(conn: &Connection) -> Result<(), StoreError> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Runs `f` inside one immediate transaction.
    ///
    /// Commits if `f` returns `Ok`; any error rolls the transaction back,
    /// so partial application of a multi-step operation is impossible.
    ///
    /// # Errors
    ///
    /// Propagates errors from `f`, and from beginning or committing the
    /// transaction (converted through `E`).
    pub fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| E::from(StoreError::Database(e)))?;
        let out = f(&tx)?;
        tx.commit().map_err(|e| E::from(StoreError::Database(e)))?;
        Ok(out)
    }
}

/// Nanoseconds since the Unix epoch.
///
/// Timestamps won't overflow u64 until the year 2554.
pub(crate) fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Parses a TEXT identifier column into a UUID.
pub(crate) fn parse_id(value: String) -> Result<uuid::Uuid, StoreError> {
    uuid::Uuid::parse_str(&value).map_err(|_| StoreError::InvalidId { value })
}

/// Parses a TEXT category column into the closed category set.
pub(crate) fn parse_category(value: String) -> Result<Category, StoreError> {
    value
        .parse::<Category>()
        .map_err(|_| StoreError::UnknownCategory { value })
}
