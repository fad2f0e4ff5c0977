//! Owner directory.
//!
//! Owners are external accounts; the allocator only needs an existence
//! check at the start of each operation. Registration is provided for the
//! CLI and tests.

use rusqlite::{ErrorCode, Transaction, params};

use super::{StoreError, now_ns};
use crate::category::OwnerId;

/// A registered owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRecord {
    /// Owner identifier.
    pub owner_id: OwnerId,
    /// Display name, informational only.
    pub display_name: String,
    /// Registration timestamp, nanoseconds since the Unix epoch.
    pub created_at_ns: u64,
}

/// Registers an owner.
///
/// # Errors
///
/// Returns [`StoreError::OwnerAlreadyExists`] if the owner is already
/// registered.
pub fn insert(
    tx: &Transaction<'_>,
    owner_id: OwnerId,
    display_name: &str,
) -> Result<OwnerRecord, StoreError> {
    let created_at_ns = now_ns();
    let result = tx.execute(
        "INSERT INTO owners (owner_id, display_name, created_at_ns)
         VALUES (?1, ?2, ?3)",
        params![owner_id.to_string(), display_name, created_at_ns],
    );

    match result {
        Ok(_) => Ok(OwnerRecord {
            owner_id,
            display_name: display_name.to_string(),
            created_at_ns,
        }),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            Err(StoreError::OwnerAlreadyExists { owner_id })
        }
        Err(other) => Err(StoreError::Database(other)),
    }
}

/// Whether an owner is registered.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn exists(tx: &Transaction<'_>, owner_id: OwnerId) -> Result<bool, StoreError> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM owners WHERE owner_id = ?1",
        params![owner_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
