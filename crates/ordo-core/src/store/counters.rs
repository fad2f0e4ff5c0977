//! Counter row operations.
//!
//! Every function here must be called with the key's exclusive lock held
//! (see [`crate::lock`]); the store cannot verify that by itself, but the
//! version guard in [`set_size`] turns most violations into
//! [`StoreError::ConcurrentModification`] instead of silent corruption.

use rusqlite::{OptionalExtension, Transaction, params};

use super::StoreError;
use crate::category::CounterKey;

/// One counter row: the size and version stamp of an owner+category group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    /// The counter's scope.
    pub key: CounterKey,
    /// Number of live articles in the group; also the highest assigned seq.
    pub size: u64,
    /// Bumped on every successful update.
    pub version: u64,
}

/// Reads the counter for `key`, creating it with `size = 0` if absent.
///
/// Counters are created lazily and never deleted; a size-0 row left behind
/// by deletions is harmless and reused on the next create.
///
/// # Errors
///
/// Returns an error if the row cannot be read or inserted.
pub fn lock_or_init(tx: &Transaction<'_>, key: CounterKey) -> Result<Counter, StoreError> {
    let existing = tx
        .query_row(
            "SELECT size, version FROM category_counters
              WHERE owner_id = ?1 AND category = ?2",
            params![key.owner_id.to_string(), key.category.as_str()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, i64>(1)? as u64,
                ))
            },
        )
        .optional()?;

    if let Some((size, version)) = existing {
        return Ok(Counter { key, size, version });
    }

    tx.execute(
        "INSERT INTO category_counters (owner_id, category, size, version)
         VALUES (?1, ?2, 0, 0)",
        params![key.owner_id.to_string(), key.category.as_str()],
    )?;

    Ok(Counter {
        key,
        size: 0,
        version: 0,
    })
}

/// Updates a counter's size, guarded by the version read under the lock.
///
/// Returns the counter as written (size updated, version bumped).
///
/// # Errors
///
/// Returns [`StoreError::ConcurrentModification`] if the row's version no
/// longer matches `counter.version`, meaning the key lock discipline was
/// broken.
pub fn set_size(
    tx: &Transaction<'_>,
    counter: &Counter,
    new_size: u64,
) -> Result<Counter, StoreError> {
    let affected = tx.execute(
        "UPDATE category_counters
            SET size = ?1, version = version + 1
          WHERE owner_id = ?2 AND category = ?3 AND version = ?4",
        params![
            new_size,
            counter.key.owner_id.to_string(),
            counter.key.category.as_str(),
            counter.version,
        ],
    )?;

    if affected == 0 {
        return Err(StoreError::ConcurrentModification {
            owner_id: counter.key.owner_id,
            category: counter.key.category,
        });
    }

    Ok(Counter {
        key: counter.key,
        size: new_size,
        version: counter.version + 1,
    })
}

/// Decrements a counter's size by one.
///
/// # Errors
///
/// Returns [`StoreError::CounterUnderflow`] if the counter is already 0,
/// which means the counter and its article rows diverged outside the
/// allocator.
pub fn decrement(tx: &Transaction<'_>, counter: &Counter) -> Result<Counter, StoreError> {
    let new_size = counter
        .size
        .checked_sub(1)
        .ok_or(StoreError::CounterUnderflow {
            owner_id: counter.key.owner_id,
            category: counter.key.category,
        })?;
    set_size(tx, counter, new_size)
}

/// All counter sizes recorded for an owner, keyed by category.
///
/// Categories without a counter row are absent; callers wanting the full
/// closed set zero-fill from [`crate::category::Category::ALL`].
///
/// # Errors
///
/// Returns an error if the query fails or a row carries an unknown
/// category.
pub fn sizes_for_owner(
    tx: &Transaction<'_>,
    owner_id: crate::category::OwnerId,
) -> Result<Vec<(crate::category::Category, u64)>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT category, size FROM category_counters
          WHERE owner_id = ?1",
    )?;

    let rows = stmt
        .query_map(params![owner_id.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(raw, size)| Ok((super::parse_category(raw)?, size)))
        .collect()
}
