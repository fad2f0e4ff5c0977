//! Per-key exclusive lock table.
//!
//! Counter mutations are serialized per [`CounterKey`]: exactly one
//! operation may hold a key at a time, and it holds the key for the full
//! duration of its transaction. This module provides the in-process lock
//! registry that enforces that discipline.
//!
//! # Deadlock avoidance
//!
//! [`KeyLockTable::acquire_pair`] is the only sanctioned way to hold two
//! keys at once. It always acquires the lower-ranked key first (see
//! [`CounterKey`]'s `Ord`), regardless of the order its arguments arrive
//! in, so two operations contending for the same pair can never lock them
//! in opposite orders.
//!
//! # Bounded waiting
//!
//! Every acquisition waits at most the bound given at construction and
//! then fails with [`LockError::Timeout`], which callers may retry. A
//! stalled holder therefore delays contenders, but cannot wedge them
//! forever.

// Mutex poisoning indicates a panic in another thread, which is unrecoverable.
#![allow(clippy::missing_panics_doc)]

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::category::CounterKey;


/// Errors from key lock acquisition.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LockError {
    /// The wait bound elapsed before the key became free.
    ///
    /// Retryable: the holder's transaction will release the key when it
    /// ends.
    #[error("timed out after {waited_ms}ms waiting for counter lock {key}")]
    Timeout {
        /// The contended key.
        key: CounterKey,
        /// How long the caller waited, in milliseconds.
        waited_ms: u64,
    },
}

/// Registry of per-key exclusive locks with bounded wait.
#[derive(Debug)]
pub struct KeyLockTable {
    held: Mutex<HashSet<CounterKey>>,
    released: Condvar,
    wait_bound: Duration,
}

impl KeyLockTable {
    /// Creates a lock table whose acquisitions wait at most `wait_bound`.
    #[must_use]
    pub fn new(wait_bound: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            wait_bound,
        }
    }

    /// Acquires the exclusive lock for `key`, blocking until it is free.
    ///
    /// The returned guard releases the key on drop.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] if the wait bound elapses first.
    pub fn acquire(&self, key: CounterKey) -> Result<KeyGuard<'_>, LockError> {
        let start = Instant::now();
        let deadline = start + self.wait_bound;

        let mut held = self.held.lock().unwrap();
        while held.contains(&key) {
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Timeout {
                    key,
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }
            let (guard, result) = self
                .released
                .wait_timeout(held, deadline - now)
                .unwrap();
            held = guard;
            if result.timed_out() && held.contains(&key) {
                return Err(LockError::Timeout {
                    key,
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }
        }
        held.insert(key);
        Ok(KeyGuard { table: self, key })
    }

    /// Acquires two distinct keys in canonical order.
    ///
    /// The lower-ranked key is always taken first, whatever order the
    /// arguments arrive in. On timeout of the second key the first is
    /// released before the error propagates.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] if either acquisition times out.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`; single-key operations must use [`Self::acquire`].
    pub fn acquire_pair(
        &self,
        a: CounterKey,
        b: CounterKey,
    ) -> Result<(KeyGuard<'_>, KeyGuard<'_>), LockError> {
        assert_ne!(a, b, "acquire_pair requires two distinct keys");
        let (first, second) = if a < b { (a, b) } else { (b, a) };

        let first_guard = self.acquire(first)?;
        let second_guard = self.acquire(second)?;
        Ok((first_guard, second_guard))
    }

    fn release(&self, key: &CounterKey) {
        let mut held = self.held.lock().unwrap();
        held.remove(key);
        self.released.notify_all();
    }
}

/// Exclusive hold on one counter key; releases on drop.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    table: &'a KeyLockTable,
    key: CounterKey,
}

impl KeyGuard<'_> {
    /// The key this guard holds.
    #[must_use]
    pub const fn key(&self) -> CounterKey {
        self.key
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.key);
    }
}
