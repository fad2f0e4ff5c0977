//! # ordo-core
//!
//! Dense per-owner, per-category sequence allocation for journal
//! articles.
//!
//! Every article in the journaling backend carries a 1-based rank (`seq`)
//! within its owner+category group. This crate keeps that rank **dense**
//! (no gaps, no duplicates) across concurrent creation, cross-category
//! moves, and deletion, by serializing counter mutations behind per-key
//! exclusive locks and running every operation inside one SQLite
//! transaction.
//!
//! # Architecture
//!
//! ```text
//! SequenceAllocator (allocator)
//!   |-- KeyLockTable (lock)       per-key exclusive locks,
//!   |                             canonical two-key ordering
//!   |-- SqliteStore (store)       owners / articles / category_counters
//!   |     |-- counters            lock_or_init, version-guarded set_size
//!   |     |-- articles            insert, shift_left, placement
//!   |     `-- owners              existence check, registration
//!   `-- Category (category)       closed set, explicit lock rank
//! ```
//!
//! # Invariant
//!
//! For every (owner, category) with N live articles, the multiset of
//! their seq values is exactly `{1, ..., N}` at every quiescent point, and
//! the group's counter records N. The invariant is broken and restored
//! only inside a single transaction.

pub mod allocator;
pub mod category;
pub mod config;
pub mod lock;
pub mod store;

pub use allocator::{AllocatorError, DensityReport, SequenceAllocator};
pub use category::{ArticleId, Category, CounterKey, OwnerId, UnknownCategory};
pub use config::{ConfigError, OrdoConfig};
pub use lock::{KeyGuard, KeyLockTable, LockError};
pub use store::{ArticleDraft, ArticleRecord, Counter, OwnerRecord, SqliteStore, StoreError};
