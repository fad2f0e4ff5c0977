//! Allocator error types.

use thiserror::Error;

use crate::category::{ArticleId, Category, OwnerId};
use crate::lock::LockError;
use crate::store::StoreError;

/// Errors from sequence allocator operations.
///
/// Every failure aborts the enclosing transaction; no partial counter or
/// article mutation survives, and nothing is retried automatically.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AllocatorError {
    /// The referenced owner is not registered. Not retryable.
    #[error("owner not found: {owner_id}")]
    OwnerNotFound {
        /// The unknown owner.
        owner_id: OwnerId,
    },

    /// The target article does not exist. Not retryable.
    #[error("article not found: {article_id}")]
    ArticleNotFound {
        /// The missing article.
        article_id: ArticleId,
    },

    /// The caller does not own the target article. Not retryable.
    #[error("article {article_id} is not owned by {owner_id}")]
    NotOwner {
        /// The target article.
        article_id: ArticleId,
        /// The caller.
        owner_id: OwnerId,
    },

    /// The article's placement kept changing between the unlocked read
    /// and the locked re-read. Retryable.
    #[error("article {article_id} was concurrently relocated; retry")]
    ConcurrentlyRelocated {
        /// The contended article.
        article_id: ArticleId,
    },

    /// Waiting for a counter key exceeded the configured bound.
    /// Retryable: the holder releases the key when its transaction ends.
    #[error("timed out after {waited_ms}ms waiting for counter {owner_id}/{category}")]
    LockTimeout {
        /// Owner of the contended counter.
        owner_id: OwnerId,
        /// Category of the contended counter.
        category: Category,
        /// How long the caller waited, in milliseconds.
        waited_ms: u64,
    },

    /// Persistence failure; see [`StoreError`] for the taxonomy.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LockError> for AllocatorError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { key, waited_ms } => Self::LockTimeout {
                owner_id: key.owner_id,
                category: key.category,
                waited_ms,
            },
        }
    }
}
