//! The sequence allocator.
//!
//! Assigns every article a contiguous 1-based rank (`seq`) within its
//! owner+category group and keeps that rank dense across concurrent
//! creation, cross-category moves, and deletion.
//!
//! # Operation shape
//!
//! Every mutating operation follows the same protocol:
//!
//! ```text
//! acquire counter key lock(s)   (canonical order, bounded wait)
//!   -> one SQLite transaction
//!        owner / ownership checks
//!        counter read (lock_or_init)
//!        article mutation + densifying shift-left
//!        counter write (version-guarded)
//!   -> commit
//! release key lock(s)
//! ```
//!
//! The lock scope strictly covers the transaction, so a concurrent create
//! can never compute a seq from a counter value that a delete or move is
//! about to invalidate.
//!
//! # Per-article state machine
//!
//! ```text
//! Unassigned --create--> Assigned(category, seq)
//! Assigned(c1, s1) --move--> Assigned(c2, s2)
//! Assigned(c, s) --delete--> Removed        (terminal)
//! ```
//!
//! # Example
//!
//! ```rust
//! use ordo_core::allocator::SequenceAllocator;
//! use ordo_core::category::Category;
//! use ordo_core::config::OrdoConfig;
//! use ordo_core::store::{ArticleDraft, SqliteStore};
//!
//! # fn example() -> Result<(), ordo_core::allocator::AllocatorError> {
//! let store = SqliteStore::in_memory()?;
//! let allocator = SequenceAllocator::new(store, &OrdoConfig::default());
//!
//! let owner_id = allocator.register_owner(None, "dana")?.owner_id;
//! let article = allocator.create(
//!     owner_id,
//!     ArticleDraft {
//!         category: Category::Running,
//!         title: "morning 5k".to_string(),
//!         body: "easy pace".to_string(),
//!     },
//! )?;
//! assert_eq!(article.seq, 1);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use rusqlite::Transaction;
use tracing::{debug, info, warn};
use uuid::Uuid;

mod audit;
mod error;


pub use audit::DensityReport;
pub use error::AllocatorError;

use crate::category::{ArticleId, Category, CounterKey, OwnerId};
use crate::config::OrdoConfig;
use crate::lock::KeyLockTable;
use crate::store::{ArticleDraft, ArticleRecord, OwnerRecord, SqliteStore, articles, counters, owners};

/// How many times a relocation retries after losing the race between its
/// unlocked placement read and the locked re-read. Each retry requires
/// another committed move of the same article in the window, so this
/// bound is only reached under pathological contention.
const MAX_PLACEMENT_RETRIES: usize = 3;

/// Orchestrates create / update / move / delete against the counter store
/// and article rows. See the module docs for the locking protocol.
#[derive(Debug)]
pub struct SequenceAllocator {
    store: SqliteStore,
    locks: KeyLockTable,
}

impl SequenceAllocator {
    /// Creates an allocator over `store`, with the lock wait bound taken
    /// from `config`.
    #[must_use]
    pub fn new(store: SqliteStore, config: &OrdoConfig) -> Self {
        Self {
            locks: KeyLockTable::new(config.lock_wait()),
            store,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Registers an owner, generating an id if none is supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner already exists or the insert fails.
    pub fn register_owner(
        &self,
        owner_id: Option<OwnerId>,
        display_name: &str,
    ) -> Result<OwnerRecord, AllocatorError> {
        let owner_id = owner_id.unwrap_or_else(Uuid::new_v4);
        let record = self
            .store
            .with_transaction(|tx| owners::insert(tx, owner_id, display_name))?;
        debug!(owner = %owner_id, "owner registered");
        Ok(record)
    }

    /// Creates an article at the end of its owner+category group.
    ///
    /// The assigned seq is `size + 1` under the group's exclusive lock, so
    /// concurrent creates for one key always yield a strictly increasing,
    /// gap-free run.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::OwnerNotFound`] for unregistered owners,
    /// [`AllocatorError::LockTimeout`] on contention past the bound, or a
    /// store error.
    pub fn create(
        &self,
        owner_id: OwnerId,
        draft: ArticleDraft,
    ) -> Result<ArticleRecord, AllocatorError> {
        let key = CounterKey::new(owner_id, draft.category);
        let _guard = self.locks.acquire(key)?;

        let record = self.store.with_transaction(|tx| {
            if !owners::exists(tx, owner_id)? {
                return Err(AllocatorError::OwnerNotFound { owner_id });
            }

            let counter = counters::lock_or_init(tx, key)?;
            let new_seq = counter.size + 1;

            let now = crate::store::now_ns();
            let record = ArticleRecord {
                article_id: Uuid::new_v4(),
                owner_id,
                category: draft.category,
                seq: new_seq,
                title: draft.title,
                body: draft.body,
                created_at_ns: now,
                updated_at_ns: now,
            };
            articles::insert(tx, &record)?;
            counters::set_size(tx, &counter, new_seq)?;
            Ok(record)
        })?;

        debug!(
            owner = %owner_id,
            category = %record.category,
            seq = record.seq,
            article = %record.article_id,
            "article created"
        );
        Ok(record)
    }

    /// Updates an article.
    ///
    /// If the draft keeps the current category this is a content-only
    /// update: no counter is read and no key lock is taken. A changed
    /// category goes through the move path, with the content changes
    /// applied in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::ArticleNotFound`],
    /// [`AllocatorError::NotOwner`], [`AllocatorError::LockTimeout`],
    /// [`AllocatorError::ConcurrentlyRelocated`], or a store error.
    pub fn update(
        &self,
        owner_id: OwnerId,
        article_id: ArticleId,
        draft: ArticleDraft,
    ) -> Result<ArticleRecord, AllocatorError> {
        for _ in 0..MAX_PLACEMENT_RETRIES {
            let current = self
                .store
                .with_transaction(|tx| load_owned(tx, owner_id, article_id))?;

            if current.category == draft.category {
                // Cheapest path: content fields only, no counter
                // interaction.
                let applied = self.store.with_transaction(
                    |tx| -> Result<Option<ArticleRecord>, AllocatorError> {
                    let article = load_owned(tx, owner_id, article_id)?;
                    if article.category != draft.category {
                        return Ok(None);
                    }
                    articles::update_content(tx, article_id, &draft.title, &draft.body)?;
                    Ok(Some(ArticleRecord {
                        title: draft.title.clone(),
                        body: draft.body.clone(),
                        updated_at_ns: crate::store::now_ns(),
                        ..article
                    }))
                })?;
                if let Some(record) = applied {
                    debug!(owner = %owner_id, article = %article_id, "article content updated");
                    return Ok(record);
                }
            } else if let Some(record) = self.try_relocate(
                owner_id,
                article_id,
                current.category,
                draft.category,
                Some(&draft),
            )? {
                return Ok(record);
            }
        }
        Err(AllocatorError::ConcurrentlyRelocated { article_id })
    }

    /// Moves an article to another category.
    ///
    /// The source group densifies past the vacated seq and the article is
    /// appended to the destination group at `dst.size + 1`. Moving to the
    /// article's current category is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::ArticleNotFound`],
    /// [`AllocatorError::NotOwner`], [`AllocatorError::LockTimeout`],
    /// [`AllocatorError::ConcurrentlyRelocated`], or a store error.
    pub fn move_article(
        &self,
        owner_id: OwnerId,
        article_id: ArticleId,
        new_category: Category,
    ) -> Result<ArticleRecord, AllocatorError> {
        for _ in 0..MAX_PLACEMENT_RETRIES {
            let current = self
                .store
                .with_transaction(|tx| load_owned(tx, owner_id, article_id))?;

            if current.category == new_category {
                return Ok(current);
            }

            if let Some(record) =
                self.try_relocate(owner_id, article_id, current.category, new_category, None)?
            {
                return Ok(record);
            }
        }
        Err(AllocatorError::ConcurrentlyRelocated { article_id })
    }

    /// Deletes an article and densifies its group.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::ArticleNotFound`],
    /// [`AllocatorError::NotOwner`], [`AllocatorError::LockTimeout`],
    /// [`AllocatorError::ConcurrentlyRelocated`], or a store error.
    pub fn delete(&self, owner_id: OwnerId, article_id: ArticleId) -> Result<(), AllocatorError> {
        for _ in 0..MAX_PLACEMENT_RETRIES {
            let current = self
                .store
                .with_transaction(|tx| load_owned(tx, owner_id, article_id))?;

            let key = CounterKey::new(owner_id, current.category);
            let _guard = self.locks.acquire(key)?;

            let deleted = self
                .store
                .with_transaction(|tx| -> Result<Option<u64>, AllocatorError> {
                let article = load_owned(tx, owner_id, article_id)?;
                if article.category != current.category {
                    // Moved between the unlocked read and taking the
                    // lock; the key we hold is the wrong one.
                    return Ok(None);
                }

                let counter = counters::lock_or_init(tx, key)?;
                articles::shift_left(tx, owner_id, article.category, article.seq)?;
                counters::decrement(tx, &counter)?;
                articles::delete(tx, article_id)?;
                Ok(Some(article.seq))
            })?;

            if let Some(seq) = deleted {
                info!(
                    owner = %owner_id,
                    category = %current.category,
                    seq,
                    article = %article_id,
                    "article deleted"
                );
                return Ok(());
            }
        }
        Err(AllocatorError::ConcurrentlyRelocated { article_id })
    }

    /// One relocation attempt under both group locks.
    ///
    /// Returns `Ok(None)` if the article's category no longer matches
    /// `old_category` once re-read under the locks: the caller predicted
    /// placement from an unlocked read and lost the race.
    fn try_relocate(
        &self,
        owner_id: OwnerId,
        article_id: ArticleId,
        old_category: Category,
        new_category: Category,
        content: Option<&ArticleDraft>,
    ) -> Result<Option<ArticleRecord>, AllocatorError> {
        let src_key = CounterKey::new(owner_id, old_category);
        let dst_key = CounterKey::new(owner_id, new_category);
        let _guards = self.locks.acquire_pair(src_key, dst_key)?;

        let moved = self.store.with_transaction(
            |tx| -> Result<Option<ArticleRecord>, AllocatorError> {
            let article = load_owned(tx, owner_id, article_id)?;
            if article.category != old_category {
                return Ok(None);
            }

            // Densify the source group past the vacated position.
            let src = counters::lock_or_init(tx, src_key)?;
            articles::shift_left(tx, owner_id, old_category, article.seq)?;
            counters::decrement(tx, &src)?;

            // Append to the destination group.
            let dst = counters::lock_or_init(tx, dst_key)?;
            let new_seq = dst.size + 1;
            counters::set_size(tx, &dst, new_seq)?;
            articles::set_placement(tx, article_id, new_category, new_seq)?;

            if let Some(draft) = content {
                articles::update_content(tx, article_id, &draft.title, &draft.body)?;
            }

            let record = articles::find(tx, article_id)?
                .ok_or(AllocatorError::ArticleNotFound { article_id })?;
            Ok(Some(record))
        })?;

        if let Some(record) = &moved {
            info!(
                owner = %owner_id,
                article = %article_id,
                from = %old_category,
                to = %new_category,
                seq = record.seq,
                "article moved"
            );
        }
        Ok(moved)
    }

    /// Counter sizes for every category of an owner, zero-filled so all
    /// categories of the closed set appear.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::OwnerNotFound`] or a store error.
    pub fn category_sizes(
        &self,
        owner_id: OwnerId,
    ) -> Result<BTreeMap<Category, u64>, AllocatorError> {
        self.store.with_transaction(|tx| {
            if !owners::exists(tx, owner_id)? {
                return Err(AllocatorError::OwnerNotFound { owner_id });
            }

            let mut sizes: BTreeMap<Category, u64> =
                Category::ALL.into_iter().map(|c| (c, 0)).collect();
            for (category, size) in counters::sizes_for_owner(tx, owner_id)? {
                sizes.insert(category, size);
            }
            Ok(sizes)
        })
    }

    /// The articles of one group, ordered by seq.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::OwnerNotFound`] or a store error.
    pub fn list_group(
        &self,
        owner_id: OwnerId,
        category: Category,
    ) -> Result<Vec<ArticleRecord>, AllocatorError> {
        self.store.with_transaction(|tx| {
            if !owners::exists(tx, owner_id)? {
                return Err(AllocatorError::OwnerNotFound { owner_id });
            }
            Ok(articles::in_group(tx, owner_id, category)?)
        })
    }

    /// Audits one group against the density invariant.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::OwnerNotFound`] or a store error.
    pub fn audit_group(
        &self,
        owner_id: OwnerId,
        category: Category,
    ) -> Result<DensityReport, AllocatorError> {
        self.store.with_transaction(|tx| {
            if !owners::exists(tx, owner_id)? {
                return Err(AllocatorError::OwnerNotFound { owner_id });
            }
            audit_group_tx(tx, owner_id, category)
        })
    }

    /// Audits every non-empty group of an owner, plus any group that
    /// fails the invariant.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::OwnerNotFound`] or a store error.
    pub fn audit_owner(&self, owner_id: OwnerId) -> Result<Vec<DensityReport>, AllocatorError> {
        let reports = self.store.with_transaction(|tx| {
            if !owners::exists(tx, owner_id)? {
                return Err(AllocatorError::OwnerNotFound { owner_id });
            }

            let mut reports = Vec::new();
            for category in Category::ALL {
                let report = audit_group_tx(tx, owner_id, category)?;
                if !report.is_empty() || !report.is_dense() {
                    reports.push(report);
                }
            }
            Ok(reports)
        })?;

        for report in reports.iter().filter(|r| !r.is_dense()) {
            warn!(
                owner = %owner_id,
                category = %report.category,
                counter_size = report.counter_size,
                article_count = report.article_count,
                "density invariant violated"
            );
        }
        Ok(reports)
    }
}

/// Loads an article and verifies the caller owns it.
fn load_owned(
    tx: &Transaction<'_>,
    owner_id: OwnerId,
    article_id: ArticleId,
) -> Result<ArticleRecord, AllocatorError> {
    let article =
        articles::find(tx, article_id)?.ok_or(AllocatorError::ArticleNotFound { article_id })?;
    if article.owner_id != owner_id {
        return Err(AllocatorError::NotOwner {
            article_id,
            owner_id,
        });
    }
    Ok(article)
}

fn audit_group_tx(
    tx: &Transaction<'_>,
    owner_id: OwnerId,
    category: Category,
) -> Result<DensityReport, AllocatorError> {
    let counter_size = counters::sizes_for_owner(tx, owner_id)?
        .into_iter()
        .find(|(c, _)| *c == category)
        .map_or(0, |(_, size)| size);
    let seqs = articles::seqs_in_group(tx, owner_id, category)?;
    Ok(DensityReport::from_seqs(owner_id, category, counter_size, &seqs))
}
