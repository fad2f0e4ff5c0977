//! Article row operations: the seq-relevant subset of the article record.
//!
//! Content fields stop at title and body; feeds, search, books, and the
//! rest of the article surface live outside this subsystem.

use rusqlite::{OptionalExtension, Row, Transaction, params};

use super::{StoreError, now_ns};
use crate::category::{ArticleId, Category, OwnerId};

/// Caller-supplied fields for a new article or a content update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    /// Target category.
    pub category: Category,
    /// Article title.
    pub title: String,
    /// Article body.
    pub body: String,
}

/// A stored article row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    /// Article identifier.
    pub article_id: ArticleId,
    /// Owning account.
    pub owner_id: OwnerId,
    /// Category the article is filed under.
    pub category: Category,
    /// 1-based rank within the owner+category group.
    pub seq: u64,
    /// Article title.
    pub title: String,
    /// Article body.
    pub body: String,
    /// Creation timestamp, nanoseconds since the Unix epoch.
    pub created_at_ns: u64,
    /// Last-update timestamp, nanoseconds since the Unix epoch.
    pub updated_at_ns: u64,
}

/// Column values as SQLite hands them over, before identifier and
/// category validation.
struct RawArticleRow {
    article_id: String,
    owner_id: String,
    category: String,
    seq: u64,
    title: String,
    body: String,
    created_at_ns: u64,
    updated_at_ns: u64,
}

impl RawArticleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            article_id: row.get(0)?,
            owner_id: row.get(1)?,
            category: row.get(2)?,
            seq: row.get::<_, i64>(3)? as u64,
            title: row.get(4)?,
            body: row.get(5)?,
            created_at_ns: row.get::<_, i64>(6)? as u64,
            updated_at_ns: row.get::<_, i64>(7)? as u64,
        })
    }

    fn validate(self) -> Result<ArticleRecord, StoreError> {
        Ok(ArticleRecord {
            article_id: super::parse_id(self.article_id)?,
            owner_id: super::parse_id(self.owner_id)?,
            category: super::parse_category(self.category)?,
            seq: self.seq,
            title: self.title,
            body: self.body,
            created_at_ns: self.created_at_ns,
            updated_at_ns: self.updated_at_ns,
        })
    }
}

const SELECT_COLUMNS: &str =
    "article_id, owner_id, category, seq, title, body, created_at_ns, updated_at_ns";

/// Inserts a new article row.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert(tx: &Transaction<'_>, record: &ArticleRecord) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO articles
            (article_id, owner_id, category, seq, title, body, created_at_ns, updated_at_ns)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.article_id.to_string(),
            record.owner_id.to_string(),
            record.category.as_str(),
            record.seq,
            record.title,
            record.body,
            record.created_at_ns,
            record.updated_at_ns,
        ],
    )?;
    Ok(())
}

/// Looks up an article by identity.
///
/// # Errors
///
/// Returns an error if the query fails; a missing row is `Ok(None)`.
pub fn find(
    tx: &Transaction<'_>,
    article_id: ArticleId,
) -> Result<Option<ArticleRecord>, StoreError> {
    let found = tx
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM articles WHERE article_id = ?1"),
            params![article_id.to_string()],
            RawArticleRow::from_row,
        )
        .optional()?;

    found.map(RawArticleRow::validate).transpose()
}

/// Deletes an article row.
///
/// Returns `true` if a row was removed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete(tx: &Transaction<'_>, article_id: ArticleId) -> Result<bool, StoreError> {
    let affected = tx.execute(
        "DELETE FROM articles WHERE article_id = ?1",
        params![article_id.to_string()],
    )?;
    Ok(affected > 0)
}

/// Updates content fields only; placement (category, seq) is untouched.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_content(
    tx: &Transaction<'_>,
    article_id: ArticleId,
    title: &str,
    body: &str,
) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE articles SET title = ?1, body = ?2, updated_at_ns = ?3
          WHERE article_id = ?4",
        params![title, body, now_ns(), article_id.to_string()],
    )?;
    Ok(())
}

/// Rewrites an article's placement after a cross-category move.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_placement(
    tx: &Transaction<'_>,
    article_id: ArticleId,
    category: Category,
    seq: u64,
) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE articles SET category = ?1, seq = ?2, updated_at_ns = ?3
          WHERE article_id = ?4",
        params![category.as_str(), seq, now_ns(), article_id.to_string()],
    )?;
    Ok(())
}

/// Densifying bulk decrement: every article in the group with
/// `seq > after_seq` moves down one position. Returns the number of rows
/// shifted.
///
/// Must run in the same transaction as the counter update, under the
/// group's key lock.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn shift_left(
    tx: &Transaction<'_>,
    owner_id: OwnerId,
    category: Category,
    after_seq: u64,
) -> Result<u64, StoreError> {
    let affected = tx.execute(
        "UPDATE articles SET seq = seq - 1
          WHERE owner_id = ?1 AND category = ?2 AND seq > ?3",
        params![owner_id.to_string(), category.as_str(), after_seq],
    )?;
    Ok(affected as u64)
}

/// All articles of a group, ordered by seq.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn in_group(
    tx: &Transaction<'_>,
    owner_id: OwnerId,
    category: Category,
) -> Result<Vec<ArticleRecord>, StoreError> {
    let mut stmt = tx.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM articles
          WHERE owner_id = ?1 AND category = ?2
          ORDER BY seq ASC"
    ))?;

    let rows = stmt
        .query_map(
            params![owner_id.to_string(), category.as_str()],
            RawArticleRow::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(RawArticleRow::validate).collect()
}

/// The seq values of a group, ordered ascending. Used by density audits.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn seqs_in_group(
    tx: &Transaction<'_>,
    owner_id: OwnerId,
    category: Category,
) -> Result<Vec<u64>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT seq FROM articles
          WHERE owner_id = ?1 AND category = ?2
          ORDER BY seq ASC",
    )?;

    let seqs = stmt
        .query_map(params![owner_id.to_string(), category.as_str()], |row| {
            Ok(row.get::<_, i64>(0)? as u64)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(seqs)
}
