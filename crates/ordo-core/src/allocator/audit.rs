//! Density audits.
//!
//! An audit reads one owner+category group at a quiescent point and
//! checks the density invariant: the live seq values must be exactly
//! `{1, ..., size}` and the counter must agree with the row count. Audits
//! never mutate anything.

use crate::category::{Category, OwnerId};

/// Result of auditing one owner+category group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DensityReport {
    /// Owner of the audited group.
    pub owner_id: OwnerId,
    /// Category of the audited group.
    pub category: Category,
    /// Size recorded in the counter row (0 if no row exists).
    pub counter_size: u64,
    /// Number of live article rows in the group.
    pub article_count: u64,
    /// Expected seq values with no article: gaps in `1..=counter_size`.
    pub missing: Vec<u64>,
    /// Seq values held by more than one article.
    pub duplicates: Vec<u64>,
    /// Seq values outside `1..=counter_size`.
    pub out_of_range: Vec<u64>,
}

impl DensityReport {
    /// Builds a report from a group's ordered seq values and counter size.
    #[must_use]
    pub(super) fn from_seqs(
        owner_id: OwnerId,
        category: Category,
        counter_size: u64,
        seqs: &[u64],
    ) -> Self {
        let mut missing = Vec::new();
        let mut duplicates = Vec::new();
        let mut out_of_range = Vec::new();

        let mut iter = seqs.iter().copied().peekable();
        // Seq is 1-based; a stored 0 can only be corruption.
        while iter.peek() == Some(&0) {
            iter.next();
            out_of_range.push(0);
        }
        for expected in 1..=counter_size {
            let mut count = 0u64;
            while iter.peek() == Some(&expected) {
                iter.next();
                count += 1;
            }
            match count {
                0 => missing.push(expected),
                1 => {}
                _ => duplicates.push(expected),
            }
        }
        // Whatever remains sorts past counter_size.
        out_of_range.extend(iter);

        Self {
            owner_id,
            category,
            counter_size,
            article_count: seqs.len() as u64,
            missing,
            duplicates,
            out_of_range,
        }
    }

    /// Whether the group satisfies the density invariant.
    #[must_use]
    pub fn is_dense(&self) -> bool {
        self.counter_size == self.article_count
            && self.missing.is_empty()
            && self.duplicates.is_empty()
            && self.out_of_range.is_empty()
    }

    /// Whether the group is entirely empty (no counter, no rows).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counter_size == 0 && self.article_count == 0
    }
}
