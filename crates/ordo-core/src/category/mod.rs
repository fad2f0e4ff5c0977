//! Category domain and counter keys.
//!
//! Categories form a fixed, closed set of activity tags. Every journal
//! article belongs to exactly one category, and every (owner, category)
//! pair owns one counter row tracking the group's size.
//!
//! # Canonical lock order
//!
//! Operations that hold two counter locks at once (cross-category moves)
//! must acquire them in one fixed total order, or two concurrent moves
//! exchanging categories could deadlock. That order is defined here, once,
//! by [`Category::lock_rank`]: an explicit per-variant rank table. It is
//! deliberately **not** derived from the variant's spelling, so renaming a
//! category can never silently reorder lock acquisition.
//!
//! # Example
//!
//! ```rust
//! use ordo_core::category::Category;
//!
//! let cat: Category = "RUNNING".parse().unwrap();
//! assert_eq!(cat.display_name(), "Running");
//! assert!(Category::Gym.lock_rank() < Category::Running.lock_rank());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[cfg(test)]
mod tests;

/// Owner identifier. Owners are external accounts; the allocator only
/// needs an opaque, stable identity.
pub type OwnerId = Uuid;

/// Article identifier.
pub type ArticleId = Uuid;

/// The closed set of journal categories.
///
/// Adding or removing a variant changes the counter key space and the lock
/// rank table, and requires a redeploy; the set is stable for the process
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Category {
    Gym,
    Bodyweight,
    Crossfit,
    Running,
    Walking,
    Cycling,
    Hiking,
    Soccer,
    Basketball,
    Baseball,
    Tennis,
    Badminton,
    Boxing,
    Judo,
    Swimming,
    Yoga,
    Pilates,
    Climbing,
}

impl Category {
    /// Every category, in lock-rank order.
    pub const ALL: [Self; 18] = [
        Self::Gym,
        Self::Bodyweight,
        Self::Crossfit,
        Self::Running,
        Self::Walking,
        Self::Cycling,
        Self::Hiking,
        Self::Soccer,
        Self::Basketball,
        Self::Baseball,
        Self::Tennis,
        Self::Badminton,
        Self::Boxing,
        Self::Judo,
        Self::Swimming,
        Self::Yoga,
        Self::Pilates,
        Self::Climbing,
    ];

    /// Position of this category in the canonical lock order.
    ///
    /// This is the one place the total order over categories is defined.
    /// Multi-key lock acquisition always proceeds from lower to higher
    /// rank.
    #[must_use]
    pub const fn lock_rank(self) -> u8 {
        match self {
            Self::Gym => 0,
            Self::Bodyweight => 1,
            Self::Crossfit => 2,
            Self::Running => 3,
            Self::Walking => 4,
            Self::Cycling => 5,
            Self::Hiking => 6,
            Self::Soccer => 7,
            Self::Basketball => 8,
            Self::Baseball => 9,
            Self::Tennis => 10,
            Self::Badminton => 11,
            Self::Boxing => 12,
            Self::Judo => 13,
            Self::Swimming => 14,
            Self::Yoga => 15,
            Self::Pilates => 16,
            Self::Climbing => 17,
        }
    }

    /// Stable identifier, as stored in the database and wire formats.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gym => "GYM",
            Self::Bodyweight => "BODYWEIGHT",
            Self::Crossfit => "CROSSFIT",
            Self::Running => "RUNNING",
            Self::Walking => "WALKING",
            Self::Cycling => "CYCLING",
            Self::Hiking => "HIKING",
            Self::Soccer => "SOCCER",
            Self::Basketball => "BASKETBALL",
            Self::Baseball => "BASEBALL",
            Self::Tennis => "TENNIS",
            Self::Badminton => "BADMINTON",
            Self::Boxing => "BOXING",
            Self::Judo => "JUDO",
            Self::Swimming => "SWIMMING",
            Self::Yoga => "YOGA",
            Self::Pilates => "PILATES",
            Self::Climbing => "CLIMBING",
        }
    }

    /// Human-readable label for display surfaces.
    ///
    /// The allocator itself never consults this; it exists for the size
    /// report and the CLI.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Gym => "Gym",
            Self::Bodyweight => "Bodyweight",
            Self::Crossfit => "CrossFit",
            Self::Running => "Running",
            Self::Walking => "Walking",
            Self::Cycling => "Cycling",
            Self::Hiking => "Hiking",
            Self::Soccer => "Soccer",
            Self::Basketball => "Basketball",
            Self::Baseball => "Baseball",
            Self::Tennis => "Tennis",
            Self::Badminton => "Badminton",
            Self::Boxing => "Boxing",
            Self::Judo => "Judo",
            Self::Swimming => "Swimming",
            Self::Yoga => "Yoga",
            Self::Pilates => "Pilates",
            Self::Climbing => "Climbing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories order by [`Category::lock_rank`], never by spelling.
impl Ord for Category {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lock_rank().cmp(&other.lock_rank())
    }
}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Error returned when a string matches no known category.
#[derive(Debug, Clone, Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Parses either the stable identifier (`"RUNNING"`, case-insensitive)
    /// or the display name (`"Running"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s) || c.display_name() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Identifies one counter scope: an owner plus a category.
///
/// The `Ord` implementation orders keys by `(owner_id, lock_rank)` and is
/// the canonical lock order used by
/// [`KeyLockTable::acquire_pair`](crate::lock::KeyLockTable::acquire_pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterKey {
    /// Owner the counter belongs to.
    pub owner_id: OwnerId,
    /// Category the counter tracks.
    pub category: Category,
}

impl CounterKey {
    /// Creates a key for an owner and category.
    #[must_use]
    pub const fn new(owner_id: OwnerId, category: Category) -> Self {
        Self { owner_id, category }
    }
}

impl Ord for CounterKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.owner_id
            .cmp(&other.owner_id)
            .then(self.category.cmp(&other.category))
    }
}

impl PartialOrd for CounterKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.category)
    }
}
