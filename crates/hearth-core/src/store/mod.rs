//! User progression storage.
//!
//! The `users` table belongs to the user-management subsystem; this module
//! only reads and writes the progression columns:
//!
//! - `experience_points`: lifetime XP, the source of truth
//! - `level`: cached `level_from_xp(experience_points)`, may be stale until
//!   the next recalculation
//! - `level_updated_at`: unix seconds of the last level correction
//!
//! [`ProgressionStore`] is the seam the recalculation pass works against;
//! [`SqliteUserStore`] is the production implementation.

mod sqlite;

use serde::Serialize;
use thiserror::Error;

pub use sqlite::{SqliteUserStore, open_database};

/// Errors from progression storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The shared connection mutex was poisoned by a panicking holder.
    #[error("database connection lock poisoned")]
    LockPoisoned,

    /// No row with this id.
    #[error("user not found: id={id}")]
    UserNotFound {
        /// The missing user id.
        id: i64,
    },

    /// A value does not fit the column type.
    #[error("{field} value {value} does not fit in the database column")]
    OutOfRange {
        /// Column name.
        field: &'static str,
        /// Rejected value.
        value: u64,
    },
}

/// The progression columns of one user row, exactly as stored.
///
/// Values are raw `SQLite` integers; convert them with
/// [`crate::leveling::xp_from_stored`] and
/// [`crate::leveling::level_from_stored`] before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredProgression {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub username: String,
    /// Stored XP total.
    pub experience_points: i64,
    /// Stored (cached) level.
    pub level: i64,
}

/// Read/write access to the progression columns.
pub trait ProgressionStore {
    /// Loads every user's progression in one pass, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn load_all(&self) -> Result<Vec<StoredProgression>, StoreError>;

    /// Writes a corrected cached level for one user.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails or no row has this id.
    fn update_level(&self, id: i64, level: u64) -> Result<(), StoreError>;
}
