//! Error types for build database operations.

use std::path::PathBuf;

/// Errors reported by a build database.
///
/// A missing result is not an error; lookups report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A filesystem operation around the database failed.
    #[error("build database I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The storage engine reported an error (unreadable, locked, not a
    /// database, ...).
    #[error("build database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored entry failed validation.
    #[error("corrupt build database entry '{key}': {reason}")]
    Corrupt {
        /// The rule key (or internal entry name) that failed.
        key: String,
        /// Description of the problem.
        reason: String,
    },

    /// A result could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
