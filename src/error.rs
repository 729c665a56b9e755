//! Typed errors for store operations.
//!
//! Callers branch on [`Error::NotFound`] and [`Error::Conflict`]; everything
//! else is either an I/O failure or a sign that the files on disk are not
//! what the store wrote.

use std::path::PathBuf;

use thiserror::Error;

/// All store errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown feed id, or an item offset past the end of the collection.
    #[error("not found: {0}")]
    NotFound(String),

    /// A feed with the same source address is already stored.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A persisted row (or the counter) could not be decoded.
    #[error("malformed {}:{line}: {reason}", file.display())]
    Malformed {
        /// File the row was read from.
        file: PathBuf,
        /// 1-based line number, 0 when not applicable.
        line: u64,
        /// What was wrong with the row.
        reason: String,
    },

    /// An item references a feed that is not in the mirror.
    #[error("inconsistent store: {0}")]
    Inconsistent(String),

    /// The call was cancelled, or its deadline passed, before the store
    /// lock was acquired.
    #[error("operation cancelled before acquiring the store lock")]
    Cancelled,

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(file: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        Error::Malformed {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}
