//! Memory backend error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::CancelError;

/// Result type for memory backend operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// An operation that can be made to fail once with
/// [`MemoryDatabase::fail_next`](crate::memory::MemoryDatabase::fail_next).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailPoint {
    Begin,
    Commit,
    Savepoint,
    RollbackToSavepoint,
}

impl fmt::Display for FailPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailPoint::Begin => "begin",
            FailPoint::Commit => "commit",
            FailPoint::Savepoint => "savepoint",
            FailPoint::RollbackToSavepoint => "rollback to savepoint",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`MemorySession`](crate::memory::MemorySession).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Waiting for a connection or starting work was cancelled.
    #[error("cancelled: {0}")]
    Cancelled(#[from] CancelError),

    /// A transaction operation on a session not bound to an open transaction.
    #[error("session is not in a transaction")]
    NoTransaction,

    /// Begin on a session that already has an open transaction.
    #[error("session is already in a transaction")]
    AlreadyInTransaction,

    /// Write inside a read-only transaction.
    #[error("cannot write in a read-only transaction")]
    ReadOnly,

    #[error("savepoint not found: {0}")]
    SavepointNotFound(String),

    #[error("row {table}/{key} already exists")]
    RowAlreadyExists { table: String, key: String },

    #[error("row {table}/{key} not found")]
    RowNotFound { table: String, key: String },

    /// A failure requested with `fail_next`.
    #[error("injected {0} failure")]
    Injected(FailPoint),
}

impl MemoryError {
    pub(crate) fn row_exists(table: &str, key: &str) -> Self {
        Self::RowAlreadyExists {
            table: table.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn row_missing(table: &str, key: &str) -> Self {
        Self::RowNotFound {
            table: table.to_string(),
            key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            MemoryError::Injected(FailPoint::RollbackToSavepoint).to_string(),
            "injected rollback to savepoint failure"
        );
        assert_eq!(
            MemoryError::row_exists("users", "u1").to_string(),
            "row users/u1 already exists"
        );
        assert_eq!(
            MemoryError::from(CancelError::DeadlineExceeded),
            MemoryError::Cancelled(CancelError::DeadlineExceeded)
        );
    }
}
