//! Propagation engine error types.

use thiserror::Error;

use crate::hooks::BoxError;
use crate::options::OptionError;

/// Result type for engine operations.
pub type TxResult<T> = Result<T, TxError>;

/// Errors returned by [`TxManager::do_in_transaction`](crate::engine::TxManager::do_in_transaction).
///
/// Hook failures are not in here: hooks run after commit and are reported
/// to a [`HookErrorHandler`](crate::hooks::HookErrorHandler) instead.
#[derive(Debug, Error)]
pub enum TxError {
    /// The options of the call conflict with each other.
    #[error(transparent)]
    Options(#[from] OptionError),

    /// The carrier has no session at all.
    #[error("no session found in context; seed one with TxContext::with_root_session")]
    NoDbAwareContext,

    /// MANDATORY without an ambient transaction, or hook registration
    /// outside a transaction.
    #[error("transaction required, ensure you are in a transaction")]
    NoTransaction,

    /// NEVER with an ambient transaction.
    #[error("transaction present but propagation forbids it (NEVER)")]
    TransactionPresent,

    /// The session failed to begin a transaction.
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] BoxError),

    /// The session failed to commit; the transaction's hooks were discarded.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] BoxError),

    /// No independent session could be checked out for REQUIRES_NEW.
    #[error("failed to check out an independent session: {0}")]
    Checkout(#[source] BoxError),

    /// Savepoint creation failed for NESTED.
    #[error("failed to create savepoint {name}: {source}")]
    Savepoint {
        name: String,
        #[source]
        source: BoxError,
    },

    /// A nested unit of work failed and rolling back to its savepoint failed too.
    #[error("nested rollback to savepoint {name} failed: {cause} (rollback error: {source})")]
    NestedRollback {
        name: String,
        /// The failure of the nested unit of work.
        cause: String,
        #[source]
        source: BoxError,
    },

    /// Releasing a savepoint after a successful nested unit of work failed.
    #[error("failed to release savepoint {name}: {source}")]
    ReleaseSavepoint {
        name: String,
        #[source]
        source: BoxError,
    },
}

impl TxError {
    /// MANDATORY or NEVER was violated.
    pub fn is_propagation_violation(&self) -> bool {
        matches!(self, TxError::NoTransaction | TxError::TransactionPresent)
    }

    /// The call's options were inconsistent.
    pub fn is_configuration_conflict(&self) -> bool {
        matches!(
            self,
            TxError::Options(
                OptionError::ConflictingPropagation { .. }
                    | OptionError::ConflictingIsolation { .. }
                    | OptionError::ConflictingReadOnly { .. }
            )
        )
    }

    pub(crate) fn begin<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Begin(Box::new(source))
    }

    pub(crate) fn commit<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Commit(Box::new(source))
    }

    pub(crate) fn checkout<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Checkout(Box::new(source))
    }
}
