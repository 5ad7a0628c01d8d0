//! The database-session collaborator contract.
//!
//! The engine never talks to a database directly. Everything it needs from
//! the session layer is expressed by [`Session`]: a handle that can begin a
//! transaction (yielding another handle bound to that transaction), finish
//! it, manage savepoints on it, and derive independent or transaction-free
//! sessions.
//!
//! A handle bound to a transaction is itself a `Session`, which is why the
//! carrier stores root and transaction handles with the same type.
//!
//! Every blocking method receives the carrier's [`Cancellation`]; an
//! implementation that can wait (pool checkout, lock acquisition, network
//! round trips) should give up once the signal fires.

use crate::context::Cancellation;
use crate::options::ResolvedOptions;

/// A database session handle.
pub trait Session: Clone + Send + Sync + 'static {
    /// Error type of the underlying driver.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Begin a transaction and return a handle bound to it.
    ///
    /// `options` carries the isolation and read-only hints of the request.
    fn begin(&self, cancel: &Cancellation, options: &ResolvedOptions) -> Result<Self, Self::Error>;

    /// Commit the transaction this handle is bound to.
    fn commit(&self, cancel: &Cancellation) -> Result<(), Self::Error>;

    /// Roll back the transaction this handle is bound to.
    fn rollback(&self, cancel: &Cancellation) -> Result<(), Self::Error>;

    /// Create a savepoint named `name` in the bound transaction.
    fn savepoint(&self, cancel: &Cancellation, name: &str) -> Result<(), Self::Error>;

    /// Undo everything done after savepoint `name`, keeping the transaction open.
    fn rollback_to_savepoint(&self, cancel: &Cancellation, name: &str) -> Result<(), Self::Error>;

    /// Release savepoint `name`. Many databases do not need this, so the
    /// default does nothing.
    fn release_savepoint(&self, _cancel: &Cancellation, _name: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Check out a session on its own physical connection.
    ///
    /// A transaction begun on the returned session must be able to commit
    /// while a transaction on `self` is still open. May block until the pool
    /// has a spare connection.
    fn independent(&self, cancel: &Cancellation) -> Result<Self, Self::Error>;

    /// A session that is not bound to any transaction.
    fn transaction_free(&self) -> Self;
}
