//! txflow - declarative transaction propagation
//!
//! This crate lets a unit of work say how it relates to the transaction it
//! is called from (join it, start its own, nest under a savepoint, suspend
//! it, or refuse it) without threading transaction handles by hand. Side
//! effects that must only happen once data is durable are registered as
//! post-commit hooks.
//!
//! The database is reached through the [`Session`](session::Session) trait;
//! [`memory`] ships an in-memory implementation.
//!
//! # Example
//!
//! ```
//! use txflow::context::TxContext;
//! use txflow::engine::{TxError, TxManager};
//! use txflow::memory::{MemoryDatabase, MemoryError};
//! use txflow::options::{Propagation, TxOptions};
//!
//! #[derive(Debug, thiserror::Error)]
//! enum AppError {
//!     #[error(transparent)]
//!     Tx(#[from] TxError),
//!     #[error(transparent)]
//!     Store(#[from] MemoryError),
//! }
//!
//! let db = MemoryDatabase::new();
//! let ctx = TxContext::new().with_root_session(db.session());
//! let manager = TxManager::new();
//!
//! let result: Result<(), AppError> = manager.do_in_transaction(&ctx, |ctx| {
//!     ctx.must_root_session().insert("orders", "o1", serde_json::json!({"total": 42}))?;
//!
//!     // audit entry commits on its own, even if the order is rolled back
//!     manager.do_in_transaction(ctx, |ctx| {
//!         ctx.must_root_session().insert("audit", "a1", serde_json::json!("order placed"))?;
//!         Ok::<(), AppError>(())
//!     }, &[TxOptions::propagation(Propagation::RequiresNew)])?;
//!
//!     ctx.after_commit(|_| {
//!         println!("order o1 stored");
//!         Ok::<(), MemoryError>(())
//!     })?;
//!     Ok(())
//! }, &[]);
//!
//! assert!(result.is_ok());
//! assert_eq!(db.count("orders"), 1);
//! assert_eq!(db.count("audit"), 1);
//! ```

pub mod context;
pub mod engine;
pub mod hooks;
pub mod memory;
pub mod options;
pub mod session;

pub use context::{Cancellation, TxContext};
pub use engine::{do_in_transaction, TxError, TxManager, TxResult};
pub use options::{IsolationLevel, Propagation, TxOptions};
pub use session::Session;
