//! Post-commit hooks.
//!
//! Code running inside a transaction registers side effects with
//! [`TxContext::after_commit`](crate::context::TxContext::after_commit).
//! They are kept in the transaction's [`HookContainer`] and run exactly once,
//! synchronously, after the commit succeeds. They never run on rollback.
//! Failures and panics are collected as [`HookError`]s and handed to a
//! [`HookErrorHandler`].

mod container;
mod error;
mod handler;

pub use container::{Hook, HookContainer};
pub use error::{BoxError, HookError};
pub use handler::{HookErrorHandler, LogHookErrors};

pub(crate) use handler::dispatch;
