//! Ambient state threaded through a logical operation.
//!
//! A [`TxContext`] is passed explicitly to every unit of work. It carries the
//! root session seeded by the caller, the active transaction (when one was
//! begun or joined), the hook container of the current logical transaction,
//! and a [`Cancellation`] signal handed to every blocking session call.
//!
//! ```text
//!  TxContext (root)            seeded once by the caller
//!       │ with_transaction
//!       ▼
//!  TxContext (root, tx, hooks) seen by the unit of work
//!       │ suspended / without_transaction
//!       ▼
//!  TxContext (free session)    seen by NOT_SUPPORTED / REQUIRES_NEW bodies
//! ```

mod cancel;
mod carrier;
mod provider;

pub use cancel::{CancelError, Cancellation};
pub use carrier::TxContext;
pub use provider::SessionProvider;
