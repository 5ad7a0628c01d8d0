//! Transaction options: propagation mode, isolation hint and read-only hint.
//!
//! Callers pass zero or more partial [`TxOptions`]; they are merged into one
//! [`ResolvedOptions`] before any transaction work happens. Conflicting
//! settings for the same field are rejected.

mod error;
mod isolation;
mod option;
mod propagation;

pub use error::{OptionError, OptionResult};
pub use isolation::IsolationLevel;
pub use option::{merge, ResolvedOptions, TxOptions};
pub use propagation::Propagation;
