//! Option resolution errors.

use thiserror::Error;

use crate::options::isolation::IsolationLevel;
use crate::options::propagation::Propagation;

/// Result type for option resolution.
pub type OptionResult<T> = Result<T, OptionError>;

/// Errors raised while parsing or merging transaction options.
///
/// All of them are reported before any transaction begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    /// Two options requested different propagation modes.
    #[error("invalid propagation level, multiple different propagation levels provided ({first} and {second})")]
    ConflictingPropagation {
        first: Propagation,
        second: Propagation,
    },

    /// Two options requested different isolation levels.
    #[error("invalid isolation level, multiple different isolation levels provided ({first} and {second})")]
    ConflictingIsolation {
        first: IsolationLevel,
        second: IsolationLevel,
    },

    /// Two options requested different read-only flags.
    #[error("invalid readonly level, multiple different readonly levels provided ({first} and {second})")]
    ConflictingReadOnly { first: bool, second: bool },

    /// Unrecognized propagation name.
    #[error("invalid propagation: {0}")]
    InvalidPropagation(String),

    /// Unrecognized isolation level name.
    #[error("unknown isolation level: {0}")]
    InvalidIsolation(String),
}
