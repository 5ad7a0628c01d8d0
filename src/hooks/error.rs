//! Post-commit hook errors.

use thiserror::Error;

/// Boxed error returned by hooks and session collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure of one post-commit hook.
///
/// The transaction has already committed when these are produced; they are
/// reported to a [`HookErrorHandler`](crate::hooks::HookErrorHandler) and
/// never change the outcome of the transaction.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook returned an error.
    #[error("post-commit hook #{index} failed: {source}")]
    Failed {
        /// Position of the hook in registration order.
        index: usize,
        #[source]
        source: BoxError,
    },

    /// The hook panicked.
    ///
    /// `backtrace` is captured in [`HookContainer::execute`](crate::hooks::HookContainer::execute)
    /// after the panic has been caught, so it shows the frames leading to
    /// the hook call rather than the panic site. Set `RUST_BACKTRACE=1` to
    /// get the panic site from the default panic hook.
    #[error("panic in post-commit hook #{index}: {message}\nStack Trace:\n{backtrace}")]
    Panicked {
        index: usize,
        message: String,
        backtrace: String,
    },
}

impl HookError {
    /// Position of the failing hook in registration order.
    pub fn index(&self) -> usize {
        match self {
            HookError::Failed { index, .. } | HookError::Panicked { index, .. } => *index,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, HookError::Panicked { .. })
    }
}
