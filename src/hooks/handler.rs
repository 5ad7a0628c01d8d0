//! Where post-commit hook errors go.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::hooks::container::panic_message;
use crate::hooks::error::HookError;

/// Receives every error produced by post-commit hooks.
///
/// Implemented for any `Fn(&HookError)` closure, so a custom handler can be
/// plugged in without a dedicated type.
pub trait HookErrorHandler: Send + Sync {
    fn handle(&self, error: &HookError);
}

impl<F> HookErrorHandler for F
where
    F: Fn(&HookError) + Send + Sync,
{
    fn handle(&self, error: &HookError) {
        self(error)
    }
}

/// Default handler: logs each hook error at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHookErrors;

impl HookErrorHandler for LogHookErrors {
    fn handle(&self, error: &HookError) {
        tracing::error!(hook = error.index(), error = %error, "post-commit hook error");
    }
}

/// Hand every error to `handler`, shielding the caller from handler panics.
pub(crate) fn dispatch(handler: &Arc<dyn HookErrorHandler>, errors: Vec<HookError>) {
    for error in errors {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&error))) {
            tracing::warn!(
                panic = %panic_message(payload.as_ref()),
                error = %error,
                "hook error handler panicked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    fn failed(index: usize) -> HookError {
        HookError::Failed {
            index,
            source: format!("failure {index}").into(),
        }
    }

    #[test]
    fn test_closure_handler_receives_every_error() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: Arc<dyn HookErrorHandler> =
            Arc::new(move |error: &HookError| sink.lock().push(error.index()));

        dispatch(&handler, vec![failed(0), failed(3)]);
        assert_eq!(*seen.lock(), vec![0, 3]);
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        let handler: Arc<dyn HookErrorHandler> = Arc::new(move |error: &HookError| {
            *sink.lock() += 1;
            if error.index() == 0 {
                panic!("handler bug");
            }
        });

        dispatch(&handler, vec![failed(0), failed(1)]);
        assert_eq!(*seen.lock(), 2);
    }

    #[test]
    fn test_log_handler_does_not_panic() {
        let handler: Arc<dyn HookErrorHandler> = Arc::new(LogHookErrors);
        dispatch(&handler, vec![failed(0)]);
    }
}
