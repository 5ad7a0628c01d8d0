//! Per-transaction collection of post-commit hooks.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;

use crate::context::TxContext;
use crate::hooks::error::{BoxError, HookError};

/// A callback deferred until its transaction has committed.
pub type Hook<S> = Box<dyn FnOnce(&TxContext<S>) -> Result<(), BoxError> + Send + 'static>;

/// Hooks registered by one logical transaction.
///
/// Hooks run at most once. After [`execute`](Self::execute) has been called,
/// later registrations are dropped and later `execute` calls return nothing.
pub struct HookContainer<S> {
    state: Mutex<HookState<S>>,
}

struct HookState<S> {
    hooks: Vec<Hook<S>>,
    executed: bool,
}

impl<S> Default for HookContainer<S> {
    fn default() -> Self {
        Self {
            state: Mutex::new(HookState {
                hooks: Vec::new(),
                executed: false,
            }),
        }
    }
}

impl<S> HookContainer<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook. Ignored once the container has executed.
    pub fn register(&self, hook: Hook<S>) {
        let mut state = self.state.lock();
        if state.executed {
            tracing::debug!("post-commit hook registered after execution, dropping it");
            return;
        }
        state.hooks.push(hook);
    }

    /// Number of hooks waiting to run.
    pub fn len(&self) -> usize {
        self.state.lock().hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_executed(&self) -> bool {
        self.state.lock().executed
    }

    /// Run every registered hook once, in registration order.
    ///
    /// The hook list is taken under the lock and the lock is released before
    /// any hook runs. A hook that fails or panics is reported in the returned
    /// list and the remaining hooks still run. Only the first call does any
    /// work; every later call returns an empty list.
    pub fn execute(&self, ctx: &TxContext<S>) -> Vec<HookError> {
        let hooks = {
            let mut state = self.state.lock();
            if state.executed {
                return Vec::new();
            }
            state.executed = true;
            std::mem::take(&mut state.hooks)
        };

        let mut errors = Vec::new();
        for (index, hook) in hooks.into_iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| hook(ctx))) {
                Ok(Ok(())) => {}
                Ok(Err(source)) => errors.push(HookError::Failed { index, source }),
                Err(payload) => errors.push(HookError::Panicked {
                    index,
                    message: panic_message(payload.as_ref()),
                    // already unwound: frames end at this call, not at the panic
                    backtrace: Backtrace::force_capture().to_string(),
                }),
            }
        }
        errors
    }
}

impl<S> fmt::Debug for HookContainer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HookContainer")
            .field("pending", &state.hooks.len())
            .field("executed", &state.executed)
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    type Ctx = TxContext<()>;

    fn hook<F>(f: F) -> Hook<()>
    where
        F: FnOnce(&Ctx) -> Result<(), BoxError> + Send + 'static,
    {
        Box::new(f)
    }

    fn counting_hook(counter: &Arc<AtomicUsize>) -> Hook<()> {
        let counter = counter.clone();
        hook(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let container = HookContainer::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            container.register(hook(move |_| {
                order.lock().push(i);
                Ok(())
            }));
        }

        let errors = container.execute(&Ctx::new());
        assert!(errors.is_empty());
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert!(container.is_executed());
    }

    #[test]
    fn test_panic_is_isolated() {
        let container = HookContainer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        container.register(hook(|_| panic!("boom")));
        container.register(counting_hook(&counter));

        let errors = container.execute(&Ctx::new());
        assert_eq!(errors.len(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        match &errors[0] {
            HookError::Panicked {
                index,
                message,
                backtrace,
            } => {
                assert_eq!(*index, 0);
                assert_eq!(message, "boom");
                assert!(!backtrace.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(errors[0].to_string().contains("Stack Trace"));
    }

    #[test]
    fn test_errors_are_collected_in_order() {
        let container = HookContainer::new();
        container.register(hook(|_| Err("first".into())));
        container.register(hook(|_| Ok(())));
        container.register(hook(|_| Err("third".into())));

        let errors = container.execute(&Ctx::new());
        let indexes: Vec<_> = errors.iter().map(HookError::index).collect();
        assert_eq!(indexes, vec![0, 2]);
        assert!(errors[1].to_string().contains("third"));
    }

    #[test]
    fn test_execute_is_idempotent() {
        let container = HookContainer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        container.register(counting_hook(&counter));
        container.register(hook(|_| Err("bad".into())));

        assert_eq!(container.execute(&Ctx::new()).len(), 1);
        assert!(container.execute(&Ctx::new()).is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_after_execute_is_dropped() {
        let container = HookContainer::new();
        container.execute(&Ctx::new());

        let counter = Arc::new(AtomicUsize::new(0));
        container.register(counting_hook(&counter));
        assert!(container.is_empty());
        assert!(container.execute(&Ctx::new()).is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_execute_runs_once() {
        let container = Arc::new(HookContainer::new());
        let counter = Arc::new(AtomicUsize::new(0));
        container.register(counting_hook(&counter));
        container.register(hook(|_| panic!("faulty hook")));

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let container = container.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    container.execute(&Ctx::new()).len()
                })
            })
            .collect();

        let reported: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(reported, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
