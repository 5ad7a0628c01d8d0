//! Cancellation signal carried through every blocking collaborator call.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why a blocking operation gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelError {
    /// The signal was cancelled explicitly.
    #[error("operation cancelled")]
    Cancelled,

    /// The signal's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// A cloneable cancellation flag with an optional deadline.
///
/// Clones share the same flag, so cancelling any clone cancels all of them.
/// The core never acts on the signal itself; it hands it to the session
/// collaborator on begin, commit, savepoint and pool checkout.
#[derive(Clone, Default)]
pub struct Cancellation {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A signal that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    /// A signal that fires once [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self {
            flag: Some(Arc::new(AtomicBool::new(false))),
            deadline: None,
        }
    }

    /// Derive a signal that additionally fires at `deadline`.
    ///
    /// An earlier existing deadline is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            flag: self.flag.clone(),
            deadline: Some(deadline),
        }
    }

    /// Derive a signal that fires after `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel this signal and every clone sharing its flag.
    ///
    /// No-op on a signal created with [`none`](Self::none).
    pub fn cancel(&self) {
        if let Some(flag) = &self.flag {
            flag.store(true, Ordering::SeqCst);
        }
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Ok while the signal has not fired.
    pub fn check(&self) -> Result<(), CancelError> {
        if let Some(flag) = &self.flag {
            if flag.load(Ordering::SeqCst) {
                return Err(CancelError::Cancelled);
            }
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CancelError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellation")
            .field("cancellable", &self.flag.is_some())
            .field("deadline", &self.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
