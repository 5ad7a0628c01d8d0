//! The ambient carrier threaded through every unit of work.

use std::fmt;
use std::sync::Arc;

use crate::context::cancel::Cancellation;
use crate::engine::{TxError, TxResult};
use crate::hooks::{BoxError, HookContainer};

/// Immutable context exposing the root session, the active transaction and
/// the hook container of the current logical transaction.
///
/// Every derivation returns a new carrier; a parent is never modified, so a
/// carrier can be cloned freely and moved across threads when `S` allows it.
pub struct TxContext<S> {
    root: Option<S>,
    tx: Option<S>,
    hooks: Option<Arc<HookContainer<S>>>,
    cancel: Cancellation,
}

impl<S> Default for TxContext<S> {
    fn default() -> Self {
        Self {
            root: None,
            tx: None,
            hooks: None,
            cancel: Cancellation::none(),
        }
    }
}

impl<S: Clone> Clone for TxContext<S> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            tx: self.tx.clone(),
            hooks: self.hooks.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S: Clone> TxContext<S> {
    /// An empty carrier with no session and no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the root session.
    ///
    /// If a root session is already present the carrier is returned
    /// unchanged, so stacked middleware layers cannot replace it.
    pub fn with_root_session(&self, session: S) -> Self {
        if self.root.is_some() {
            return self.clone();
        }
        Self {
            root: Some(session),
            ..self.clone()
        }
    }

    /// Derive a carrier with a different cancellation signal.
    pub fn with_cancellation(&self, cancel: Cancellation) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    /// The session unit-of-work code should talk to: the active transaction
    /// if there is one, otherwise the root session.
    pub fn root_session(&self) -> Option<&S> {
        self.tx.as_ref().or(self.root.as_ref())
    }

    /// The seeded root session, ignoring any active transaction.
    pub fn base_session(&self) -> Option<&S> {
        self.root.as_ref()
    }

    /// The active transaction handle, if any.
    pub fn active_transaction(&self) -> Option<&S> {
        self.tx.as_ref()
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Like [`root_session`](Self::root_session) but panics when absent.
    ///
    /// Only for call sites that already know a session was seeded.
    pub fn must_root_session(&self) -> &S {
        match self.root_session() {
            Some(session) => session,
            None => panic!("{}", TxError::NoDbAwareContext),
        }
    }

    /// Like [`active_transaction`](Self::active_transaction) but panics when
    /// no transaction is active.
    pub fn must_active_transaction(&self) -> &S {
        match self.active_transaction() {
            Some(tx) => tx,
            None => panic!("{}", TxError::NoTransaction),
        }
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// Register a hook to run after the current transaction commits.
    ///
    /// Fails with [`TxError::NoTransaction`] when the carrier has no hook
    /// container, i.e. outside a transaction begun by the engine.
    pub fn after_commit<F, E>(&self, hook: F) -> TxResult<()>
    where
        F: FnOnce(&TxContext<S>) -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        let hooks = self.hooks.as_ref().ok_or(TxError::NoTransaction)?;
        hooks.register(Box::new(move |ctx: &TxContext<S>| {
            hook(ctx).map_err(Into::<BoxError>::into)
        }));
        Ok(())
    }

    pub(crate) fn hooks(&self) -> Option<&Arc<HookContainer<S>>> {
        self.hooks.as_ref()
    }

    /// Carrier for the body of a freshly begun transaction.
    pub(crate) fn with_transaction(&self, tx: S, hooks: Arc<HookContainer<S>>) -> Self {
        Self {
            tx: Some(tx),
            hooks: Some(hooks),
            ..self.clone()
        }
    }

    /// Carrier handed to post-commit hooks: the caller's root session, no
    /// active transaction, and the (already executed) container of the
    /// committed transaction, so late registrations are dropped.
    pub(crate) fn post_commit(&self, hooks: Arc<HookContainer<S>>) -> Self {
        Self {
            root: self.root.clone(),
            tx: None,
            hooks: Some(hooks),
            cancel: self.cancel.clone(),
        }
    }

    /// Carrier with no transaction and no hook container visible.
    pub(crate) fn without_transaction(&self) -> Self {
        Self {
            root: self.root.clone(),
            tx: None,
            hooks: None,
            cancel: self.cancel.clone(),
        }
    }

    /// Carrier whose root is `session` and whose active transaction is
    /// hidden for the duration of the call.
    pub(crate) fn suspended(&self, session: S) -> Self {
        Self {
            root: Some(session),
            tx: None,
            hooks: None,
            cancel: self.cancel.clone(),
        }
    }
}

impl<S> fmt::Debug for TxContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxContext")
            .field("has_root", &self.root.is_some())
            .field("in_transaction", &self.tx.is_some())
            .field("has_hooks", &self.hooks.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}
