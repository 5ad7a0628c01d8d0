//! The propagation engine.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::context::{Cancellation, TxContext};
use crate::engine::config::TxManagerConfig;
use crate::engine::error::TxError;
use crate::engine::savepoint::SavepointNames;
use crate::engine::strategy::{PoolCheckout, RequiresNewStrategy};
use crate::hooks::{self, HookContainer, HookErrorHandler, LogHookErrors};
use crate::options::{self, Propagation, ResolvedOptions, TxOptions};
use crate::session::Session;

/// Runs units of work under a propagation mode.
///
/// Cheap to share: build one per application (or per database) and call
/// [`do_in_transaction`](Self::do_in_transaction) from anywhere.
pub struct TxManager<S: Session> {
    config: TxManagerConfig,
    savepoints: SavepointNames,
    requires_new: Arc<dyn RequiresNewStrategy<S>>,
    hook_errors: Arc<dyn HookErrorHandler>,
}

impl<S: Session> Default for TxManager<S> {
    fn default() -> Self {
        Self::with_config(TxManagerConfig::default())
    }
}

impl<S: Session> TxManager<S> {
    /// A manager with the default configuration, pool checkout for
    /// REQUIRES_NEW and hook errors logged.
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager using `config` as is. Configs built in code rather than
    /// loaded with [`TxManagerConfig::from_file`] should be checked with
    /// [`TxManagerConfig::validate`] first.
    pub fn with_config(config: TxManagerConfig) -> Self {
        Self {
            savepoints: SavepointNames::new(config.savepoint_prefix.clone()),
            config,
            requires_new: Arc::new(PoolCheckout),
            hook_errors: Arc::new(LogHookErrors),
        }
    }

    /// Replace the way REQUIRES_NEW obtains its independent session.
    pub fn requires_new_strategy(mut self, strategy: impl RequiresNewStrategy<S> + 'static) -> Self {
        self.requires_new = Arc::new(strategy);
        self
    }

    /// Replace the receiver of post-commit hook errors.
    pub fn hook_error_handler(mut self, handler: impl HookErrorHandler + 'static) -> Self {
        self.hook_errors = Arc::new(handler);
        self
    }

    pub fn config(&self) -> &TxManagerConfig {
        &self.config
    }

    /// Run `f` under the propagation mode requested by `options`.
    ///
    /// Options are merged first, so conflicting options fail before anything
    /// touches the session. The carrier must hold a root session. `f`
    /// receives the carrier it should use: a transactional one when a
    /// transaction was begun or joined, a transaction-free one otherwise.
    ///
    /// A failing `f` rolls back what it did (the whole transaction, or up to
    /// the savepoint for NESTED) and its error is returned unchanged. A
    /// panicking `f` is rolled back the same way and the panic resumes.
    /// Hooks registered by `f` run after a successful commit, before this
    /// call returns.
    pub fn do_in_transaction<T, E, F>(
        &self,
        ctx: &TxContext<S>,
        f: F,
        options: &[TxOptions],
    ) -> Result<T, E>
    where
        F: FnOnce(&TxContext<S>) -> Result<T, E>,
        E: From<TxError> + fmt::Display,
    {
        let resolved = options::merge(options).map_err(TxError::from)?;
        let root = ctx.base_session().ok_or(TxError::NoDbAwareContext)?;
        let active = ctx.active_transaction();

        tracing::debug!(
            propagation = %resolved.propagation,
            in_transaction = active.is_some(),
            "resolving propagation"
        );

        match (resolved.propagation, active) {
            (Propagation::Required | Propagation::Supports | Propagation::Mandatory, Some(_)) => {
                tracing::debug!("joining active transaction");
                f(ctx)
            }
            (Propagation::Required | Propagation::Nested, None) => {
                self.run_in_new_transaction(ctx, root.clone(), f, &resolved)
            }
            (Propagation::RequiresNew, _) => {
                let session = self
                    .requires_new
                    .acquire(root, ctx.cancellation())
                    .map_err(TxError::checkout)?;
                self.run_in_new_transaction(ctx, session, f, &resolved)
            }
            (Propagation::Nested, Some(tx)) => self.run_nested(ctx, tx, f),
            (Propagation::NotSupported, Some(_)) => {
                tracing::debug!("suspending active transaction");
                f(&ctx.suspended(root.transaction_free()))
            }
            (Propagation::Supports | Propagation::NotSupported | Propagation::Never, None) => {
                f(&ctx.without_transaction())
            }
            (Propagation::Mandatory, None) => Err(TxError::NoTransaction.into()),
            (Propagation::Never, Some(_)) => Err(TxError::TransactionPresent.into()),
        }
    }

    /// Begin a transaction on `session`, run `f` in it, commit and run hooks.
    ///
    /// `session` and the transaction handle are dropped before hooks run, so
    /// a pooled connection is free again while they execute.
    fn run_in_new_transaction<T, E, F>(
        &self,
        ctx: &TxContext<S>,
        session: S,
        f: F,
        resolved: &ResolvedOptions,
    ) -> Result<T, E>
    where
        F: FnOnce(&TxContext<S>) -> Result<T, E>,
        E: From<TxError> + fmt::Display,
    {
        let cancel = ctx.cancellation();
        let tx = session.begin(cancel, resolved).map_err(TxError::begin)?;
        tracing::debug!(
            propagation = %resolved.propagation,
            isolation = ?resolved.isolation,
            read_only = ?resolved.read_only,
            "transaction begun"
        );

        let hooks = Arc::new(HookContainer::new());
        let outcome = {
            let tx_ctx = ctx.with_transaction(tx.clone(), hooks.clone());
            panic::catch_unwind(AssertUnwindSafe(|| f(&tx_ctx)))
        };

        match outcome {
            Ok(Ok(value)) => {
                if let Err(source) = tx.commit(cancel) {
                    tracing::debug!(error = %source, "commit failed, rolling back");
                    rollback(&tx, cancel);
                    return Err(TxError::commit(source).into());
                }
                drop(tx);
                drop(session);
                tracing::debug!(hooks = hooks.len(), "transaction committed");

                let errors = hooks.execute(&ctx.post_commit(hooks.clone()));
                if !errors.is_empty() {
                    hooks::dispatch(&self.hook_errors, errors);
                }
                Ok(value)
            }
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "unit of work failed, rolling back");
                rollback(&tx, cancel);
                Err(err)
            }
            Err(payload) => {
                tracing::debug!("unit of work panicked, rolling back");
                rollback(&tx, cancel);
                drop(tx);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Run `f` inside a savepoint of the active transaction `tx`.
    ///
    /// The carrier is passed through unchanged, so hooks registered by `f`
    /// land in the outer transaction's container.
    fn run_nested<T, E, F>(&self, ctx: &TxContext<S>, tx: &S, f: F) -> Result<T, E>
    where
        F: FnOnce(&TxContext<S>) -> Result<T, E>,
        E: From<TxError> + fmt::Display,
    {
        let cancel = ctx.cancellation();
        let name = self.savepoints.next();
        tx.savepoint(cancel, &name)
            .map_err(|source| TxError::Savepoint {
                name: name.clone(),
                source: Box::new(source),
            })?;
        tracing::debug!(savepoint = %name, "savepoint created");

        match panic::catch_unwind(AssertUnwindSafe(|| f(ctx))) {
            Ok(Ok(value)) => {
                if self.config.release_savepoints {
                    tx.release_savepoint(cancel, &name)
                        .map_err(|source| TxError::ReleaseSavepoint {
                            name: name.clone(),
                            source: Box::new(source),
                        })?;
                    tracing::debug!(savepoint = %name, "savepoint released");
                }
                Ok(value)
            }
            Ok(Err(err)) => match tx.rollback_to_savepoint(cancel, &name) {
                Ok(()) => {
                    tracing::debug!(savepoint = %name, error = %err, "rolled back to savepoint");
                    Err(err)
                }
                Err(source) => Err(TxError::NestedRollback {
                    name,
                    cause: err.to_string(),
                    source: Box::new(source),
                }
                .into()),
            },
            Err(payload) => {
                if let Err(error) = tx.rollback_to_savepoint(cancel, &name) {
                    tracing::warn!(savepoint = %name, error = %error, "rollback to savepoint after panic failed");
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

/// Roll back `tx`; a failure can only be logged since the caller is already
/// returning another outcome.
fn rollback<S: Session>(tx: &S, cancel: &Cancellation) {
    match tx.rollback(cancel) {
        Ok(()) => tracing::debug!("transaction rolled back"),
        Err(error) => tracing::warn!(error = %error, "rollback failed"),
    }
}

impl<S: Session> fmt::Debug for TxManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run `f` under `options` with a default [`TxManager`].
///
/// ```
/// use txflow::context::TxContext;
/// use txflow::engine::do_in_transaction;
/// use txflow::hooks::BoxError;
/// use txflow::memory::MemoryDatabase;
///
/// let db = MemoryDatabase::new();
/// let ctx = TxContext::new().with_root_session(db.session());
///
/// let result: Result<(), BoxError> = do_in_transaction(&ctx, |ctx| {
///     let session = ctx.must_root_session();
///     session.insert("items", "a", serde_json::json!({"name": "A"}))?;
///     ctx.after_commit(|_| {
///         println!("committed");
///         Ok::<(), BoxError>(())
///     })?;
///     Ok(())
/// }, &[]);
///
/// assert!(result.is_ok());
/// assert_eq!(db.count("items"), 1);
/// ```
pub fn do_in_transaction<S, T, E, F>(ctx: &TxContext<S>, f: F, options: &[TxOptions]) -> Result<T, E>
where
    S: Session,
    F: FnOnce(&TxContext<S>) -> Result<T, E>,
    E: From<TxError> + fmt::Display,
{
    TxManager::new().do_in_transaction(ctx, f, options)
}
