//! How REQUIRES_NEW obtains its independent session.

use crate::context::Cancellation;
use crate::session::Session;

/// Produces the session a REQUIRES_NEW transaction begins on.
///
/// The session must sit on a different physical connection than the
/// suspended transaction, otherwise the inner transaction cannot commit on
/// its own. Chosen when the [`TxManager`](crate::engine::TxManager) is built.
pub trait RequiresNewStrategy<S: Session>: Send + Sync {
    fn acquire(&self, root: &S, cancel: &Cancellation) -> Result<S, S::Error>;
}

impl<S, F> RequiresNewStrategy<S> for F
where
    S: Session,
    F: Fn(&S, &Cancellation) -> Result<S, S::Error> + Send + Sync,
{
    fn acquire(&self, root: &S, cancel: &Cancellation) -> Result<S, S::Error> {
        self(root, cancel)
    }
}

/// Default strategy: check out a pooled connection via [`Session::independent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolCheckout;

impl<S: Session> RequiresNewStrategy<S> for PoolCheckout {
    fn acquire(&self, root: &S, cancel: &Cancellation) -> Result<S, S::Error> {
        root.independent(cancel)
    }
}
