//! Session lookup for repository code.

use crate::context::carrier::TxContext;

/// Resolves the session a repository should use for a given carrier.
///
/// The carrier's session wins (active transaction first, then root);
/// otherwise the provider's fallback session is returned. Repositories built
/// around a provider work both inside and outside managed transactions.
#[derive(Debug, Clone)]
pub struct SessionProvider<S> {
    fallback: Option<S>,
}

impl<S: Clone> SessionProvider<S> {
    /// A provider falling back to `session` when the carrier has none.
    pub fn new(session: S) -> Self {
        Self {
            fallback: Some(session),
        }
    }

    /// A provider that only ever returns the carrier's session.
    pub fn empty() -> Self {
        Self { fallback: None }
    }

    pub fn session(&self, ctx: &TxContext<S>) -> Option<S> {
        ctx.root_session()
            .cloned()
            .or_else(|| self.fallback.clone())
    }
}
