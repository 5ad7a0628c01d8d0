//! Bounded connection pool for the memory backend.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::context::Cancellation;
use crate::memory::error::MemoryResult;
use crate::memory::transaction::OpenTransaction;

/// A connection checked out of the pool.
///
/// Holds at most one open transaction. Returned to the pool when dropped;
/// a transaction still open at that point is discarded.
pub(crate) struct Connection {
    id: usize,
    pub(crate) tx: Mutex<Option<OpenTransaction>>,
    pool: Arc<PoolInner>,
}

impl Connection {
    pub(crate) fn id(&self) -> usize {
        self.id
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.get_mut().take() {
            tracing::debug!(connection = self.id, tx = %tx.id(), "discarding open transaction of returned connection");
        }
        let mut state = self.pool.state.lock();
        state.available.push_back(self.id);
        drop(state);
        self.pool.returned.notify_one();
        tracing::trace!(connection = self.id, "connection returned to pool");
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("in_transaction", &self.tx.lock().is_some())
            .finish()
    }
}

struct PoolState {
    available: VecDeque<usize>,
    created: usize,
}

struct PoolInner {
    state: Mutex<PoolState>,
    returned: Condvar,
    max_connections: usize,
    poll: Duration,
}

/// Connection pool for the memory database.
#[derive(Clone)]
pub(crate) struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub(crate) fn new(max_connections: usize, poll: Duration) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    available: VecDeque::new(),
                    created: 0,
                }),
                returned: Condvar::new(),
                max_connections: max_connections.max(1),
                poll,
            }),
        }
    }

    /// Get a connection, waiting for one to be returned when the pool is
    /// exhausted.
    ///
    /// Gives up with [`MemoryError::Cancelled`](crate::memory::MemoryError::Cancelled)
    /// once `cancel` fires; the signal is re-checked every poll interval.
    pub(crate) fn get(&self, cancel: &Cancellation) -> MemoryResult<Connection> {
        let mut state = self.inner.state.lock();
        loop {
            cancel.check()?;

            let id = if let Some(id) = state.available.pop_front() {
                Some(id)
            } else if state.created < self.inner.max_connections {
                state.created += 1;
                Some(state.created)
            } else {
                None
            };

            if let Some(id) = id {
                tracing::trace!(connection = id, "connection checked out");
                return Ok(Connection {
                    id,
                    tx: Mutex::new(None),
                    pool: self.inner.clone(),
                });
            }

            let wait = cancel
                .remaining()
                .map_or(self.inner.poll, |left| left.min(self.inner.poll));
            tracing::trace!(?wait, "connection pool exhausted, waiting");
            self.inner.returned.wait_for(&mut state, wait);
        }
    }

    /// Number of idle connections.
    pub(crate) fn available(&self) -> usize {
        self.inner.state.lock().available.len()
    }

    /// Total number of connections created.
    pub(crate) fn created(&self) -> usize {
        self.inner.state.lock().created
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ConnectionPool")
            .field("max_connections", &self.inner.max_connections)
            .field("created", &state.created)
            .field("available", &state.available.len())
            .finish()
    }
}
