//! Shared state of an in-memory database.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;

use crate::memory::config::MemoryConfig;
use crate::memory::error::{FailPoint, MemoryError, MemoryResult};
use crate::memory::pool::ConnectionPool;
use crate::memory::session::MemorySession;
use crate::memory::transaction::Tables;

/// Transaction lifecycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
    pub savepoints: u64,
    pub savepoint_rollbacks: u64,
}

pub(crate) struct Shared {
    pub(crate) config: MemoryConfig,
    pub(crate) tables: RwLock<Tables>,
    pub(crate) pool: ConnectionPool,
    pub(crate) stats: Mutex<MemoryStats>,
    failures: Mutex<Vec<FailPoint>>,
}

/// An in-memory document store with transactions, savepoints and a bounded
/// connection pool.
///
/// Cheap to clone; clones share the same data. Rows are JSON values keyed by
/// table and key.
///
/// ```
/// use txflow::memory::{MemoryConfig, MemoryDatabase};
///
/// let db = MemoryDatabase::with_config(MemoryConfig::new().max_connections(2));
/// let session = db.session();
/// session.upsert("users", "alice", serde_json::json!({"age": 30})).unwrap();
///
/// assert_eq!(db.keys("users"), vec!["alice".to_string()]);
/// ```
#[derive(Clone)]
pub struct MemoryDatabase {
    pub(crate) shared: Arc<Shared>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::with_config(MemoryConfig::default())
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        let pool = ConnectionPool::new(config.max_connections, config.poll_interval());
        Self {
            shared: Arc::new(Shared {
                config,
                tables: RwLock::new(Tables::new()),
                pool,
                stats: Mutex::new(MemoryStats::default()),
                failures: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A session bound to the pool, writing in autocommit mode until a
    /// transaction is begun on it.
    pub fn session(&self) -> MemorySession {
        MemorySession::pooled(self.clone())
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> MemoryStats {
        *self.shared.stats.lock()
    }

    /// Make the next `point` operation fail with [`MemoryError::Injected`].
    pub fn fail_next(&self, point: FailPoint) {
        self.shared.failures.lock().push(point);
    }

    /// Committed value of `table`/`key`.
    pub fn get(&self, table: &str, key: &str) -> Option<Value> {
        self.shared
            .tables
            .read()
            .get(table)
            .and_then(|rows| rows.get(key))
            .cloned()
    }

    /// Committed keys of `table`, in order.
    pub fn keys(&self, table: &str) -> Vec<String> {
        self.shared
            .tables
            .read()
            .get(table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of committed rows in `table`.
    pub fn count(&self, table: &str) -> usize {
        self.shared.tables.read().get(table).map_or(0, |rows| rows.len())
    }

    /// Number of idle pooled connections.
    pub fn available_connections(&self) -> usize {
        self.shared.pool.available()
    }

    /// Number of connections created so far.
    pub fn created_connections(&self) -> usize {
        self.shared.pool.created()
    }

    /// Consume a pending injected failure for `point`, if any.
    pub(crate) fn injected(&self, point: FailPoint) -> MemoryResult<()> {
        let mut failures = self.shared.failures.lock();
        match failures.iter().position(|p| *p == point) {
            Some(index) => {
                failures.remove(index);
                tracing::debug!(%point, "injected failure");
                Err(MemoryError::Injected(point))
            }
            None => Ok(()),
        }
    }

    pub(crate) fn record(&self, update: impl FnOnce(&mut MemoryStats)) {
        let mut stats = self.shared.stats.lock();
        update(&mut *stats);
    }
}

impl fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDatabase")
            .field("config", &self.shared.config)
            .field("pool", &self.shared.pool)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_database() {
        let db = MemoryDatabase::new();
        assert_eq!(db.count("users"), 0);
        assert!(db.keys("users").is_empty());
        assert_eq!(db.get("users", "alice"), None);
        assert_eq!(db.stats(), MemoryStats::default());
    }

    #[test]
    fn test_clones_share_data() {
        let db = MemoryDatabase::new();
        let clone = db.clone();
        db.session().upsert("users", "alice", json!(1)).unwrap();
        assert_eq!(clone.get("users", "alice"), Some(json!(1)));
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let db = MemoryDatabase::new();
        db.fail_next(FailPoint::Commit);

        assert!(db.injected(FailPoint::Begin).is_ok());
        assert_eq!(
            db.injected(FailPoint::Commit),
            Err(MemoryError::Injected(FailPoint::Commit))
        );
        assert!(db.injected(FailPoint::Commit).is_ok());
    }
}
