//! Session handles over a [`MemoryDatabase`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use ulid::Ulid;

use crate::context::Cancellation;
use crate::memory::database::MemoryDatabase;
use crate::memory::error::{FailPoint, MemoryError, MemoryResult};
use crate::memory::pool::Connection;
use crate::memory::transaction::{OpenTransaction, Tables, TransactionInfo};
use crate::options::ResolvedOptions;
use crate::session::Session;

#[derive(Clone)]
enum Binding {
    /// Not holding a connection; writes autocommit.
    Pool,
    /// Holding a connection of its own, with no transaction bound yet.
    Pinned(Arc<Connection>),
    /// Bound to transaction `id` on `conn`.
    Transaction { conn: Arc<Connection>, id: Ulid },
}

/// A handle to a [`MemoryDatabase`].
///
/// Outside a transaction writes apply to committed data at once. A handle
/// returned by [`Session::begin`] buffers its writes until commit and reads
/// them back over committed data. Clones share the binding, so a cloned
/// transaction handle talks to the same transaction.
#[derive(Clone)]
pub struct MemorySession {
    db: MemoryDatabase,
    binding: Binding,
}

impl MemorySession {
    pub(crate) fn pooled(db: MemoryDatabase) -> Self {
        Self {
            db,
            binding: Binding::Pool,
        }
    }

    pub fn database(&self) -> &MemoryDatabase {
        &self.db
    }

    /// Whether this handle is bound to a transaction that is still open.
    pub fn in_transaction(&self) -> bool {
        self.with_tx(|_, _| Ok(())).is_ok()
    }

    /// Metadata of the bound transaction, if it is still open.
    pub fn transaction_info(&self) -> Option<TransactionInfo> {
        self.with_tx(|tx, _| Ok(tx.info())).ok()
    }

    /// Id of the pooled connection this handle holds, if any.
    pub fn connection_id(&self) -> Option<usize> {
        match &self.binding {
            Binding::Pool => None,
            Binding::Pinned(conn) | Binding::Transaction { conn, .. } => Some(conn.id()),
        }
    }

    // ==================== Row Operations ====================

    /// Insert a new row. Fails if the key is taken.
    pub fn insert(&self, table: &str, key: &str, value: Value) -> MemoryResult<()> {
        if self.is_transactional() {
            return self.with_tx(|tx, committed| tx.insert(committed, table, key, value));
        }
        let mut tables = self.db.shared.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        if rows.contains_key(key) {
            return Err(MemoryError::row_exists(table, key));
        }
        rows.insert(key.to_string(), value);
        Ok(())
    }

    /// Insert or replace a row.
    pub fn upsert(&self, table: &str, key: &str, value: Value) -> MemoryResult<()> {
        if self.is_transactional() {
            return self.with_tx(|tx, _| tx.upsert(table, key, value));
        }
        self.db
            .shared
            .tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    /// Delete a row. Fails if it does not exist.
    pub fn delete(&self, table: &str, key: &str) -> MemoryResult<()> {
        if self.is_transactional() {
            return self.with_tx(|tx, committed| tx.delete(committed, table, key));
        }
        self.db
            .shared
            .tables
            .write()
            .get_mut(table)
            .and_then(|rows| rows.remove(key))
            .map(|_| ())
            .ok_or_else(|| MemoryError::row_missing(table, key))
    }

    pub fn get(&self, table: &str, key: &str) -> MemoryResult<Option<Value>> {
        if self.is_transactional() {
            return self.with_tx(|tx, committed| Ok(tx.get(committed, table, key)));
        }
        Ok(self.db.get(table, key))
    }

    pub fn keys(&self, table: &str) -> MemoryResult<Vec<String>> {
        if self.is_transactional() {
            return self.with_tx(|tx, committed| Ok(tx.keys(committed, table)));
        }
        Ok(self.db.keys(table))
    }

    pub fn count(&self, table: &str) -> MemoryResult<usize> {
        self.keys(table).map(|keys| keys.len())
    }

    // ==================== Internals ====================

    fn is_transactional(&self) -> bool {
        matches!(self.binding, Binding::Transaction { .. })
    }

    fn bound(&self) -> MemoryResult<(&Arc<Connection>, Ulid)> {
        match &self.binding {
            Binding::Transaction { conn, id } => Ok((conn, *id)),
            _ => Err(MemoryError::NoTransaction),
        }
    }

    /// Run `f` against the bound transaction and the committed tables.
    fn with_tx<R>(
        &self,
        f: impl FnOnce(&mut OpenTransaction, &Tables) -> MemoryResult<R>,
    ) -> MemoryResult<R> {
        let (conn, id) = self.bound()?;
        let mut slot = conn.tx.lock();
        let tx = slot
            .as_mut()
            .filter(|tx| tx.id() == id)
            .ok_or(MemoryError::NoTransaction)?;
        let committed = self.db.shared.tables.read();
        f(tx, &*committed)
    }

    /// Detach the bound transaction from its connection.
    fn take(&self) -> MemoryResult<OpenTransaction> {
        let (conn, id) = self.bound()?;
        let mut slot = conn.tx.lock();
        if slot.as_ref().map(OpenTransaction::id) != Some(id) {
            return Err(MemoryError::NoTransaction);
        }
        slot.take().ok_or(MemoryError::NoTransaction)
    }
}

impl Session for MemorySession {
    type Error = MemoryError;

    fn begin(&self, cancel: &Cancellation, options: &ResolvedOptions) -> MemoryResult<Self> {
        self.db.injected(FailPoint::Begin)?;
        cancel.check()?;

        let conn = match &self.binding {
            Binding::Pool => Arc::new(self.db.shared.pool.get(cancel)?),
            Binding::Pinned(conn) => conn.clone(),
            Binding::Transaction { .. } => return Err(MemoryError::AlreadyInTransaction),
        };

        let id = {
            let mut slot = conn.tx.lock();
            if slot.is_some() {
                return Err(MemoryError::AlreadyInTransaction);
            }
            let tx = OpenTransaction::begin(options, &self.db.shared.tables.read());
            let id = tx.id();
            *slot = Some(tx);
            id
        };

        self.db.record(|stats| stats.begun += 1);
        tracing::debug!(tx = %id, connection = conn.id(), isolation = ?options.isolation, "memory transaction begun");
        Ok(Self {
            db: self.db.clone(),
            binding: Binding::Transaction { conn, id },
        })
    }

    fn commit(&self, cancel: &Cancellation) -> MemoryResult<()> {
        let tx = self.take()?;
        let id = tx.id();

        let ready = cancel
            .check()
            .map_err(MemoryError::from)
            .and_then(|()| self.db.injected(FailPoint::Commit));
        if let Err(err) = ready {
            // the transaction is gone either way
            self.db.record(|stats| stats.rolled_back += 1);
            tracing::debug!(tx = %id, error = %err, "memory commit failed, transaction discarded");
            return Err(err);
        }

        let applied = tx.apply(&mut self.db.shared.tables.write());
        self.db.record(|stats| stats.committed += 1);
        tracing::debug!(tx = %id, writes = applied, "memory transaction committed");
        Ok(())
    }

    fn rollback(&self, _cancel: &Cancellation) -> MemoryResult<()> {
        let tx = self.take()?;
        self.db.record(|stats| stats.rolled_back += 1);
        tracing::debug!(tx = %tx.id(), "memory transaction rolled back");
        Ok(())
    }

    fn savepoint(&self, cancel: &Cancellation, name: &str) -> MemoryResult<()> {
        self.db.injected(FailPoint::Savepoint)?;
        cancel.check()?;
        self.with_tx(|tx, _| {
            tx.savepoint(name);
            Ok(())
        })?;
        self.db.record(|stats| stats.savepoints += 1);
        Ok(())
    }

    fn rollback_to_savepoint(&self, _cancel: &Cancellation, name: &str) -> MemoryResult<()> {
        self.db.injected(FailPoint::RollbackToSavepoint)?;
        self.with_tx(|tx, _| tx.rollback_to(name))?;
        self.db.record(|stats| stats.savepoint_rollbacks += 1);
        Ok(())
    }

    fn release_savepoint(&self, _cancel: &Cancellation, name: &str) -> MemoryResult<()> {
        self.with_tx(|tx, _| tx.release(name))
    }

    fn independent(&self, cancel: &Cancellation) -> MemoryResult<Self> {
        let conn = self.db.shared.pool.get(cancel)?;
        Ok(Self {
            db: self.db.clone(),
            binding: Binding::Pinned(Arc::new(conn)),
        })
    }

    fn transaction_free(&self) -> Self {
        Self::pooled(self.db.clone())
    }
}

impl fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = match &self.binding {
            Binding::Pool => "pool",
            Binding::Pinned(_) => "pinned",
            Binding::Transaction { .. } => "transaction",
        };
        f.debug_struct("MemorySession")
            .field("binding", &binding)
            .field("connection", &self.connection_id())
            .finish()
    }
}
