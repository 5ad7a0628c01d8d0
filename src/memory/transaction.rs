//! Per-connection transaction state: a write buffer with savepoint marks.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use ulid::Ulid;

use crate::memory::error::{MemoryError, MemoryResult};
use crate::options::{IsolationLevel, ResolvedOptions};

pub(crate) type Table = BTreeMap<String, Value>;
pub(crate) type Tables = BTreeMap<String, Table>;

/// A buffered change, applied to committed data on commit.
#[derive(Debug, Clone)]
enum Write {
    Put { table: String, key: String, value: Value },
    Delete { table: String, key: String },
}

impl Write {
    fn targets(&self, table: &str, key: &str) -> bool {
        match self {
            Write::Put { table: t, key: k, .. } | Write::Delete { table: t, key: k } => {
                t == table && k == key
            }
        }
    }
}

/// Snapshot of an open transaction's metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionInfo {
    pub id: String,
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
    pub started_at: DateTime<Utc>,
    /// Open savepoints, oldest first.
    pub savepoints: Vec<String>,
}

/// An open transaction on one connection.
#[derive(Debug)]
pub(crate) struct OpenTransaction {
    id: Ulid,
    isolation: Option<IsolationLevel>,
    read_only: bool,
    started_at: DateTime<Utc>,
    /// Committed data as of begin, for isolation levels that read a snapshot.
    snapshot: Option<Tables>,
    writes: Vec<Write>,
    /// Savepoint names with the write-buffer length at creation.
    savepoints: Vec<(String, usize)>,
}

impl OpenTransaction {
    pub(crate) fn begin(options: &ResolvedOptions, committed: &Tables) -> Self {
        let snapshot = options
            .isolation
            .filter(IsolationLevel::uses_snapshot)
            .map(|_| committed.clone());
        Self {
            id: Ulid::new(),
            isolation: options.isolation,
            read_only: options.read_only.unwrap_or(false),
            started_at: Utc::now(),
            snapshot,
            writes: Vec::new(),
            savepoints: Vec::new(),
        }
    }

    pub(crate) fn id(&self) -> Ulid {
        self.id
    }

    pub(crate) fn info(&self) -> TransactionInfo {
        TransactionInfo {
            id: self.id.to_string(),
            isolation: self.isolation,
            read_only: self.read_only,
            started_at: self.started_at,
            savepoints: self.savepoints.iter().map(|(name, _)| name.clone()).collect(),
        }
    }

    fn base<'a>(&'a self, committed: &'a Tables) -> &'a Tables {
        self.snapshot.as_ref().unwrap_or(committed)
    }

    pub(crate) fn get(&self, committed: &Tables, table: &str, key: &str) -> Option<Value> {
        match self.writes.iter().rev().find(|w| w.targets(table, key)) {
            Some(Write::Put { value, .. }) => Some(value.clone()),
            Some(Write::Delete { .. }) => None,
            None => self
                .base(committed)
                .get(table)
                .and_then(|rows| rows.get(key))
                .cloned(),
        }
    }

    pub(crate) fn keys(&self, committed: &Tables, table: &str) -> Vec<String> {
        let mut keys: BTreeSet<String> = self
            .base(committed)
            .get(table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default();
        for write in self.writes.iter() {
            match write {
                Write::Put { table: t, key, .. } if t == table => {
                    keys.insert(key.clone());
                }
                Write::Delete { table: t, key } if t == table => {
                    keys.remove(key);
                }
                _ => {}
            }
        }
        keys.into_iter().collect()
    }

    fn writable(&self) -> MemoryResult<()> {
        if self.read_only {
            return Err(MemoryError::ReadOnly);
        }
        Ok(())
    }

    pub(crate) fn insert(
        &mut self,
        committed: &Tables,
        table: &str,
        key: &str,
        value: Value,
    ) -> MemoryResult<()> {
        self.writable()?;
        if self.get(committed, table, key).is_some() {
            return Err(MemoryError::row_exists(table, key));
        }
        self.put(table, key, value);
        Ok(())
    }

    pub(crate) fn upsert(&mut self, table: &str, key: &str, value: Value) -> MemoryResult<()> {
        self.writable()?;
        self.put(table, key, value);
        Ok(())
    }

    pub(crate) fn delete(&mut self, committed: &Tables, table: &str, key: &str) -> MemoryResult<()> {
        self.writable()?;
        if self.get(committed, table, key).is_none() {
            return Err(MemoryError::row_missing(table, key));
        }
        self.writes.push(Write::Delete {
            table: table.to_string(),
            key: key.to_string(),
        });
        Ok(())
    }

    fn put(&mut self, table: &str, key: &str, value: Value) {
        self.writes.push(Write::Put {
            table: table.to_string(),
            key: key.to_string(),
            value,
        });
    }

    pub(crate) fn savepoint(&mut self, name: &str) {
        self.savepoints.push((name.to_string(), self.writes.len()));
    }

    fn find_savepoint(&self, name: &str) -> MemoryResult<usize> {
        self.savepoints
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| MemoryError::SavepointNotFound(name.to_string()))
    }

    /// Discard writes made after `name`. The savepoint itself stays open.
    pub(crate) fn rollback_to(&mut self, name: &str) -> MemoryResult<()> {
        let index = self.find_savepoint(name)?;
        let mark = self.savepoints[index].1;
        self.writes.truncate(mark);
        self.savepoints.truncate(index + 1);
        Ok(())
    }

    /// Forget `name` and every savepoint created after it, keeping the writes.
    pub(crate) fn release(&mut self, name: &str) -> MemoryResult<()> {
        let index = self.find_savepoint(name)?;
        self.savepoints.truncate(index);
        Ok(())
    }

    /// Apply the buffered writes to `committed`. Returns the number applied.
    pub(crate) fn apply(self, committed: &mut Tables) -> usize {
        let applied = self.writes.len();
        for write in self.writes {
            match write {
                Write::Put { table, key, value } => {
                    committed.entry(table).or_default().insert(key, value);
                }
                Write::Delete { table, key } => {
                    if let Some(rows) = committed.get_mut(&table) {
                        rows.remove(&key);
                    }
                }
            }
        }
        applied
    }
}
