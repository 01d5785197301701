//! Connection store
//!
//! Maps every observed connection to its [`Estats`] aggregate. The store lock
//! only guards the top-level map: it is held for get-or-create and released
//! before any table is touched. Tables are always locked after the store,
//! never the other way around.

use crate::error::EstatsError;
use crate::estats::Estats;
use crate::record::Record;
use crate::types::{Category, ConnectionExport, ConnectionKey, TablesExport};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Store of per-connection aggregates
#[derive(Default)]
pub struct EstatsDb {
    connections: RwLock<HashMap<ConnectionKey, Arc<Estats>>>,
}

/// Point-in-time copy of the store
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// When the store lock was taken
    pub taken_at: DateTime<Utc>,
    /// Connections ordered by key
    pub connections: Vec<(ConnectionKey, TablesExport)>,
}

impl Snapshot {
    /// Shape used by the structured export
    pub fn to_export(&self) -> Vec<ConnectionExport> {
        self.connections
            .iter()
            .map(|(key, tables)| ConnectionExport {
                saddr: key.source(),
                daddr: key.destination(),
                tables: tables.clone(),
            })
            .collect()
    }
}

impl EstatsDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate for `key`, created on first use
    ///
    /// Lookup and insert happen under one write lock, so concurrent callers
    /// racing on a new key all get the same instance.
    pub fn get_or_create(&self, key: ConnectionKey) -> Arc<Estats> {
        let mut connections = self.connections.write();
        Arc::clone(
            connections
                .entry(key)
                .or_insert_with(|| Arc::new(Estats::new())),
        )
    }

    /// Aggregate for `key` if one exists
    pub fn get(&self, key: &ConnectionKey) -> Option<Arc<Estats>> {
        self.connections.read().get(key).cloned()
    }

    /// Number of tracked connections
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply one record to the table of `category`
    ///
    /// # Returns
    ///
    /// The variable's value after the merge
    pub fn ingest(&self, category: Category, record: &Record) -> Result<u32, EstatsError> {
        let estats = self.get_or_create(record.key);
        estats.apply(category, record.op, record.var, record.val)
    }

    /// Consistent copy of every connection
    ///
    /// The store lock is held for the whole traversal, so no connection can be
    /// added while the copy is taken.
    pub fn snapshot(&self) -> Snapshot {
        let connections = self.connections.read();
        let taken_at = Utc::now();

        let mut copied: Vec<(ConnectionKey, TablesExport)> = connections
            .iter()
            .map(|(key, estats)| (*key, estats.snapshot()))
            .collect();
        drop(connections);

        copied.sort_by(|a, b| a.0.cmp(&b.0));

        Snapshot {
            taken_at,
            connections: copied,
        }
    }
}
