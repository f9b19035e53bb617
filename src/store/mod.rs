//! Persistent key-value store
//!
//! Resource sets and restrict-content challenges are kept as opaque JSON
//! values keyed by string. Writes replace the whole value, so concurrent
//! writers resolve to last-writer-wins.

pub mod key;
pub mod sqlite;

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::StoreError;

pub use sqlite::SqliteStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Host option store
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or replace a value
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a value, returning whether it existed
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// List keys starting with `prefix`
    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Remove every entry
    fn clear(&self) -> StoreResult<ClearStats>;

    /// Summary of stored entries
    fn stats(&self) -> StoreResult<StoreStats>;
}

/// Statistics about a clear operation
#[derive(Debug)]
pub struct ClearStats {
    pub entries_removed: usize,
}

/// Statistics about store state
#[derive(Debug, Default)]
pub struct StoreStats {
    pub total_entries: usize,
    pub resource_sets: usize,
    pub pending_challenges: usize,
    pub total_size_bytes: usize,
    pub oldest_update: Option<i64>,
    pub newest_update: Option<i64>,
}

/// Read and deserialize a JSON value
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> StoreResult<Option<T>> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Serialize and write a JSON value
pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> StoreResult<()> {
    let raw = serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, &raw)
}

/// In-process store used by tests and `--store :memory:`
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, (String, i64)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, BTreeMap<String, (String, i64)>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock()?.get(key).map(|(value, _)| value.clone()))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock()?
            .insert(key.to_string(), (value.to_string(), Utc::now().timestamp()));
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn clear(&self) -> StoreResult<ClearStats> {
        let mut entries = self.lock()?;
        let entries_removed = entries.len();
        entries.clear();
        Ok(ClearStats { entries_removed })
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        let entries = self.lock()?;
        let mut stats = StoreStats {
            total_entries: entries.len(),
            ..StoreStats::default()
        };
        for (k, (value, updated)) in entries.iter() {
            stats.total_size_bytes += value.len();
            if k.starts_with(key::RESOURCE_PREFIX) {
                stats.resource_sets += 1;
            } else if k.starts_with(key::CHALLENGE_PREFIX) {
                stats.pending_challenges += 1;
            }
            stats.oldest_update = Some(stats.oldest_update.map_or(*updated, |o| o.min(*updated)));
            stats.newest_update = Some(stats.newest_update.map_or(*updated, |n| n.max(*updated)));
        }
        Ok(stats)
    }
}
