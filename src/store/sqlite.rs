//! SQLite-backed option store

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{ClearStats, KeyValueStore, StoreResult, StoreStats, key};
use crate::error::StoreError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// SQLite option table, one row per key
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store at the default XDG cache location
    pub fn open() -> StoreResult<Self> {
        let dir = Self::store_dir()?;
        Self::open_at(&dir)
    }

    /// Get the store directory path (~/.cache/kitgate on Linux)
    pub fn store_dir() -> StoreResult<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(StoreError::NoHome)?;
        Ok(cache_base.join("kitgate"))
    }

    /// Open the store inside a specific directory
    pub fn open_at(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create store dir: {}", e)))?;

        let db_path = dir.join("store.db");
        let conn = Connection::open(&db_path)?;

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Store schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| StoreError::Io(format!("Failed to remove store DB: {}", e)))?;
            return Self::open_at(dir);
        }

        Self::init(conn)
    }

    /// Open a throwaway in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS options (
                option_key TEXT PRIMARY KEY NOT NULL,
                option_value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_updated_at ON options(updated_at);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store connection lock poisoned".to_string()))
    }

    fn count_prefix(conn: &Connection, prefix: &str) -> StoreResult<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM options WHERE substr(option_key, 1, ?2) = ?1",
            params![prefix, prefix.len() as i64],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT option_value FROM options WHERE option_key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO options (option_key, option_value, updated_at)
             VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM options WHERE option_key = ?1", [key])?;
        Ok(deleted > 0)
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        // substr comparison avoids LIKE wildcards in keys
        let mut stmt = conn.prepare(
            "SELECT option_key FROM options WHERE substr(option_key, 1, ?2) = ?1
             ORDER BY option_key",
        )?;
        let keys = stmt
            .query_map(params![prefix, prefix.len() as i64], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn clear(&self) -> StoreResult<ClearStats> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM options", [], |r| r.get(0))?;
        conn.execute("DELETE FROM options", [])?;
        Ok(ClearStats {
            entries_removed: count as usize,
        })
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        let conn = self.conn()?;

        let total_entries: i64 = conn.query_row("SELECT COUNT(*) FROM options", [], |r| r.get(0))?;

        let total_size: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(option_value)), 0) FROM options",
            [],
            |r| r.get(0),
        )?;

        let (oldest, newest): (Option<i64>, Option<i64>) = conn.query_row(
            "SELECT MIN(updated_at), MAX(updated_at) FROM options",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok(StoreStats {
            total_entries: total_entries as usize,
            resource_sets: Self::count_prefix(&conn, key::RESOURCE_PREFIX)?,
            pending_challenges: Self::count_prefix(&conn, key::CHALLENGE_PREFIX)?,
            total_size_bytes: total_size as usize,
            oldest_update: oldest,
            newest_update: newest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open_at(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_set_get() {
        let (store, _dir) = test_store();
        store.set("kitgate_resource_tags", "[1,2,3]").unwrap();

        assert_eq!(
            store.get("kitgate_resource_tags").unwrap(),
            Some("[1,2,3]".to_string())
        );
    }

    #[test]
    fn test_set_replaces_value() {
        let (store, _dir) = test_store();
        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();

        assert_eq!(store.get("k").unwrap(), Some("second".to_string()));
        assert_eq!(store.stats().unwrap().total_entries, 1);
    }

    #[test]
    fn test_delete() {
        let (store, _dir) = test_store();
        store.set("k", "v").unwrap();

        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_keys_prefix_is_literal() {
        let (store, _dir) = test_store();
        store.set("kitgate_challenge_a", "{}").unwrap();
        store.set("kitgate_challenge_b", "{}").unwrap();
        store.set("kitgateXchallenge_c", "{}").unwrap();

        let keys = store.keys(key::CHALLENGE_PREFIX).unwrap();
        assert_eq!(keys, vec!["kitgate_challenge_a", "kitgate_challenge_b"]);
    }

    #[test]
    fn test_clear_and_stats() {
        let (store, _dir) = test_store();
        store.set("kitgate_resource_forms", "[]").unwrap();
        store.set("kitgate_challenge_x", "{}").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.resource_sets, 1);
        assert_eq!(stats.pending_challenges, 1);
        assert!(stats.total_size_bytes > 0);
        assert!(stats.newest_update.is_some());

        assert_eq!(store.clear().unwrap().entries_removed, 2);
        assert_eq!(store.stats().unwrap().total_entries, 0);
    }

    #[test]
    fn test_reopen_persists() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteStore::open_at(dir.path()).unwrap();
            store.set("k", "v").unwrap();
        }
        let store = SqliteStore::open_at(dir.path()).unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_in_memory() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
    }
}
