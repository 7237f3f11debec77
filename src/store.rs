use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::StoreError;
use crate::ports::Storage;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS records (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"#;

/// SQLite-backed key/value store holding one JSON document per key
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the store at the default location, creating it if needed
    pub fn new() -> Result<Self, StoreError> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("edututor.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute(SCHEMA, [])?;
        tracing::debug!(path = %path.display(), "opened record store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn })
    }

    /// Every stored key, sorted
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT key FROM records ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM records WHERE key = ?1", [key])?;
        Ok(())
    }
}

impl Storage for SqliteStore {
    fn save(&self, key: &str, record: &Value) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record)?;
        self.conn.execute(
            r#"
            INSERT INTO records (key, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, payload],
        )?;
        Ok(())
    }

    fn load(&self, key: &str) -> Option<Value> {
        let raw: Option<String> = match self
            .conn
            .query_row("SELECT value FROM records WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read record");
                None
            }
        };

        raw.and_then(|text| match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed record");
                None
            }
        })
    }
}

/// In-process store, used when no database can be opened and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl Storage for MemoryStore {
    fn save(&self, key: &str, record: &Value) -> Result<(), StoreError> {
        self.records
            .borrow_mut()
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> Option<Value> {
        self.records.borrow().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn save_then_load() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save("quiz_history", &json!([{"score": 80}])).unwrap();

        assert_eq!(store.load("quiz_history"), Some(json!([{"score": 80}])));
        assert_eq!(store.load("missing"), None);
    }

    #[test]
    fn save_overwrites_existing_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save("k", &json!(1)).unwrap();
        store.save("k", &json!(2)).unwrap();

        assert_eq!(store.load("k"), Some(json!(2)));
        assert_eq!(store.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn malformed_payload_reads_as_absent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO records (key, value) VALUES ('broken', '{not json')",
                [],
            )
            .unwrap();

        assert_eq!(store.load("broken"), None);
    }

    #[test]
    fn remove_deletes_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save("a", &json!("x")).unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.load("a"), None);
    }

    #[test]
    fn file_store_persists_across_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("edututor.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save("scheduled_quizzes", &json!([])).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load("scheduled_quizzes"), Some(json!([])));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.save("k", &json!({"a": 1})).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("k"), Some(json!({"a": 1})));
    }
}
