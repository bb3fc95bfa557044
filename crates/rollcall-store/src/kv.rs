//! Named-record persistence backends.
//!
//! Every collection lives under a single key and is rewritten whole.
//! `commit` applies a batch of writes atomically so multi-key operations
//! (seeding, reset, clear) either land completely or not at all.

use crate::error::{Result, StoreError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// A single write in a [`KvBackend::commit`] batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    Set { key: String, value: Vec<u8> },
    Delete { key: String },
}

impl KvOp {
    pub fn set(key: &str, value: Vec<u8>) -> Self {
        Self::Set {
            key: key.to_string(),
            value,
        }
    }

    pub fn delete(key: &str) -> Self {
        Self::Delete {
            key: key.to_string(),
        }
    }
}

/// Opaque key-value storage with atomic batch writes.
pub trait KvBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Apply all operations or none of them.
    fn commit(&self, ops: &[KvOp]) -> Result<()>;

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.commit(&[KvOp::set(key, value)])
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.commit(&[KvOp::delete(key)])
    }
}

/// Process-local backend. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("memory backend lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn commit(&self, ops: &[KvOp]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("memory backend lock poisoned".into()))?;
        for op in ops {
            match op {
                KvOp::Set { key, value } => {
                    entries.insert(key.clone(), value.clone());
                }
                KvOp::Delete { key } => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}

/// SQLite-backed store: one `kv` row per named record, batches in a transaction.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database file, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY NOT NULL,
                value      BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KvBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Storage("sqlite connection lock poisoned".into()))?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn commit(&self, ops: &[KvOp]) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Storage("sqlite connection lock poisoned".into()))?;
        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        for op in ops {
            match op {
                KvOp::Set { key, value } => {
                    tx.execute(
                        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                        updated_at = excluded.updated_at",
                        params![key, value, now],
                    )?;
                }
                KvOp::Delete { key } => {
                    tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}
