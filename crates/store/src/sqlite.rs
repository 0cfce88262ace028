//! SQLite-backed store, the durable backend for node state.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::kv::{BatchOp, KeyValueStore, WriteBatch};

/// Key-value store persisted in a single SQLite table.
///
/// The connection sits behind a mutex so the store can be shared across
/// worker tasks; every batch commit runs inside one SQLite transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the store at `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// Opens a store that lives only in memory, for tests and tooling.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key BLOB PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )?;
        debug!("sqlite store ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl KeyValueStore for SqliteStore {
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        let found = self
            .lock()?
            .query_row(
                "SELECT 1 FROM kv_store WHERE key = ?1",
                [key],
                |_row| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.lock()?
            .execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }

    fn commit(&self, batch: &WriteBatch) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for op in batch.ops() {
            match op {
                BatchOp::Put { key, value } => {
                    tx.execute(
                        "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?1, ?2)",
                        rusqlite::params![key, value],
                    )?;
                }
                BatchOp::Delete { key } => {
                    tx.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
                }
            }
        }
        tx.commit()?;
        debug!(ops = batch.len(), "batch committed");
        Ok(())
    }
}
