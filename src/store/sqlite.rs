//! SQLite record store

use super::RecordStore;
use crate::error::{Result, SyncError};
use crate::ticket::{Direction, RecordKey, StoredRecord, TicketEvent};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to SQLite database file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Enable WAL mode for better concurrency
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

fn default_store_path() -> PathBuf {
    crate::config::config_dir().join("records.db")
}

fn default_wal_mode() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

/// Records of one direction in a SQLite database
///
/// Both directions can share a file; rows are scoped by direction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    scope: Direction,
    path: PathBuf,
}

fn read_err(e: impl std::fmt::Display) -> SyncError {
    SyncError::StoreRead(e.to_string())
}

fn write_err(e: impl std::fmt::Display) -> SyncError {
    SyncError::StoreWrite(e.to_string())
}

impl SqliteStore {
    /// Open or create a record database
    pub fn open(config: &StoreConfig, scope: Direction) -> Result<Self> {
        // Create parent directory if needed
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %config.path.display(), scope = %scope, "Opening record database");

        let conn = Connection::open(&config.path).map_err(read_err)?;

        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(write_err)?;
        }

        let store = Self {
            conn: Mutex::new(conn),
            scope,
            path: config.path.clone(),
        };
        store.init_schema()?;

        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.lock_write()?
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS records (
                    scope TEXT NOT NULL,
                    local_id TEXT NOT NULL,
                    comment_id TEXT NOT NULL,
                    remote_id TEXT NOT NULL,
                    event TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (scope, local_id, comment_id)
                );
                "#,
            )
            .map_err(write_err)
    }

    fn lock_read(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SyncError::StoreRead("connection lock poisoned".to_string()))
    }

    fn lock_write(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SyncError::StoreWrite("connection lock poisoned".to_string()))
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scope(&self) -> Direction {
        self.scope
    }

    /// Number of rows in this store's scope
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .lock_read()?
            .query_row(
                "SELECT COUNT(*) FROM records WHERE scope = ?",
                params![self.scope.as_str()],
                |row| row.get(0),
            )
            .map_err(read_err)?;
        Ok(count as usize)
    }
}

type RawRow = (String, String, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode((remote_id, event, updated_at): RawRow) -> Result<StoredRecord> {
    let event: TicketEvent = serde_json::from_str(&event).map_err(read_err)?;
    Ok(StoredRecord {
        event,
        remote_id,
        updated_at,
    })
}

impl RecordStore for SqliteStore {
    fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>> {
        let raw = self
            .lock_read()?
            .query_row(
                r#"
                SELECT remote_id, event, updated_at FROM records
                WHERE scope = ? AND local_id = ? AND comment_id = ?
                "#,
                params![self.scope.as_str(), &key.local_id, &key.comment_id],
                raw_row,
            )
            .optional()
            .map_err(read_err)?;

        raw.map(decode).transpose()
    }

    fn query_partition(&self, local_id: &str) -> Result<Vec<StoredRecord>> {
        let conn = self.lock_read()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT remote_id, event, updated_at FROM records
                WHERE scope = ? AND local_id = ?
                ORDER BY comment_id ASC
                "#,
            )
            .map_err(read_err)?;

        let rows = stmt
            .query_map(params![self.scope.as_str(), local_id], raw_row)
            .map_err(read_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode(row.map_err(read_err)?)?);
        }
        Ok(records)
    }

    fn put(&self, record: &StoredRecord) -> Result<()> {
        let event = serde_json::to_string(&record.event).map_err(write_err)?;

        self.lock_write()?
            .execute(
                r#"
                INSERT OR REPLACE INTO records
                    (scope, local_id, comment_id, remote_id, event, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![
                    self.scope.as_str(),
                    &record.event.local_id,
                    &record.event.comment_id,
                    &record.remote_id,
                    event,
                    &record.updated_at,
                ],
            )
            .map_err(write_err)?;

        tracing::debug!(scope = %self.scope, key = %record.key(), "Stored record");
        Ok(())
    }
}
