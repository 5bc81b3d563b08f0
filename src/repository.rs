//! The persistent catalogue: one row per source-relative path,
//! recording its last hash, status, and update timestamp.
//!
//! Each worker thread gets its own dedicated `rusqlite::Connection`,
//! opened on first use and kept for the repository's lifetime. The
//! `ThreadId -> Connection` map lock is held only long enough to check
//! a connection out or back in; the store call itself runs with the
//! lock released, so one thread's query never blocks another's. WAL
//! mode lets readers (the sweep's `list_all`) proceed without blocking
//! on in-flight writers, and the busy timeout absorbs the brief
//! contention window around a writer's commit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::ThreadId;

use rusqlite::Connection;

use crate::error::{BackupError, Result};
use crate::model::{CatalogueEntry, ChangeStatus};

const BUSY_TIMEOUT_MS: u32 = 5_000;

enum Location {
    Path(PathBuf),
    #[cfg(test)]
    Memory,
}

pub struct StateRepository {
    location: Location,
    connections: Mutex<HashMap<ThreadId, Connection>>,
}

impl StateRepository {
    pub fn open(path: &Path) -> Self {
        Self {
            location: Location::Path(path.to_path_buf()),
            connections: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Self {
        Self {
            location: Location::Memory,
            connections: Mutex::new(HashMap::new()),
        }
    }

    fn open_connection(&self) -> rusqlite::Result<Connection> {
        let conn = match &self.location {
            Location::Path(path) => Connection::open(path)?,
            #[cfg(test)]
            Location::Memory => Connection::open_in_memory()?,
        };
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS as u64))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(conn)
    }

    /// Idempotent: creates the `files` table if it doesn't already
    /// exist. Must succeed before any other call, or the run fails
    /// immediately with no catalogue side effects.
    pub fn initialize_schema(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS files (
                    path         TEXT PRIMARY KEY,
                    hash         TEXT NOT NULL,
                    last_updated TEXT NOT NULL,
                    status       TEXT NOT NULL
                )",
                [],
            )
            .map(|_| ())
        })
        .map_err(BackupError::SchemaInit)
    }

    /// Checks this thread's connection out of the map, runs `f` with
    /// the map lock released, then checks it back in. A store call
    /// never runs while holding the map lock, so concurrent workers
    /// never contend on anything but the brief checkout/checkin itself.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> rusqlite::Result<T> {
        let id = std::thread::current().id();

        let conn = {
            let mut guard = self.connections.lock().expect("connection map poisoned");
            match guard.remove(&id) {
                Some(conn) => conn,
                None => self.open_connection()?,
            }
        };

        let result = f(&conn);

        let mut guard = self.connections.lock().expect("connection map poisoned");
        guard.insert(id, conn);

        result
    }

    /// Atomic insert-or-replace by `path`.
    pub fn upsert(&self, path: &str, hash: &str, status: ChangeStatus, timestamp: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO files (path, hash, last_updated, status)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(path) DO UPDATE SET
                    hash = excluded.hash,
                    last_updated = excluded.last_updated,
                    status = excluded.status",
                rusqlite::params![path, hash, timestamp, status.as_str()],
            )
            .map(|_| ())
        })
        .map_err(|source| BackupError::Catalogue {
            path: path.to_string(),
            source,
        })
    }

    /// Returns the current entry for `path`, if present.
    pub fn get(&self, path: &str) -> Result<Option<CatalogueEntry>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT path, hash, last_updated, status FROM files WHERE path = ?1",
                [path],
                |row| {
                    Ok(CatalogueEntry {
                        path: row.get(0)?,
                        hash: row.get(1)?,
                        last_updated: row.get(2)?,
                        status: ChangeStatus::from_str_permissive(&row.get::<_, String>(3)?),
                    })
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
        })
        .map_err(|source| BackupError::Catalogue {
            path: path.to_string(),
            source,
        })
    }

    /// Snapshot-read of every catalogue entry. Under WAL mode this
    /// read is isolated from concurrent upserts made by other workers
    /// for its whole duration.
    pub fn list_all(&self) -> Result<Vec<CatalogueEntry>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT path, hash, last_updated, status FROM files")?;
            let rows = stmt.query_map([], |row| {
                Ok(CatalogueEntry {
                    path: row.get(0)?,
                    hash: row.get(1)?,
                    last_updated: row.get(2)?,
                    status: ChangeStatus::from_str_permissive(&row.get::<_, String>(3)?),
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .map_err(|source| BackupError::Catalogue {
            path: "<list_all>".to_string(),
            source,
        })
    }

    /// Sets `status = Deleted` and `last_updated = timestamp`,
    /// preserving the previously recorded hash.
    pub fn mark_deleted(&self, path: &str, timestamp: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE files SET status = ?1, last_updated = ?2 WHERE path = ?3",
                rusqlite::params![ChangeStatus::Deleted.as_str(), timestamp, path],
            )
            .map(|_| ())
        })
        .map_err(|source| BackupError::Catalogue {
            path: path.to_string(),
            source,
        })
    }

    #[cfg(test)]
    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }
}
