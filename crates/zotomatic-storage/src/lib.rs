//! `C1`: the durable, single-writer state store.
//!
//! Backed by `rusqlite` in WAL mode, the way `crucible-sqlite` wraps a
//! single `Connection` behind a mutex instead of pulling in a connection
//! pool. A second, unguarded read-only connection is available via
//! [`StateStore::reader`] for short ad-hoc queries (`spec.md` §4.1).
//!
//! Every multi-statement operation runs inside a `rusqlite::Transaction`;
//! dropping it without `commit()` rolls it back, so a `StorageError` bubbling
//! out of an operation never leaves a partial write behind.

mod attachments;
mod directories;
mod error;
mod files;
mod meta;
mod pending;

pub use error::StorageError;
pub use zotomatic_core::{DirectoryState, FileState, PendingEntry, ZoteroAttachmentState};

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};

const SCHEMA: &str = include_str!("schema.sql");

/// Handle to the state database. Cheap to clone — the connection is shared
/// behind an `Arc<Mutex<_>>`, matching `crucible-sqlite`'s choice to avoid
/// a connection pool.
#[derive(Clone)]
pub struct StateStore {
    conn: Arc<Mutex<Connection>>,
    path: std::path::PathBuf,
}

impl StateStore {
    /// Opens (creating if necessary) the database at `path`, applying the
    /// embedded schema. Re-open is a no-op: every `CREATE TABLE` is
    /// `IF NOT EXISTS`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            path: path.display().to_string(),
            source,
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        })
    }

    /// In-memory store, for tests and short-lived tooling.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: std::path::PathBuf::from(":memory:"),
        })
    }

    /// A fresh read-only connection to the same on-disk database, for
    /// queries that don't need to serialize behind the writer (e.g. CLI
    /// `stats`). Not available for `:memory:` stores.
    pub fn reader(&self) -> Result<Connection, StorageError> {
        Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |source| StorageError::Open {
                path: self.path.display().to_string(),
                source,
            },
        )
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StorageError> {
        let conn = self.conn.lock();
        f(&conn).map_err(StorageError::from)
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_creates_all_tables() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                for table in ["files", "pending", "directories", "attachments", "meta"] {
                    conn.execute(&format!("SELECT 1 FROM {table} WHERE 0"), [])?;
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn reopen_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zotomatic.db");
        let store = StateStore::open(&path).unwrap();
        store
            .upsert_file(&FileState {
                file_path: "/a.pdf".into(),
                mtime_ns: 1,
                size: 2,
                sha1: None,
                last_seen_at: 3,
            })
            .unwrap();
        drop(store);

        let reopened = StateStore::open(&path).unwrap();
        let got = reopened.get_file("/a.pdf").unwrap().unwrap();
        assert_eq!(got.size, 2);
    }
}
