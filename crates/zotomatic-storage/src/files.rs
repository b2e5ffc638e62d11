use rusqlite::{params, OptionalExtension};

use crate::{StateStore, StorageError};
use zotomatic_core::FileState;

impl StateStore {
    /// Insert or replace the tracked state for a file.
    pub fn upsert_file(&self, state: &FileState) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO files (file_path, mtime_ns, size, sha1, last_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(file_path) DO UPDATE SET
                     mtime_ns = excluded.mtime_ns,
                     size = excluded.size,
                     sha1 = excluded.sha1,
                     last_seen_at = excluded.last_seen_at",
                params![
                    path_key(&state.file_path),
                    state.mtime_ns,
                    state.size,
                    state.sha1,
                    state.last_seen_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_file(&self, file_path: impl AsRef<std::path::Path>) -> Result<Option<FileState>, StorageError> {
        let key = path_key(file_path.as_ref());
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT file_path, mtime_ns, size, sha1, last_seen_at FROM files WHERE file_path = ?1",
                params![key],
                row_to_file_state,
            )
            .optional()
        })
    }

    pub fn remove_file(&self, file_path: impl AsRef<std::path::Path>) -> Result<(), StorageError> {
        let key = path_key(file_path.as_ref());
        self.with_conn(|conn| {
            conn.execute("DELETE FROM files WHERE file_path = ?1", params![key])?;
            Ok(())
        })
    }

    pub fn count_files(&self) -> Result<i64, StorageError> {
        self.with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0)))
    }

    pub fn list_files(&self, limit: Option<usize>) -> Result<Vec<FileState>, StorageError> {
        self.with_conn(|conn| {
            let sql = match limit {
                Some(n) => format!(
                    "SELECT file_path, mtime_ns, size, sha1, last_seen_at FROM files ORDER BY last_seen_at DESC LIMIT {n}"
                ),
                None => "SELECT file_path, mtime_ns, size, sha1, last_seen_at FROM files ORDER BY last_seen_at DESC".to_string(),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_file_state)?;
            rows.collect()
        })
    }
}

fn path_key(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

fn row_to_file_state(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileState> {
    let path_str: String = row.get(0)?;
    Ok(FileState {
        file_path: path_str.into(),
        mtime_ns: row.get(1)?,
        size: row.get(2)?,
        sha1: row.get(3)?,
        last_seen_at: row.get(4)?,
    })
}
