use rusqlite::{params, OptionalExtension};

use crate::{StateStore, StorageError};
use zotomatic_core::DirectoryState;

impl StateStore {
    pub fn upsert_directory(&self, state: &DirectoryState) -> Result<(), StorageError> {
        let key = state.directory.to_string_lossy().into_owned();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO directories (directory, last_scan_at) VALUES (?1, ?2)
                 ON CONFLICT(directory) DO UPDATE SET last_scan_at = excluded.last_scan_at",
                params![key, state.last_scan_at],
            )?;
            Ok(())
        })
    }

    pub fn get_directory(
        &self,
        directory: impl AsRef<std::path::Path>,
    ) -> Result<Option<DirectoryState>, StorageError> {
        let key = directory.as_ref().to_string_lossy().into_owned();
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT directory, last_scan_at FROM directories WHERE directory = ?1",
                params![key],
                |row| {
                    let path_str: String = row.get(0)?;
                    Ok(DirectoryState {
                        directory: path_str.into(),
                        last_scan_at: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }
}
