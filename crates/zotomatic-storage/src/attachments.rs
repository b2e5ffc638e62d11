use rusqlite::{params, OptionalExtension};

use crate::{StateStore, StorageError};
use zotomatic_core::ZoteroAttachmentState;

impl StateStore {
    pub fn upsert_attachment(&self, state: &ZoteroAttachmentState) -> Result<(), StorageError> {
        let key = state.file_path.to_string_lossy().into_owned();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO attachments (file_path, attachment_key, parent_key)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(file_path) DO UPDATE SET
                     attachment_key = excluded.attachment_key,
                     parent_key = excluded.parent_key",
                params![key, state.attachment_key, state.parent_key],
            )?;
            Ok(())
        })
    }

    pub fn get_attachment(
        &self,
        file_path: impl AsRef<std::path::Path>,
    ) -> Result<Option<ZoteroAttachmentState>, StorageError> {
        let key = file_path.as_ref().to_string_lossy().into_owned();
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT file_path, attachment_key, parent_key FROM attachments WHERE file_path = ?1",
                params![key],
                |row| {
                    let path_str: String = row.get(0)?;
                    Ok(ZoteroAttachmentState {
                        file_path: path_str.into(),
                        attachment_key: row.get(1)?,
                        parent_key: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }
}
