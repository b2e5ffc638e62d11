use rusqlite::{params, OptionalExtension};

use crate::{StateStore, StorageError};
use zotomatic_core::PendingEntry;

impl StateStore {
    /// Adds `file_path` to the pending queue if it isn't already there.
    /// Re-enqueuing an already-pending file is a no-op (`spec.md` §4.1,
    /// dedup invariant) — use [`StateStore::update_attempt`] to reschedule.
    pub fn enqueue_pending(&self, file_path: impl AsRef<std::path::Path>, now: i64) -> Result<(), StorageError> {
        let key = path_key(file_path.as_ref());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pending (file_path, attempt_count, next_attempt_at, last_error, enqueued_at)
                 VALUES (?1, 0, ?2, NULL, ?2)
                 ON CONFLICT(file_path) DO NOTHING",
                params![key, now],
            )?;
            Ok(())
        })
    }

    /// Entries due for retry at or before `now`, oldest-due first, capped
    /// at `limit` (the pending batch limit from config).
    pub fn get_due_pending(&self, now: i64, limit: usize) -> Result<Vec<PendingEntry>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT file_path, attempt_count, next_attempt_at, last_error, enqueued_at
                 FROM pending
                 WHERE next_attempt_at <= ?1
                 ORDER BY next_attempt_at ASC, enqueued_at ASC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![now, limit as i64], row_to_pending_entry)?;
            rows.collect()
        })
    }

    pub fn get_pending(&self, file_path: impl AsRef<std::path::Path>) -> Result<Option<PendingEntry>, StorageError> {
        let key = path_key(file_path.as_ref());
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT file_path, attempt_count, next_attempt_at, last_error, enqueued_at
                 FROM pending WHERE file_path = ?1",
                params![key],
                row_to_pending_entry,
            )
            .optional()
        })
    }

    /// Records a failed resolution attempt, advancing the backoff clock.
    /// Callers compute `next_attempt_at` via the exponential backoff formula
    /// (`spec.md` §4.8); this just persists the new attempt state.
    pub fn update_pending_attempt(
        &self,
        file_path: impl AsRef<std::path::Path>,
        attempt_count: u32,
        next_attempt_at: i64,
        last_error: Option<&str>,
    ) -> Result<(), StorageError> {
        let key = path_key(file_path.as_ref());
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE pending SET attempt_count = ?2, next_attempt_at = ?3, last_error = ?4
                 WHERE file_path = ?1",
                params![key, attempt_count, next_attempt_at, last_error],
            )?;
            Ok(())
        })
    }

    /// Removes `file_path` from the pending queue — either because it
    /// resolved successfully, or because it was dropped after exceeding
    /// `pending_max_attempts`.
    pub fn resolve_pending(&self, file_path: impl AsRef<std::path::Path>) -> Result<(), StorageError> {
        let key = path_key(file_path.as_ref());
        self.with_conn(|conn| {
            conn.execute("DELETE FROM pending WHERE file_path = ?1", params![key])?;
            Ok(())
        })
    }

    pub fn count_pending(&self) -> Result<i64, StorageError> {
        self.with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM pending", [], |row| row.get(0)))
    }

    pub fn list_pending(&self, limit: Option<usize>) -> Result<Vec<PendingEntry>, StorageError> {
        self.with_conn(|conn| {
            let sql = match limit {
                Some(n) => format!(
                    "SELECT file_path, attempt_count, next_attempt_at, last_error, enqueued_at
                     FROM pending ORDER BY next_attempt_at ASC, enqueued_at ASC LIMIT {n}"
                ),
                None => "SELECT file_path, attempt_count, next_attempt_at, last_error, enqueued_at
                         FROM pending ORDER BY next_attempt_at ASC, enqueued_at ASC"
                    .to_string(),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_pending_entry)?;
            rows.collect()
        })
    }
}

fn path_key(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

fn row_to_pending_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingEntry> {
    let path_str: String = row.get(0)?;
    Ok(PendingEntry {
        file_path: path_str.into(),
        attempt_count: row.get(1)?,
        next_attempt_at: row.get(2)?,
        last_error: row.get(3)?,
        enqueued_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_is_idempotent() {
        let store = StateStore::open_in_memory().unwrap();
        store.enqueue_pending("/a.pdf", 100).unwrap();
        store.enqueue_pending("/a.pdf", 200).unwrap();
        assert_eq!(store.count_pending().unwrap(), 1);
        assert_eq!(store.get_pending("/a.pdf").unwrap().unwrap().enqueued_at, 100);
    }

    #[test]
    fn get_due_pending_orders_oldest_first() {
        let store = StateStore::open_in_memory().unwrap();
        store.enqueue_pending("/later.pdf", 50).unwrap();
        store.enqueue_pending("/earlier.pdf", 10).unwrap();

        let due = store.get_due_pending(1000, 10).unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].file_path, std::path::PathBuf::from("/earlier.pdf"));
        assert_eq!(due[1].file_path, std::path::PathBuf::from("/later.pdf"));
    }

    #[test]
    fn get_due_pending_excludes_not_yet_due() {
        let store = StateStore::open_in_memory().unwrap();
        store.enqueue_pending("/a.pdf", 100).unwrap();
        store
            .update_pending_attempt("/a.pdf", 1, 9999, Some("boom"))
            .unwrap();

        assert!(store.get_due_pending(500, 10).unwrap().is_empty());
        assert_eq!(store.get_due_pending(10_000, 10).unwrap().len(), 1);
    }

    #[test]
    fn update_pending_attempt_persists_backoff_state() {
        let store = StateStore::open_in_memory().unwrap();
        store.enqueue_pending("/a.pdf", 100).unwrap();
        store
            .update_pending_attempt("/a.pdf", 3, 400, Some("network timeout"))
            .unwrap();

        let entry = store.get_pending("/a.pdf").unwrap().unwrap();
        assert_eq!(entry.attempt_count, 3);
        assert_eq!(entry.next_attempt_at, 400);
        assert_eq!(entry.last_error.as_deref(), Some("network timeout"));
    }

    #[test]
    fn resolve_pending_removes_entry() {
        let store = StateStore::open_in_memory().unwrap();
        store.enqueue_pending("/a.pdf", 100).unwrap();
        store.resolve_pending("/a.pdf").unwrap();
        assert_eq!(store.count_pending().unwrap(), 0);
    }

    #[test]
    fn get_due_pending_respects_limit() {
        let store = StateStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.enqueue_pending(format!("/{i}.pdf"), i as i64).unwrap();
        }
        assert_eq!(store.get_due_pending(1000, 3).unwrap().len(), 3);
    }
}
