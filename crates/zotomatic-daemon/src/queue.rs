use std::path::Path;
use std::sync::Arc;

use zotomatic_core::PendingEntry;
use zotomatic_storage::{StateStore, StorageError};

/// `C6`: thin, cache-free wrapper over the pending table owned by C1. Retry
/// policy itself lives in [`crate::processor::PendingProcessor`] — this type
/// is just the shared handle both the watcher-fed seed buffer and the
/// processor enqueue/dequeue through (`spec.md` §4.6).
#[derive(Clone)]
pub struct PendingQueue {
    store: Arc<StateStore>,
}

impl PendingQueue {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn enqueue(&self, path: impl AsRef<Path>, now: i64) -> Result<(), StorageError> {
        self.store.enqueue_pending(path, now)
    }

    pub fn get_due(&self, now: i64, limit: usize) -> Result<Vec<PendingEntry>, StorageError> {
        self.store.get_due_pending(now, limit)
    }

    pub fn update_attempt(
        &self,
        path: impl AsRef<Path>,
        attempt_count: u32,
        next_attempt_at: i64,
        last_error: Option<&str>,
    ) -> Result<(), StorageError> {
        self.store
            .update_pending_attempt(path, attempt_count, next_attempt_at, last_error)
    }

    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.store.resolve_pending(path)
    }

    pub fn count(&self) -> Result<i64, StorageError> {
        self.store.count_pending()
    }

    pub fn list(&self, limit: Option<usize>) -> Result<Vec<PendingEntry>, StorageError> {
        self.store.list_pending(limit)
    }
}
