use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use zotomatic_config::PendingConfig;
use zotomatic_core::PendingEntry;
use zotomatic_resolver::MetadataResolver;

use crate::error::{DaemonError, WorkflowError};
use crate::queue::PendingQueue;
use crate::unix_now;

/// Invoked by [`PendingProcessor`] once a pending file resolves
/// successfully. Implemented by the orchestrator (C10), which wraps the note
/// workflow (C9) — kept as a trait so the processor never needs to know
/// about `NoteBuilderContext` or note rendering (`spec.md` §4.8).
#[async_trait]
pub trait ResolvedHandler: Send + Sync {
    async fn on_resolved(&self, path: &std::path::Path) -> Result<(), WorkflowError>;
}

#[derive(Debug, Default, Clone)]
pub struct TickOutcome {
    pub processed: usize,
    pub dropped_this_tick: Vec<PathBuf>,
}

/// `C8`: processes due pending entries one batch at a time, retrying
/// resolution with exponential backoff and dropping an entry once it has
/// exhausted `pending_max_attempts` (`spec.md` §4.8).
pub struct PendingProcessor {
    queue: PendingQueue,
    resolver: Arc<dyn MetadataResolver>,
    config: PendingConfig,
    dropped: Mutex<Vec<PathBuf>>,
}

impl PendingProcessor {
    pub fn new(queue: PendingQueue, resolver: Arc<dyn MetadataResolver>, config: PendingConfig) -> Self {
        Self {
            queue,
            resolver,
            config,
            dropped: Mutex::new(Vec::new()),
        }
    }

    pub fn loop_interval_seconds(&self) -> u64 {
        self.config.loop_interval_seconds
    }

    pub fn batch_limit(&self) -> usize {
        self.config.batch_limit
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.lock().len()
    }

    /// The first `limit` dropped paths, for inclusion in the orchestrator's
    /// final summary.
    pub fn dropped_paths(&self, limit: usize) -> Vec<PathBuf> {
        self.dropped.lock().iter().take(limit).cloned().collect()
    }

    /// Processes every pending entry due at `now`, up to `batch_limit`.
    pub async fn run_once<H: ResolvedHandler + ?Sized>(
        &self,
        handler: &H,
        now: i64,
    ) -> Result<TickOutcome, DaemonError> {
        let due = self.queue.get_due(now, self.config.batch_limit)?;
        let mut outcome = TickOutcome::default();

        for entry in due {
            if !entry.file_path.exists() {
                self.backoff(&entry, "PDF no longer present on disk", &mut outcome)?;
                continue;
            }

            match self.resolver.resolve(&entry.file_path).await {
                Err(error) => self.backoff(&entry, &error.to_string(), &mut outcome)?,
                Ok(None) => self.backoff(&entry, "metadata not yet resolvable", &mut outcome)?,
                Ok(Some(_record)) => match handler.on_resolved(&entry.file_path).await {
                    Ok(()) => {
                        self.queue.resolve(&entry.file_path)?;
                        outcome.processed += 1;
                    }
                    Err(error) => self.backoff(&entry, &error.to_string(), &mut outcome)?,
                },
            }
        }

        Ok(outcome)
    }

    fn backoff(
        &self,
        entry: &PendingEntry,
        error: &str,
        outcome: &mut TickOutcome,
    ) -> Result<(), DaemonError> {
        let next_attempt_count = entry.attempt_count + 1;
        if next_attempt_count > self.config.max_attempts {
            self.queue.resolve(&entry.file_path)?;
            self.dropped.lock().push(entry.file_path.clone());
            outcome.dropped_this_tick.push(entry.file_path.clone());
            tracing::warn!(
                path = %entry.file_path.display(),
                attempts = next_attempt_count,
                "dropping pending PDF after exhausting retry attempts"
            );
            return Ok(());
        }

        let delay = exponential_delay(
            self.config.base_delay_seconds,
            self.config.max_delay_seconds,
            entry.attempt_count,
        );
        self.queue.update_attempt(
            &entry.file_path,
            next_attempt_count,
            unix_now() + delay as i64,
            Some(error),
        )?;
        Ok(())
    }
}

/// `next_delay = min(max_delay, base_delay * 2^attempt_count)` (`spec.md`
/// §4.8).
fn exponential_delay(base_delay: u64, max_delay: u64, attempt_count: u32) -> u64 {
    let factor = 2u64.checked_pow(attempt_count).unwrap_or(u64::MAX);
    base_delay.saturating_mul(factor).min(max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_delay_doubles_each_attempt_then_caps() {
        assert_eq!(exponential_delay(5, 60, 0), 5);
        assert_eq!(exponential_delay(5, 60, 1), 10);
        assert_eq!(exponential_delay(5, 60, 2), 20);
        assert_eq!(exponential_delay(5, 60, 10), 60);
    }

    #[test]
    fn exponential_delay_does_not_overflow_on_large_attempt_counts() {
        assert_eq!(exponential_delay(5, 60, 63), 60);
    }

    struct StubResolver {
        resolvable: bool,
    }

    #[async_trait]
    impl MetadataResolver for StubResolver {
        async fn resolve(
            &self,
            _pdf_path: &std::path::Path,
        ) -> Result<Option<zotomatic_resolver::MetadataRecord>, zotomatic_resolver::ResolverError> {
            if self.resolvable {
                Ok(Some(zotomatic_resolver::MetadataRecord::default()))
            } else {
                Ok(None)
            }
        }
    }

    struct AlwaysOkHandler;

    #[async_trait]
    impl ResolvedHandler for AlwaysOkHandler {
        async fn on_resolved(&self, _path: &std::path::Path) -> Result<(), WorkflowError> {
            Ok(())
        }
    }

    fn processor(resolvable: bool, max_attempts: u32) -> PendingProcessor {
        let store = Arc::new(zotomatic_storage::StateStore::open_in_memory().unwrap());
        let queue = PendingQueue::new(store);
        let resolver: Arc<dyn MetadataResolver> = Arc::new(StubResolver { resolvable });
        let config = PendingConfig {
            base_delay_seconds: 1,
            max_delay_seconds: 4,
            batch_limit: 50,
            loop_interval_seconds: 1,
            max_attempts,
        };
        PendingProcessor::new(queue, resolver, config)
    }

    #[tokio::test]
    async fn resolved_entry_is_processed_and_removed() {
        let processor = processor(true, 10);
        processor.queue.enqueue("/a.pdf", 0).unwrap();

        let outcome = processor.run_once(&AlwaysOkHandler, 0).await.unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(processor.queue.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn unresolved_entry_backs_off_instead_of_being_removed() {
        let processor = processor(false, 10);
        processor.queue.enqueue("/missing.pdf", 0).unwrap();

        processor.run_once(&AlwaysOkHandler, 0).await.unwrap();
        assert_eq!(processor.queue.count().unwrap(), 1);
        let entry = processor
            .queue
            .get_due(i64::MAX, 10)
            .unwrap()
            .into_iter()
            .next()
            .unwrap();
        assert_eq!(entry.attempt_count, 1);
    }

    #[tokio::test]
    async fn entry_is_dropped_after_exhausting_max_attempts() {
        // A nonexistent path never resolves and is never present on disk, so
        // every tick backs off.
        let processor = processor(false, 1);
        processor.queue.enqueue("/missing.pdf", 0).unwrap();

        processor.run_once(&AlwaysOkHandler, 0).await.unwrap();
        assert_eq!(processor.queue.count().unwrap(), 1);

        let outcome = processor.run_once(&AlwaysOkHandler, i64::MAX).await.unwrap();
        assert_eq!(processor.queue.count().unwrap(), 0);
        assert_eq!(outcome.dropped_this_tick.len(), 1);
        assert_eq!(processor.dropped_count(), 1);
    }
}
