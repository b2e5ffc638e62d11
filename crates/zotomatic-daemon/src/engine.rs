use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use zotomatic_config::{Config, LlmConfig, PendingConfig, ZoteroConfig};
use zotomatic_core::{meta_keys, SummaryMode};
use zotomatic_llm::{build_llm_client, LlmProvider, UsageLedger};
use zotomatic_notes::NoteRepository;
use zotomatic_resolver::{MetadataResolver, ZoteroResolver, ZoteroResolverConfig};
use zotomatic_storage::StateStore;
use zotomatic_watch::{PdfEventSink, PdfWatcher, PdfWatcherConfig};

use crate::error::{DaemonError, WorkflowError};
use crate::processor::{PendingProcessor, ResolvedHandler};
use crate::queue::PendingQueue;
use crate::unix_now;
use crate::workflow::{NoteWorkflow, WorkflowConfig, WorkflowOutcome};

/// Resolver timeout used when the config doesn't carry its own (`spec.md`
/// §5 "C3 implementations must bound their own timeouts").
const ZOTERO_DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Flattened, validated settings an [`Engine`] is built from — the `Option`
/// fields of [`zotomatic_config::Config`] resolved to concrete values, plus
/// the `--force` flag that only makes sense for a single run (`spec.md` §6).
pub struct EngineConfig {
    pub pdf_library_dir: PathBuf,
    pub pdf_scan_recursive: bool,
    pub pdf_glob_pattern: String,
    pub notes_output_dir: PathBuf,
    pub database_path: PathBuf,
    pub pending: PendingConfig,
    pub llm: LlmConfig,
    pub zotero: ZoteroConfig,
    pub summary_enabled: bool,
    pub tag_enabled: bool,
    pub summary_mode: SummaryMode,
    pub max_tags: usize,
    pub output_language: String,
    pub force: bool,
}

impl EngineConfig {
    /// Resolves an [`EngineConfig`] from the merged [`Config`], failing with
    /// the same `ConfigError::MissingSetting` the raw config would have
    /// raised had `validate()` not already been called by the caller.
    pub fn from_config(config: &Config, force: bool) -> Result<Self, DaemonError> {
        let pdf_library_dir = config
            .pdf_library_dir
            .clone()
            .ok_or_else(|| zotomatic_config::ConfigError::MissingSetting("pdf_library_dir".into()))?;
        let notes_output_dir = config
            .notes_output_dir
            .clone()
            .ok_or_else(|| zotomatic_config::ConfigError::MissingSetting("notes_output_dir".into()))?;

        Ok(Self {
            pdf_library_dir,
            pdf_scan_recursive: config.pdf_scan_recursive,
            pdf_glob_pattern: config.pdf_glob_pattern.clone(),
            notes_output_dir,
            database_path: config.database_path(),
            pending: config.pending.clone(),
            llm: config.llm.clone(),
            zotero: config.zotero.clone(),
            summary_enabled: config.summary_enabled,
            tag_enabled: config.tag_enabled,
            summary_mode: config.summary_mode_enum(),
            max_tags: config.max_tags,
            output_language: config.llm.output_language.clone(),
            force,
        })
    }
}

/// One of the three `scan` run modes (`spec.md` §6).
#[derive(Debug, Clone)]
pub enum RunMode {
    /// Initial scan, drain the seed buffer, drain the pending queue, exit.
    Once,
    /// Same as `Once`, then stay resident handling new filesystem events.
    Watch,
    /// Bypass the watcher; run the note workflow once per path, in order.
    Paths(Vec<PathBuf>),
}

#[derive(Debug, Default, Clone)]
struct Counters {
    created: usize,
    updated: usize,
    skipped: usize,
    errors: usize,
    error_paths: Vec<PathBuf>,
}

/// The final tally a run prints and returns (`spec.md` §6 stdout contract).
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub pending: usize,
    pub dropped: usize,
    pub errors: usize,
    pub pending_paths: Vec<PathBuf>,
    pub dropped_paths: Vec<PathBuf>,
    pub error_paths: Vec<PathBuf>,
    pub quota_exhausted: bool,
}

const PATH_SECTION_LIMIT: usize = 10;

/// `C10`: wires C1-C9 and owns the main loop — draining the seed buffer,
/// ticking the pending processor, and handling termination on signal or
/// scan-once completion (`spec.md` §4.10).
pub struct Engine {
    store: Arc<StateStore>,
    queue: PendingQueue,
    processor: PendingProcessor,
    workflow: Arc<NoteWorkflow>,
    watcher_config: PdfWatcherConfig,
    llm: Option<Arc<dyn LlmProvider>>,
    counters: Mutex<Counters>,
}

impl Engine {
    /// Builds an engine backed by the real Zotero-backed resolver
    /// (`spec.md` §4.3).
    pub fn new(config: EngineConfig) -> Result<Self, DaemonError> {
        let resolver: Arc<dyn MetadataResolver> = Arc::new(ZoteroResolver::new(ZoteroResolverConfig {
            api_key: config.zotero.api_key.clone(),
            library_id: config.zotero.library_id.clone(),
            library_scope: config.zotero.library_scope.clone(),
            base_url: config.zotero.base_url.clone(),
            timeout: Duration::from_secs(ZOTERO_DEFAULT_TIMEOUT_SECS),
        })?);
        Self::with_resolver(config, resolver)
    }

    /// Builds an engine with a caller-supplied resolver — the seam tests use
    /// to avoid real Zotero HTTP calls.
    pub fn with_resolver(config: EngineConfig, resolver: Arc<dyn MetadataResolver>) -> Result<Self, DaemonError> {
        let llm: Option<Arc<dyn LlmProvider>> = if config.llm.provider.is_some() {
            match build_llm_client(&config.llm) {
                Ok(client) => Some(Arc::from(client)),
                Err(error) => {
                    tracing::warn!(%error, "failed to construct LLM client, summaries/tags will remain pending");
                    None
                }
            }
        } else {
            None
        };

        Self::with_resolver_and_llm(config, resolver, llm)
    }

    /// Builds an engine with caller-supplied resolver and LLM provider —
    /// the seam S1/S3 scenario tests use to exercise summary/tag generation
    /// against a stub instead of a real provider.
    pub fn with_resolver_and_llm(
        config: EngineConfig,
        resolver: Arc<dyn MetadataResolver>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Self, DaemonError> {
        let store = Arc::new(StateStore::open(&config.database_path)?);
        let ledger = Arc::new(UsageLedger::new(store.clone(), config.llm.daily_call_limit));

        let mut notes = NoteRepository::new(config.notes_output_dir.clone());
        if let Err(error) = notes.build_citekey_index() {
            tracing::warn!(%error, "failed to build citekey index from existing notes");
        }

        let workflow = Arc::new(NoteWorkflow::new(
            resolver.clone(),
            notes,
            llm.clone(),
            ledger,
            WorkflowConfig {
                summary_enabled: config.summary_enabled,
                tag_enabled: config.tag_enabled,
                max_tags: config.max_tags,
                output_language: config.output_language.clone(),
                default_summary_mode: config.summary_mode,
            },
        ));

        let queue = PendingQueue::new(store.clone());
        let processor = PendingProcessor::new(queue.clone(), resolver, config.pending.clone());

        let watcher_config = PdfWatcherConfig {
            root: config.pdf_library_dir,
            recursive: config.pdf_scan_recursive,
            glob_pattern: config.pdf_glob_pattern,
            force: config.force,
            ..PdfWatcherConfig::default()
        };

        Ok(Self {
            store,
            queue,
            processor,
            workflow,
            watcher_config,
            llm,
            counters: Mutex::new(Counters::default()),
        })
    }

    /// Per-run `--summary-mode` override (`spec.md` §4.9).
    pub fn set_summary_mode_override(&self, mode: Option<SummaryMode>) {
        self.workflow.set_summary_mode_override(mode);
    }

    pub async fn run(&self, mode: RunMode) -> Result<RunSummary, DaemonError> {
        match mode {
            RunMode::Paths(paths) => self.run_paths(paths).await,
            RunMode::Once => self.run_watched(false).await,
            RunMode::Watch => self.run_watched(true).await,
        }
    }

    async fn run_paths(&self, paths: Vec<PathBuf>) -> Result<RunSummary, DaemonError> {
        for path in &paths {
            if !path.is_file() {
                return Err(DaemonError::InvalidPath(path.display().to_string()));
            }
        }

        for path in &paths {
            let _ = self.handle_and_record(path, false).await;
        }

        let summary = self.build_summary()?;
        self.print_summary(&summary);
        Ok(summary)
    }

    async fn run_watched(&self, stay_resident: bool) -> Result<RunSummary, DaemonError> {
        let stop = CancellationToken::new();
        let seed_buffer: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
        let scan_complete = Arc::new(AtomicBool::new(false));
        let direct_enqueue = Arc::new(AtomicBool::new(
            self.store.get_meta(meta_keys::BOOT_SEED_COMPLETE)?.as_deref() == Some("1"),
        ));

        let sink: Arc<dyn PdfEventSink> = Arc::new(EngineSink {
            seed_buffer: seed_buffer.clone(),
            queue: self.queue.clone(),
            direct_enqueue: direct_enqueue.clone(),
            scan_complete: scan_complete.clone(),
        });

        let watcher = PdfWatcher::new(self.watcher_config.clone(), self.store.clone());
        let watcher_stop = stop.clone();
        let watcher_handle = tokio::task::spawn_blocking(move || watcher.run(sink, watcher_stop));

        if stay_resident {
            let ctrl_c_stop = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c_stop.cancel();
                }
            });
        }

        let loop_interval = Duration::from_secs(self.processor.loop_interval_seconds().max(1));

        loop {
            self.drain_seed_buffer(&seed_buffer)?;

            if scan_complete.load(Ordering::Relaxed)
                && seed_buffer.lock().is_empty()
                && !direct_enqueue.load(Ordering::Relaxed)
            {
                self.store.set_meta(meta_keys::BOOT_SEED_COMPLETE, "1")?;
                direct_enqueue.store(true, Ordering::Relaxed);
            }

            self.processor.run_once(self, unix_now()).await?;

            let done = if stay_resident {
                stop.is_cancelled()
            } else {
                scan_complete.load(Ordering::Relaxed) && seed_buffer.lock().is_empty() && self.queue.count()? == 0
            };

            if done {
                stop.cancel();
                break;
            }

            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(loop_interval) => {}
            }
        }

        match watcher_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(DaemonError::Watcher(error)),
            Err(_) => return Err(DaemonError::WatcherPanic),
        }

        if let Some(llm) = &self.llm {
            llm.close().await;
        }

        let summary = self.build_summary()?;
        self.print_summary(&summary);
        Ok(summary)
    }

    fn drain_seed_buffer(&self, seed_buffer: &Mutex<Vec<PathBuf>>) -> Result<(), DaemonError> {
        let mut buffer = seed_buffer.lock();
        if buffer.is_empty() {
            return Ok(());
        }
        let now = unix_now();
        let drain_n = buffer.len().min(self.processor.batch_limit());
        for path in buffer.drain(..drain_n) {
            self.queue.enqueue(&path, now)?;
        }
        Ok(())
    }

    /// Runs the note workflow for `path` and folds the outcome into the
    /// run's counters. When `propagate_unresolved` is true (the pending
    /// queue's callback), a resolver/unresolved error is returned to the
    /// caller so [`PendingProcessor`] backs the entry off instead of
    /// recording it as failed — only a [`WorkflowError::Note`] is final
    /// immediately, matching `spec.md` §4.9's "any exception from C2
    /// propagates to C10 which increments the error counter". In
    /// `--path` mode there is no retry queue to fall back to, so every
    /// failure there is recorded as an error straight away.
    async fn handle_and_record(&self, path: &Path, propagate_unresolved: bool) -> Result<(), WorkflowError> {
        match self.workflow.handle(path).await {
            Ok(WorkflowOutcome::Created(written)) => {
                println!("Note created: {}", written.display());
                self.counters.lock().created += 1;
                Ok(())
            }
            Ok(WorkflowOutcome::Updated(written)) => {
                println!("Note created: {}", written.display());
                self.counters.lock().updated += 1;
                Ok(())
            }
            Ok(WorkflowOutcome::Skipped(_)) => {
                self.counters.lock().skipped += 1;
                Ok(())
            }
            Err(WorkflowError::Note(error)) => {
                tracing::error!(%error, path = %path.display(), "note repository error, recording as failed");
                let mut counters = self.counters.lock();
                counters.errors += 1;
                counters.error_paths.push(path.to_path_buf());
                Ok(())
            }
            Err(other) if propagate_unresolved => Err(other),
            Err(other) => {
                tracing::error!(%other, path = %path.display(), "note workflow failed");
                let mut counters = self.counters.lock();
                counters.errors += 1;
                counters.error_paths.push(path.to_path_buf());
                Ok(())
            }
        }
    }

    fn build_summary(&self) -> Result<RunSummary, DaemonError> {
        let counters = self.counters.lock().clone();
        let pending_paths = self
            .queue
            .list(Some(PATH_SECTION_LIMIT))?
            .into_iter()
            .map(|entry| entry.file_path)
            .collect();

        Ok(RunSummary {
            created: counters.created,
            updated: counters.updated,
            skipped: counters.skipped,
            pending: self.queue.count()? as usize,
            dropped: self.processor.dropped_count(),
            errors: counters.errors,
            pending_paths,
            dropped_paths: self.processor.dropped_paths(PATH_SECTION_LIMIT),
            error_paths: counters.error_paths.iter().take(PATH_SECTION_LIMIT).cloned().collect(),
            quota_exhausted: self.workflow.quota_exhausted(),
        })
    }

    fn print_summary(&self, summary: &RunSummary) {
        println!(
            "Summary: created={}, updated={}, skipped={}, pending={}, dropped={}, errors={}",
            summary.created, summary.updated, summary.skipped, summary.pending, summary.dropped, summary.errors
        );
        print_path_section("Pending", &summary.pending_paths, summary.pending);
        print_path_section("Dropped", &summary.dropped_paths, summary.dropped);
        print_path_section("Errors", &summary.error_paths, summary.errors);
        if summary.quota_exhausted {
            println!("Note: LLM daily limit reached today; summaries/tags may be pending.");
        }
    }
}

fn print_path_section(label: &str, paths: &[PathBuf], total: usize) {
    if paths.is_empty() {
        return;
    }
    println!("{label}:");
    for path in paths {
        println!("  {}", path.display());
    }
    if total > paths.len() {
        println!("  ... {} more", total - paths.len());
    }
}

#[async_trait]
impl ResolvedHandler for Engine {
    async fn on_resolved(&self, path: &Path) -> Result<(), WorkflowError> {
        self.handle_and_record(path, true).await
    }
}

/// Feeds the seed buffer during boot-seeding, then the pending queue
/// directly once `boot_seed_complete` flips (`spec.md` §4.10).
struct EngineSink {
    seed_buffer: Arc<Mutex<Vec<PathBuf>>>,
    queue: PendingQueue,
    direct_enqueue: Arc<AtomicBool>,
    scan_complete: Arc<AtomicBool>,
}

impl PdfEventSink for EngineSink {
    fn on_pdf_created(&self, path: PathBuf) {
        if self.direct_enqueue.load(Ordering::Relaxed) {
            if let Err(error) = self.queue.enqueue(&path, unix_now()) {
                tracing::warn!(%error, path = %path.display(), "failed to enqueue watcher-discovered PDF");
            }
        } else {
            self.seed_buffer.lock().push(path);
        }
    }

    fn on_initial_scan_complete(&self) {
        self.scan_complete.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use zotomatic_config::{LlmConfig, PendingConfig, ZoteroConfig};
    use zotomatic_resolver::{MetadataRecord, ResolverError};

    struct MapResolver(std::collections::HashMap<PathBuf, MetadataRecord>);

    #[async_trait]
    impl MetadataResolver for MapResolver {
        async fn resolve(&self, pdf_path: &Path) -> Result<Option<MetadataRecord>, ResolverError> {
            Ok(self.0.get(pdf_path).cloned())
        }
    }

    struct NeverResolves;

    #[async_trait]
    impl MetadataResolver for NeverResolves {
        async fn resolve(&self, _pdf_path: &Path) -> Result<Option<MetadataRecord>, ResolverError> {
            Ok(None)
        }
    }

    fn write_pdf(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::File::create(&path).unwrap().write_all(b"%PDF-1.4").unwrap();
        path
    }

    fn engine_config(dir: &Path) -> EngineConfig {
        EngineConfig {
            pdf_library_dir: dir.join("library"),
            pdf_scan_recursive: true,
            pdf_glob_pattern: "*.pdf".to_string(),
            notes_output_dir: dir.join("notes"),
            database_path: dir.join("zotomatic.db"),
            pending: PendingConfig {
                base_delay_seconds: 1,
                max_delay_seconds: 1,
                batch_limit: 50,
                loop_interval_seconds: 1,
                max_attempts: 1,
            },
            llm: LlmConfig {
                provider: None,
                providers: Default::default(),
                timeout_seconds: 5.0,
                output_language: "en".to_string(),
                daily_call_limit: 0,
            },
            zotero: ZoteroConfig::default(),
            summary_enabled: false,
            tag_enabled: false,
            summary_mode: SummaryMode::Quick,
            max_tags: 5,
            output_language: "en".to_string(),
            force: false,
        }
    }

    #[tokio::test]
    async fn path_mode_rejects_missing_files_before_doing_any_work() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("library")).unwrap();
        let existing = write_pdf(&dir.path().join("library"), "c.pdf");
        let missing = dir.path().join("missing.pdf");

        let resolver: Arc<dyn MetadataResolver> = Arc::new(NeverResolves);
        let engine = Engine::with_resolver(engine_config(dir.path()), resolver).unwrap();

        let error = engine
            .run(RunMode::Paths(vec![existing, missing]))
            .await
            .unwrap_err();
        assert!(matches!(error, DaemonError::InvalidPath(_)));

        // `Engine::with_resolver` already opened (and schema-created) the
        // database above, so the file itself exists — what `spec.md` §6
        // actually guarantees is that no row was written before the path
        // validation failure (`spec.md` §8 S6: "no database rows are
        // created").
        let store = StateStore::open(dir.path().join("zotomatic.db")).unwrap();
        assert_eq!(store.count_files().unwrap(), 0);
        assert_eq!(store.count_pending().unwrap(), 0);
    }

    #[tokio::test]
    async fn once_scan_creates_a_note_for_a_resolved_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("library");
        std::fs::create_dir_all(&library).unwrap();
        let pdf_path = write_pdf(&library, "a.pdf");
        let absolute = std::fs::canonicalize(&pdf_path).unwrap();

        let mut records = std::collections::HashMap::new();
        records.insert(
            absolute,
            MetadataRecord {
                citekey: Some("smith2020".to_string()),
                title: Some("A Paper".to_string()),
                ..MetadataRecord::default()
            },
        );
        let resolver: Arc<dyn MetadataResolver> = Arc::new(MapResolver(records));
        let engine = Engine::with_resolver(engine_config(dir.path()), resolver).unwrap();

        let summary = engine.run(RunMode::Once).await.unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.pending, 0);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.errors, 0);
        assert!(dir.path().join("notes/smith2020.md").exists());
    }

    #[tokio::test]
    async fn unresolvable_pdf_is_dropped_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("library");
        std::fs::create_dir_all(&library).unwrap();
        write_pdf(&library, "b.pdf");

        let resolver: Arc<dyn MetadataResolver> = Arc::new(NeverResolves);
        let engine = Engine::with_resolver(engine_config(dir.path()), resolver).unwrap();

        let summary = engine.run(RunMode::Once).await.unwrap();
        assert_eq!(summary.created, 0);
        assert_eq!(summary.pending, 0);
        assert_eq!(summary.dropped, 1);
    }
}
