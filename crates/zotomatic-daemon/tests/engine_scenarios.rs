use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use zotomatic_config::{LlmConfig, PendingConfig, ZoteroConfig};
use zotomatic_core::{FieldStatus, NoteBuilderContext, SummaryMode};
use zotomatic_daemon::{DaemonError, Engine, EngineConfig, RunMode};
use zotomatic_llm::{LlmProvider, SummaryContext, SummaryResult, TagResult, TagsContext};
use zotomatic_notes::NoteRepository;
use zotomatic_resolver::{MetadataRecord, MetadataResolver, ResolverError};

struct MapResolver(HashMap<PathBuf, MetadataRecord>);

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

struct StubLlm;

#[async_trait]
impl LlmProvider for StubLlm {
    async fn generate_summary(&self, context: &SummaryContext) -> SummaryResult {
        SummaryResult { mode: Some(context.mode), summary: "S".to_string() }
    }

    async fn generate_tags(&self, _context: &TagsContext) -> TagResult {
        TagResult { tags: vec!["nlp".to_string()] }
    }

    async fn close(&self) {}
}

fn write_pdf(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::File::create(&path).unwrap().write_all(content).unwrap();
    std::fs::canonicalize(&path).unwrap()
}

struct Fixture {
    _dir: TempDir,
    library: PathBuf,
    notes: PathBuf,
    state_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let library = dir.path().join("library");
        let notes = dir.path().join("notes");
        let state_dir = dir.path().join("state");
        std::fs::create_dir_all(&library).unwrap();
        Self { _dir: dir, library, notes, state_dir }
    }

    fn config(&self, max_attempts: u32) -> EngineConfig {
        EngineConfig {
            pdf_library_dir: self.library.clone(),
            pdf_scan_recursive: true,
            pdf_glob_pattern: "*.pdf".to_string(),
            notes_output_dir: self.notes.clone(),
            database_path: self.state_dir.join("zotomatic.db"),
            pending: PendingConfig {
                base_delay_seconds: 1,
                max_delay_seconds: 4,
                batch_limit: 50,
                loop_interval_seconds: 1,
                max_attempts,
            },
            llm: LlmConfig {
                provider: None,
                providers: Default::default(),
                timeout_seconds: 5.0,
                output_language: "en".to_string(),
                daily_call_limit: 0,
            },
            zotero: ZoteroConfig::default(),
            summary_enabled: true,
            tag_enabled: true,
            summary_mode: SummaryMode::Quick,
            max_tags: 5,
            output_language: "en".to_string(),
            force: false,
        }
    }
}

fn record(citekey: &str) -> MetadataRecord {
    MetadataRecord {
        citekey: Some(citekey.to_string()),
        title: Some("A Paper".to_string()),
        ..MetadataRecord::default()
    }
}

/// S1: fresh PDF, resolver succeeds, LLM enabled — one note created with
/// both fields `done`, summary counters all accounted for.
#[tokio::test]
async fn s1_fresh_pdf_resolver_succeeds_llm_enabled() {
    let fixture = Fixture::new();
    let pdf = write_pdf(&fixture.library, "a.pdf", &[0u8; 100]);

    let mut records = HashMap::new();
    records.insert(pdf, record("smith2020"));
    let resolver: Arc<dyn MetadataResolver> = Arc::new(MapResolver(records));
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm);

    let engine = Engine::with_resolver_and_llm(fixture.config(10), resolver, Some(llm)).unwrap();
    let summary = engine.run(RunMode::Once).await.unwrap();

    assert_eq!((summary.created, summary.updated, summary.skipped, summary.pending, summary.dropped, summary.errors),
        (1, 0, 0, 0, 0, 0));

    let note_path = fixture.notes.join("smith2020.md");
    let text = std::fs::read_to_string(&note_path).unwrap();
    assert!(text.contains("citekey: smith2020"));
    assert!(text.contains("zotomatic_summary_status: done"));
    assert!(text.contains("zotomatic_tag_status: done"));
}

/// S2: resolver never resolves; with `max_attempts=2` the entry is dropped
/// and the pending queue ends empty.
#[tokio::test]
async fn s2_resolver_unresolved_retries_exhausted() {
    let fixture = Fixture::new();
    write_pdf(&fixture.library, "b.pdf", b"stuff");

    let resolver: Arc<dyn MetadataResolver> = Arc::new(NeverResolves);
    let engine = Engine::with_resolver(fixture.config(2), resolver).unwrap();

    let summary = engine.run(RunMode::Once).await.unwrap();
    assert_eq!(summary.pending, 0);
    assert_eq!(summary.dropped, 1);
    assert!(summary.dropped_paths.iter().any(|p| p.ends_with("b.pdf")));
}

/// S3: a pre-existing note has `zotomatic_summary_status: pending`; once its
/// PDF resolves and an LLM is available, the note is rewritten `done` and
/// counted as `updated`.
#[tokio::test]
async fn s3_pending_resume_fills_in_missing_summary() {
    let fixture = Fixture::new();
    let pdf = write_pdf(&fixture.library, "jones2019.pdf", b"paper bytes");

    {
        let mut repo = NoteRepository::new(&fixture.notes);
        let mut context = NoteBuilderContext::skeleton(&pdf);
        context.citekey = Some("jones2019".to_string());
        context.summary_status = FieldStatus::Pending;
        context.tag_status = FieldStatus::Done;
        repo.write_note(&context).unwrap();
    }

    let mut records = HashMap::new();
    records.insert(pdf, record("jones2019"));
    let resolver: Arc<dyn MetadataResolver> = Arc::new(MapResolver(records));
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm);

    let engine = Engine::with_resolver_and_llm(fixture.config(10), resolver, Some(llm)).unwrap();
    let summary = engine.run(RunMode::Once).await.unwrap();

    assert_eq!(summary.updated, 1);
    let text = std::fs::read_to_string(fixture.notes.join("jones2019.md")).unwrap();
    assert!(text.contains("zotomatic_summary_status: done"));
}

/// S4: the same citekey's PDF moves to a new path; the note is rewritten
/// with the new `pdf_local` only, counted as `updated`.
#[tokio::test]
async fn s4_path_drift_rewrites_pdf_local() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(fixture.library.join("old")).unwrap();
    std::fs::create_dir_all(fixture.library.join("new")).unwrap();
    let old_pdf = write_pdf(&fixture.library.join("old"), "x.pdf", b"one");

    {
        let mut repo = NoteRepository::new(&fixture.notes);
        let mut context = NoteBuilderContext::skeleton(&old_pdf);
        context.citekey = Some("park2020".to_string());
        context.summary_status = FieldStatus::Done;
        context.tag_status = FieldStatus::Done;
        repo.write_note(&context).unwrap();
    }
    std::fs::remove_file(&old_pdf).unwrap();
    let new_pdf = write_pdf(&fixture.library.join("new"), "x.pdf", b"one");

    let mut records = HashMap::new();
    records.insert(new_pdf.clone(), record("park2020"));
    let resolver: Arc<dyn MetadataResolver> = Arc::new(MapResolver(records));

    let engine = Engine::with_resolver(fixture.config(10), resolver).unwrap();
    let summary = engine.run(RunMode::Once).await.unwrap();

    assert_eq!(summary.updated, 1);
    let text = std::fs::read_to_string(fixture.notes.join("park2020.md")).unwrap();
    assert!(text.contains(&format!("pdf_local: {}", new_pdf.display())));
}

/// S5: three fresh PDFs sharing one daily quota. The ledger reserves one
/// unit per generate call (a summary and a tag call each cost one), so a
/// limit of 2 buys exactly the first note's pair of calls before the quota
/// runs dry — the first note finishes `done`/`done`, the other two stay
/// `pending`, and the run reports the quota as exhausted.
#[tokio::test]
async fn s5_quota_exhausted_mid_run() {
    let fixture = Fixture::new();
    let pdf_a = write_pdf(&fixture.library, "a.pdf", b"one");
    let pdf_b = write_pdf(&fixture.library, "b.pdf", b"two");
    let pdf_c = write_pdf(&fixture.library, "c.pdf", b"three");

    let mut records = HashMap::new();
    records.insert(pdf_a, record("first2020"));
    records.insert(pdf_b, record("second2020"));
    records.insert(pdf_c, record("third2020"));
    let resolver: Arc<dyn MetadataResolver> = Arc::new(MapResolver(records));
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm);

    let mut config = fixture.config(10);
    config.llm.daily_call_limit = 2;
    let engine = Engine::with_resolver_and_llm(config, resolver, Some(llm)).unwrap();
    let summary = engine.run(RunMode::Once).await.unwrap();

    assert_eq!(summary.created, 3);
    assert!(summary.quota_exhausted);

    let done_count = ["first2020", "second2020", "third2020"]
        .iter()
        .filter(|citekey| {
            let text = std::fs::read_to_string(fixture.notes.join(format!("{citekey}.md"))).unwrap();
            text.contains("zotomatic_summary_status: done")
        })
        .count();
    // Only the note that claims both reservations gets a `done` summary;
    // the other two are written with both fields left `pending`.
    assert_eq!(done_count, 1);

    let pending_count = ["first2020", "second2020", "third2020"]
        .iter()
        .filter(|citekey| {
            let text = std::fs::read_to_string(fixture.notes.join(format!("{citekey}.md"))).unwrap();
            text.contains("zotomatic_summary_status: pending")
        })
        .count();
    assert_eq!(pending_count, 2);
}

/// S6: `--path` bypass with one missing file fails before any note is
/// written or any row is recorded in the database.
#[tokio::test]
async fn s6_path_bypass_missing_file_fails_before_any_work() {
    let fixture = Fixture::new();
    let existing = write_pdf(&fixture.library, "c.pdf", b"ok");
    let missing = fixture.library.join("missing.pdf");

    let resolver: Arc<dyn MetadataResolver> = Arc::new(NeverResolves);
    let engine = Engine::with_resolver(fixture.config(10), resolver).unwrap();

    let error = engine.run(RunMode::Paths(vec![existing, missing])).await.unwrap_err();
    assert!(matches!(error, DaemonError::InvalidPath(_)));

    // Constructing `Engine` already opened and schema-created the database,
    // so the file on disk exists — `spec.md` §8 S6 guarantees no *row* was
    // written before the path check failed, not that the file is absent.
    let store = zotomatic_storage::StateStore::open(fixture.state_dir.join("zotomatic.db")).unwrap();
    assert_eq!(store.count_files().unwrap(), 0);
    assert_eq!(store.count_pending().unwrap(), 0);
    assert!(!fixture.notes.exists());
}
