use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use zotomatic_core::{now_iso8601, FieldStatus, NoteBuilderContext, SummaryMode};
use zotomatic_llm::{LlmProvider, SummaryContext, SummaryResult, TagResult, TagsContext, UsageLedger};
use zotomatic_notes::NoteRepository;
use zotomatic_resolver::MetadataResolver;

use crate::error::WorkflowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Created(PathBuf),
    Updated(PathBuf),
    Skipped(PathBuf),
}

pub struct WorkflowConfig {
    pub summary_enabled: bool,
    pub tag_enabled: bool,
    pub max_tags: usize,
    pub output_language: String,
    pub default_summary_mode: SummaryMode,
}

/// `C9`: decides between create / rewrite-path / resume-pending / skip for a
/// resolved PDF, coordinating C2 (notes), C3 (resolver), C4 (LLM) and C5
/// (usage ledger) (`spec.md` §4.9). A single entry point, [`Self::handle`],
/// re-resolves the PDF itself rather than trusting a caller-supplied record —
/// C8 only uses resolution to decide the pending queue's fate, it never
/// hands the resolved record on.
pub struct NoteWorkflow {
    resolver: Arc<dyn MetadataResolver>,
    notes: Mutex<NoteRepository>,
    llm: Option<Arc<dyn LlmProvider>>,
    ledger: Arc<UsageLedger>,
    config: WorkflowConfig,
    summary_mode_override: Mutex<Option<SummaryMode>>,
    quota_exhausted: AtomicBool,
}

impl NoteWorkflow {
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        notes: NoteRepository,
        llm: Option<Arc<dyn LlmProvider>>,
        ledger: Arc<UsageLedger>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            resolver,
            notes: Mutex::new(notes),
            llm,
            ledger,
            config,
            summary_mode_override: Mutex::new(None),
            quota_exhausted: AtomicBool::new(false),
        }
    }

    /// Per-run override (e.g. `scan --summary-mode deep`) that takes
    /// precedence over the configured mode for every subsequent `handle`
    /// call (`spec.md` §4.9, §6).
    pub fn set_summary_mode_override(&self, mode: Option<SummaryMode>) {
        *self.summary_mode_override.lock() = mode;
    }

    fn effective_summary_mode(&self) -> SummaryMode {
        self.summary_mode_override
            .lock()
            .unwrap_or(self.config.default_summary_mode)
    }

    /// True if any `try_reserve` call this run hit the daily LLM quota.
    pub fn quota_exhausted(&self) -> bool {
        self.quota_exhausted.load(Ordering::Relaxed)
    }

    pub async fn handle(&self, pdf_path: &Path) -> Result<WorkflowOutcome, WorkflowError> {
        let record = self
            .resolver
            .resolve(pdf_path)
            .await?
            .ok_or_else(|| WorkflowError::Unresolved(pdf_path.display().to_string()))?;

        let mut context = record.into_context(pdf_path);

        if let Some(citekey) = context.citekey.clone() {
            if let Some(existing_path) = self.find_existing(&citekey) {
                return self.handle_existing(&existing_path, pdf_path, &mut context).await;
            }
        }

        self.handle_fresh(&mut context).await
    }

    fn find_existing(&self, citekey: &str) -> Option<PathBuf> {
        {
            let notes = self.notes.lock();
            if let Some(path) = notes.find_by_citekey(citekey) {
                return Some(path.to_path_buf());
            }
        }
        // The in-memory index can drift from notes written outside this
        // process; rebuild once from disk before concluding this is
        // genuinely new (`spec.md` §4.2).
        let mut notes = self.notes.lock();
        let _ = notes.build_citekey_index();
        notes.find_by_citekey(citekey).map(Path::to_path_buf)
    }

    async fn handle_existing(
        &self,
        existing_path: &Path,
        pdf_path: &Path,
        context: &mut NoteBuilderContext,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let existing = {
            let notes = self.notes.lock();
            notes.read_note(existing_path)?
        };

        if existing.frontmatter.pdf_local.as_path() != pdf_path {
            let notes = self.notes.lock();
            notes.update_pdf_local(existing_path, pdf_path)?;
            return Ok(WorkflowOutcome::Updated(existing_path.to_path_buf()));
        }

        // Seed the context with what already settled, so a resume only
        // touches the field(s) still `pending`.
        context.tags = existing.frontmatter.tags.clone();
        context.summary_status = existing.frontmatter.summary_status;
        context.summary_mode = existing.frontmatter.summary_mode;
        context.tag_status = existing.frontmatter.tag_status;
        if existing.frontmatter.summary_status == FieldStatus::Done {
            let previous_summary = zotomatic_notes::extract_summary_block(&existing.body);
            if !previous_summary.is_empty() {
                context.generated_summary = Some(previous_summary);
            }
        }

        let mut changed = false;

        if existing.frontmatter.summary_status == FieldStatus::Pending && self.config.summary_enabled {
            if let Some(result) = self.try_generate_summary(context).await {
                if !result.is_empty() {
                    context.generated_summary = Some(result.summary);
                    context.summary_status = FieldStatus::Done;
                    context.summary_mode = result.mode;
                    changed = true;
                }
            }
        }

        if existing.frontmatter.tag_status == FieldStatus::Pending && self.config.tag_enabled {
            if let Some(result) = self.try_generate_tags(context).await {
                if !result.is_empty() {
                    context.generated_tags = result.tags;
                    context.tag_status = FieldStatus::Done;
                    changed = true;
                }
            }
        }

        if !changed {
            return Ok(WorkflowOutcome::Skipped(existing_path.to_path_buf()));
        }

        context.citekey = Some(existing.frontmatter.citekey.clone());
        context.last_updated = Some(now_iso8601());

        let notes = self.notes.lock();
        notes.update_note(existing_path, context)?;
        Ok(WorkflowOutcome::Updated(existing_path.to_path_buf()))
    }

    async fn handle_fresh(&self, context: &mut NoteBuilderContext) -> Result<WorkflowOutcome, WorkflowError> {
        if self.config.summary_enabled {
            match self.try_generate_summary(context).await {
                Some(result) if !result.is_empty() => {
                    context.summary_mode = result.mode;
                    context.generated_summary = Some(result.summary);
                    context.summary_status = FieldStatus::Done;
                }
                _ => context.summary_status = FieldStatus::Pending,
            }
        }

        if self.config.tag_enabled {
            match self.try_generate_tags(context).await {
                Some(result) if !result.is_empty() => {
                    context.generated_tags = result.tags;
                    context.tag_status = FieldStatus::Done;
                }
                _ => context.tag_status = FieldStatus::Pending,
            }
        }

        context.last_updated = Some(now_iso8601());

        let mut notes = self.notes.lock();
        let path = notes.write_note(context)?;
        Ok(WorkflowOutcome::Created(path))
    }

    async fn try_generate_summary(&self, context: &NoteBuilderContext) -> Option<SummaryResult> {
        let llm = self.llm.as_ref()?;
        if !self.reserve_quota() {
            return None;
        }
        let summary_context = SummaryContext {
            mode: self.effective_summary_mode(),
            pdf_path: context.pdf_path.clone(),
            language: self.config.output_language.clone(),
        };
        Some(llm.generate_summary(&summary_context).await)
    }

    async fn try_generate_tags(&self, context: &NoteBuilderContext) -> Option<TagResult> {
        let llm = self.llm.as_ref()?;
        if !self.reserve_quota() {
            return None;
        }
        let tags_context = TagsContext {
            paper_title: context.title.clone(),
            pdf_path: context.pdf_path.clone(),
            language: self.config.output_language.clone(),
            max_tags: self.config.max_tags,
        };
        Some(llm.generate_tags(&tags_context).await)
    }

    fn reserve_quota(&self) -> bool {
        match self.ledger.try_reserve(1) {
            Ok(true) => true,
            Ok(false) => {
                self.quota_exhausted.store(true, Ordering::Relaxed);
                false
            }
            Err(error) => {
                tracing::warn!(%error, "LLM usage ledger update failed, leaving field pending");
                false
            }
        }
    }
}
