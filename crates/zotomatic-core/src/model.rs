//! Data model shared by every component of the ingestion engine.
//!
//! These types mirror the entities in the engine's data model: on-disk file
//! state, the pending-resolution queue, and the context a note is built
//! from. None of them know how to persist themselves — that's `C1`'s job
//! (`zotomatic-storage`).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a PDF's on-disk identity the last time it was observed.
///
/// Identity is `(mtime_ns, size)`, not a hash: re-scanning a file whose
/// `(mtime_ns, size)` still matches the stored row is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub file_path: PathBuf,
    pub mtime_ns: i64,
    pub size: i64,
    pub sha1: Option<String>,
    pub last_seen_at: i64,
}

impl FileState {
    /// True if `other` describes the same `(mtime_ns, size)` pair.
    pub fn matches(&self, mtime_ns: i64, size: i64) -> bool {
        self.mtime_ns == mtime_ns && self.size == size
    }
}

/// One PDF awaiting metadata resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub file_path: PathBuf,
    pub attempt_count: u32,
    pub next_attempt_at: i64,
    pub last_error: Option<String>,
    pub enqueued_at: i64,
}

/// Opaque per-directory scan progress marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryState {
    pub directory: PathBuf,
    pub last_scan_at: i64,
}

/// Cached binding between a PDF path and its reference-manager attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoteroAttachmentState {
    pub file_path: PathBuf,
    pub attachment_key: String,
    pub parent_key: Option<String>,
}

/// Reserved keys in the `meta` key/value table.
pub mod meta_keys {
    pub const BOOT_SEED_COMPLETE: &str = "boot_seed_complete";

    /// Per-day LLM usage counter key, e.g. `llm_usage.2026-07-28`.
    pub fn llm_usage(date: &str) -> String {
        format!("llm_usage.{date}")
    }
}

/// `zotomatic_summary_status` / `zotomatic_tag_status` frontmatter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Pending,
    Done,
}

impl FieldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldStatus::Pending => "pending",
            FieldStatus::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "done" => FieldStatus::Done,
            _ => FieldStatus::Pending,
        }
    }
}

/// Prompting strategy used by the AI enrichment client for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    Quick,
    Standard,
    Deep,
}

impl SummaryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryMode::Quick => "quick",
            SummaryMode::Standard => "standard",
            SummaryMode::Deep => "deep",
        }
    }

    /// Parses a mode string, defaulting to `quick` for anything unrecognized
    /// — mirrors `original_source`'s `LLMSummaryMode.from_value`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(ref s) if s == "standard" => SummaryMode::Standard,
            Some(ref s) if s == "deep" => SummaryMode::Deep,
            _ => SummaryMode::Quick,
        }
    }
}

/// Parsed frontmatter of an on-disk note, as read back from Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFrontmatter {
    pub citekey: String,
    pub pdf_local: PathBuf,
    pub tags: Vec<String>,
    pub summary_status: FieldStatus,
    pub summary_mode: Option<SummaryMode>,
    pub tag_status: FieldStatus,
    pub last_updated: String,
}

/// A note on disk: its path plus parsed frontmatter and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub path: PathBuf,
    pub frontmatter: NoteFrontmatter,
    pub body: String,
}

/// Immutable input to the note workflow/builder.
///
/// Built from a resolved bibliographic record (C3) and enriched in place by
/// `with_*` calls as C9 walks its decision tree — the same
/// replace-and-rebind pattern `original_source`'s
/// `NoteBuilderContext.with_updates` uses on a frozen dataclass.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteBuilderContext {
    pub title: String,
    pub citekey: Option<String>,
    pub year: Option<i32>,
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub pdf_path: PathBuf,
    pub abstract_text: Option<String>,
    pub highlights: Vec<String>,
    pub tags: Vec<String>,
    pub generated_tags: Vec<String>,
    pub generated_summary: Option<String>,
    pub summary_status: FieldStatus,
    pub summary_mode: Option<SummaryMode>,
    pub tag_status: FieldStatus,
    pub last_updated: Option<String>,
}

impl NoteBuilderContext {
    /// Skeleton context for a PDF whose metadata hasn't resolved yet — not
    /// normally reachable by C9, which only runs after resolution succeeds,
    /// but kept for callers (e.g. tests) that want a bare starting point.
    pub fn skeleton(pdf_path: impl Into<PathBuf>) -> Self {
        let pdf_path = pdf_path.into();
        let title = pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            title,
            citekey: None,
            year: None,
            authors: Vec::new(),
            venue: None,
            doi: None,
            url: None,
            pdf_path,
            abstract_text: None,
            highlights: Vec::new(),
            tags: Vec::new(),
            generated_tags: Vec::new(),
            generated_summary: None,
            summary_status: FieldStatus::Pending,
            summary_mode: None,
            tag_status: FieldStatus::Pending,
            last_updated: None,
        }
    }

    pub fn with_generated_summary(mut self, summary: String, mode: SummaryMode) -> Self {
        self.generated_summary = Some(summary);
        self.summary_status = FieldStatus::Done;
        self.summary_mode = Some(mode);
        self
    }

    pub fn with_summary_status(mut self, status: FieldStatus, mode: Option<SummaryMode>) -> Self {
        self.summary_status = status;
        self.summary_mode = mode;
        self
    }

    pub fn with_generated_tags(mut self, tags: Vec<String>) -> Self {
        self.generated_tags = tags;
        self.tag_status = FieldStatus::Done;
        self
    }

    pub fn with_tag_status(mut self, status: FieldStatus) -> Self {
        self.tag_status = status;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_last_updated(mut self, timestamp: impl Into<String>) -> Self {
        self.last_updated = Some(timestamp.into());
        self
    }
}

/// `DateTime<Utc>::now()` formatted the way `zotomatic_last_updated` expects
/// it: ISO-8601 with a `Z` suffix.
pub fn now_iso8601() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Resolves an absolute, canonical-enough path for use as a `FileState` /
/// `PendingEntry` primary key. Does not require the path to exist.
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
