use std::path::PathBuf;

use zotomatic_core::SummaryMode;

/// Minimal input required to generate a summary: the prompting strategy and
/// the PDF to read from (`spec.md` §4.4).
#[derive(Debug, Clone)]
pub struct SummaryContext {
    pub mode: SummaryMode,
    pub pdf_path: PathBuf,
    pub language: String,
}

/// Minimal input required to generate tags.
#[derive(Debug, Clone)]
pub struct TagsContext {
    pub paper_title: String,
    pub pdf_path: PathBuf,
    pub language: String,
    pub max_tags: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SummaryResult {
    pub mode: Option<SummaryMode>,
    pub summary: String,
}

impl SummaryResult {
    pub fn empty(mode: SummaryMode) -> Self {
        Self { mode: Some(mode), summary: String::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagResult {
    pub tags: Vec<String>,
}

impl TagResult {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// A single chat turn sent to a provider's completion endpoint.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }
}

/// A section heading plus a short preview, used by **standard**-mode
/// summaries (`spec.md` §4.4).
#[derive(Debug, Clone)]
pub struct SectionSnippet {
    pub title: String,
    pub preview: String,
}
