use std::path::Path;

use crate::types::SectionSnippet;

/// Seam onto PDF text extraction — deliberately not implemented here
/// (`spec.md` §1 lists PDF text extraction internals as out of scope). A
/// real deployment injects a provider backed by a PDF parser; tests inject
/// a stub; [`NullPdfTextSource`] is the no-op default so **quick** mode
/// (which needs nothing but an abstract) still degrades gracefully and
/// **deep** mode falls back to **standard** per `spec.md` §4.4.
pub trait PdfTextSource: Send + Sync {
    fn abstract_candidate(&self, pdf_path: &Path) -> Option<String>;
    fn section_snippets(&self, pdf_path: &Path) -> Vec<SectionSnippet>;
    fn chunks(&self, pdf_path: &Path) -> Vec<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullPdfTextSource;

impl PdfTextSource for NullPdfTextSource {
    fn abstract_candidate(&self, _pdf_path: &Path) -> Option<String> {
        None
    }

    fn section_snippets(&self, _pdf_path: &Path) -> Vec<SectionSnippet> {
        Vec::new()
    }

    fn chunks(&self, _pdf_path: &Path) -> Vec<String> {
        Vec::new()
    }
}
