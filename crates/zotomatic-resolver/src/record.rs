use std::path::Path;

use zotomatic_core::NoteBuilderContext;

/// Bibliographic record resolved for a PDF, as returned by [`crate::MetadataResolver`].
///
/// Carries a superset of what `NoteBuilderContext` needs — the resolver
/// crate doesn't know about note rendering, so the workflow (C9) converts
/// via [`MetadataRecord::into_context`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataRecord {
    pub citekey: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub abstract_text: Option<String>,
    pub highlights: Vec<String>,
    pub tags: Vec<String>,
    /// The attachment item that pointed at this PDF — cached by the caller
    /// to avoid re-scanning the attachment list on every boot (`spec.md` §3,
    /// `ZoteroAttachmentState`).
    pub attachment_key: Option<String>,
    pub parent_key: Option<String>,
}

impl MetadataRecord {
    /// Builds the immutable input to the note workflow (C9) from a resolved
    /// record, falling back to the PDF's filename stem when Zotero has no
    /// title on file.
    pub fn into_context(self, pdf_path: &Path) -> NoteBuilderContext {
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| {
                pdf_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

        let mut context = NoteBuilderContext::skeleton(pdf_path);
        context.title = title;
        context.citekey = self.citekey;
        context.year = self.year;
        context.authors = self.authors;
        context.venue = self.venue;
        context.doi = self.doi;
        context.url = self.url;
        context.abstract_text = self.abstract_text;
        context.highlights = self.highlights;
        context.tags = self.tags;
        context
    }
}
