//! Shared data model for the Zotomatic PDF ingestion engine.
//!
//! This crate holds no I/O and no business logic — just the types that
//! flow between components (`FileState`, `PendingEntry`,
//! `NoteBuilderContext`, …) so that `zotomatic-storage`, `zotomatic-notes`,
//! `zotomatic-resolver`, `zotomatic-llm`, `zotomatic-watch`, and
//! `zotomatic-daemon` can agree on a vocabulary without depending on each
//! other.

mod model;

pub use model::{
    absolute_path, meta_keys, now_iso8601, DirectoryState, FieldStatus, FileState, Note,
    NoteBuilderContext, NoteFrontmatter, SummaryMode, ZoteroAttachmentState,
};
pub use model::PendingEntry;
