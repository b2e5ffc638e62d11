use thiserror::Error;

use zotomatic_notes::NoteError;
use zotomatic_resolver::ResolverError;
use zotomatic_storage::StorageError;

/// Failures raised out of the note workflow (C9). `Note` is swallowed by the
/// orchestrator into the run summary's `errors` bucket rather than
/// propagated; `Resolver`/`Unresolved` are genuinely transient and bubble up
/// to the pending queue processor (C8), which backs off (`spec.md` §4.8–§4.9).
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Note(#[from] NoteError),

    #[error("metadata resolution failed: {0}")]
    Resolver(#[from] ResolverError),

    #[error("PDF no longer resolvable: {0}")]
    Unresolved(String),
}

/// Failures raised out of the engine orchestrator (C10) and its `scan` run
/// modes.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Watcher(#[from] zotomatic_watch::WatcherError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Config(#[from] zotomatic_config::ConfigError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error("path does not exist or is not a regular file: {0}")]
    InvalidPath(String),

    #[error("watcher task panicked")]
    WatcherPanic,
}
