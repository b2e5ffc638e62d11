use thiserror::Error;

/// Fatal to the current run; surfaced by the orchestrator with exit code 1
/// (`spec.md` §7).
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to read watch root {path}: {source}")]
    ReadDir { path: String, source: std::io::Error },

    #[error("invalid glob pattern {pattern}: {source}")]
    InvalidGlob { pattern: String, source: globset::Error },

    #[error("failed to start filesystem subscription: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Storage(#[from] zotomatic_storage::StorageError),
}
