use thiserror::Error;

/// C1 could not commit. The transaction is rolled back; the caller never
/// sees a partial write (`spec.md` §4.1, §7).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to open state database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
}
