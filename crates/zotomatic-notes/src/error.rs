use thiserror::Error;

/// C2 failures. Everything here is about the filesystem or a malformed
/// existing note — never about missing settings, which `zotomatic-config`
/// owns (`spec.md` §7).
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("failed to read note at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write note at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create notes directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
