use thiserror::Error;

/// C3 failures. A resolver returning `Err` here is what the pending queue
/// processor (C8) retries with backoff; a resolver returning `Ok(None)`
/// (simply "not in the library yet") is not an error at all (`spec.md`
/// §4.3, §7).
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("zotero API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("zotero API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse zotero API response: {0}")]
    Json(#[from] serde_json::Error),
}
