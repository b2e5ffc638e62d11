use thiserror::Error;

/// Thrown by [`crate::build_llm_client`] when the resolved provider's
/// required credentials are absent. Caught by the orchestrator, which
/// disables the AI enrichment client entirely rather than failing the run
/// (`spec.md` §7).
#[derive(Debug, Error)]
pub enum LlmConfigError {
    #[error("`llm.provider` must be configured before using the LLM client")]
    MissingProvider,

    #[error("unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    #[error("`llm.providers.{provider}.api_key` must be configured before using the LLM client")]
    MissingApiKey { provider: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Thrown by a provider at call time (quota, HTTP 4xx/5xx). Caught by the
/// note workflow (C9); the corresponding field status is left `pending`
/// rather than the error propagating (`spec.md` §7).
#[derive(Debug, Error)]
pub enum LlmApiError {
    #[error("LLM API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse LLM API response: {0}")]
    Json(#[from] serde_json::Error),
}
