use thiserror::Error;

/// Configuration is missing or invalid. Fatal: surfaced by the orchestrator
/// before the main loop starts (`spec.md` §7).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path} as TOML: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required setting: {0}")]
    MissingSetting(String),

    #[error("unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
}
