//! Configuration loading and layering for the Zotomatic engine.
//!
//! Precedence, lowest to highest: struct defaults, the TOML config file,
//! `ZOTOMATIC_*` environment variables, then explicit CLI overrides applied
//! by the caller after `Config::load` returns.

mod error;

pub use error::ConfigError;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zotomatic_core::SummaryMode;

fn default_true() -> bool {
    true
}

fn default_pdf_glob() -> String {
    "*.pdf".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_base_delay() -> u64 {
    5
}

fn default_max_delay() -> u64 {
    60
}

fn default_batch_limit() -> usize {
    50
}

fn default_loop_interval() -> u64 {
    3
}

fn default_max_attempts() -> u32 {
    10
}

fn default_llm_timeout() -> f64 {
    30.0
}

fn default_language() -> String {
    "en".to_string()
}

fn default_max_tags() -> usize {
    5
}

fn default_summary_mode() -> String {
    "quick".to_string()
}

/// Known LLM provider defaults, carried over from `original_source`'s
/// `LLM_PROVIDER_DEFAULTS`.
pub fn provider_defaults(provider: &str) -> Option<(&'static str, &'static str)> {
    match provider {
        "openai" => Some(("gpt-4o-mini", "https://api.openai.com/v1")),
        "gemini" => Some((
            "gemini-2.5-flash",
            "https://generativelanguage.googleapis.com/v1beta",
        )),
        _ => None,
    }
}

pub const KNOWN_PROVIDERS: &[&str] = &["openai", "gemini"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmProviderSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Option<String>,
    #[serde(default)]
    pub providers: HashMap<String, LlmProviderSettings>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: f64,
    #[serde(default = "default_language")]
    pub output_language: String,
    #[serde(default)]
    pub daily_call_limit: i64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: None,
            providers: HashMap::new(),
            timeout_seconds: default_llm_timeout(),
            output_language: default_language(),
            daily_call_limit: 0,
        }
    }
}

fn default_zotero_base_url() -> String {
    "https://api.zotero.org".to_string()
}

fn default_zotero_scope() -> String {
    "user".to_string()
}

/// Credentials and endpoint for the Zotero-backed metadata resolver (C3).
/// Field names mirror `original_source`'s flat `zotero_*` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoteroConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub library_id: String,
    /// `"user"` or `"group"` — selects the Zotero API path prefix.
    #[serde(default = "default_zotero_scope")]
    pub library_scope: String,
    #[serde(default = "default_zotero_base_url")]
    pub base_url: String,
}

impl Default for ZoteroConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            library_id: String::new(),
            library_scope: default_zotero_scope(),
            base_url: default_zotero_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConfig {
    #[serde(default = "default_base_delay")]
    pub base_delay_seconds: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: u64,
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    #[serde(default = "default_loop_interval")]
    pub loop_interval_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            base_delay_seconds: default_base_delay(),
            max_delay_seconds: default_max_delay(),
            batch_limit: default_batch_limit(),
            loop_interval_seconds: default_loop_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Top-level effective settings for a `zotomatic` run.
///
/// `pdf_library_dir` and `notes_output_dir` are the two settings
/// `original_source` raises `MissingSettingError` for; here they're plain
/// `Option<PathBuf>` in the raw struct and validated by [`Config::validate`]
/// once CLI overrides have been layered on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub pdf_library_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub pdf_scan_recursive: bool,
    #[serde(default = "default_pdf_glob")]
    pub pdf_glob_pattern: String,

    pub notes_output_dir: Option<PathBuf>,
    #[serde(default = "default_encoding")]
    pub notes_encoding: String,

    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub pending: PendingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub zotero: ZoteroConfig,

    #[serde(default = "default_true")]
    pub summary_enabled: bool,
    #[serde(default = "default_true")]
    pub tag_enabled: bool,
    #[serde(default = "default_summary_mode")]
    pub summary_mode: String,
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pdf_library_dir: None,
            pdf_scan_recursive: true,
            pdf_glob_pattern: default_pdf_glob(),
            notes_output_dir: None,
            notes_encoding: default_encoding(),
            state_dir: None,
            pending: PendingConfig::default(),
            llm: LlmConfig::default(),
            zotero: ZoteroConfig::default(),
            summary_enabled: true,
            tag_enabled: true,
            summary_mode: default_summary_mode(),
            max_tags: default_max_tags(),
        }
    }
}

impl Config {
    /// Loads the config file (if present), then layers `ZOTOMATIC_*`
    /// environment variable overrides on top. A missing file is not an
    /// error; a file that fails to parse is.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            _ => Config::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ZOTOMATIC_PDF_LIBRARY_DIR") {
            self.pdf_library_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_NOTES_OUTPUT_DIR") {
            self.notes_output_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_STATE_DIR") {
            self.state_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_SUMMARY_MODE") {
            self.summary_mode = v;
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_SUMMARY_ENABLED") {
            self.summary_enabled = parse_bool(&v, self.summary_enabled);
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_TAG_ENABLED") {
            self.tag_enabled = parse_bool(&v, self.tag_enabled);
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_LLM_PROVIDER") {
            self.llm.provider = Some(v);
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_LLM_DAILY_CALL_LIMIT") {
            if let Ok(n) = v.parse() {
                self.llm.daily_call_limit = n;
            }
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_PENDING_MAX_ATTEMPTS") {
            if let Ok(n) = v.parse() {
                self.pending.max_attempts = n;
            }
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_ZOTERO_API_KEY") {
            self.zotero.api_key = v;
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_ZOTERO_LIBRARY_ID") {
            self.zotero.library_id = v;
        }
        if let Ok(v) = std::env::var("ZOTOMATIC_ZOTERO_LIBRARY_SCOPE") {
            self.zotero.library_scope = v;
        }
    }

    /// Directory holding `zotomatic.db`, defaulting to `~/.zotomatic`.
    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".zotomatic")
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolved_state_dir().join("zotomatic.db")
    }

    pub fn summary_mode_enum(&self) -> SummaryMode {
        SummaryMode::parse(Some(&self.summary_mode))
    }

    /// Settings required before the engine can run. Bypassed entirely by
    /// tests that construct `Config` directly with both fields set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pdf_library_dir.is_none() {
            return Err(ConfigError::MissingSetting("pdf_library_dir".into()));
        }
        if self.notes_output_dir.is_none() {
            return Err(ConfigError::MissingSetting("notes_output_dir".into()));
        }
        if let Some(provider) = self.llm.provider.as_deref() {
            if !KNOWN_PROVIDERS.contains(&provider) {
                return Err(ConfigError::UnsupportedProvider(provider.to_string()));
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
