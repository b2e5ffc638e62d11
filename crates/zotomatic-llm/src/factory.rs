use std::time::Duration;

use zotomatic_config::{provider_defaults, LlmConfig};

use crate::error::LlmConfigError;
use crate::gemini::GeminiBackend;
use crate::openai::OpenAiBackend;
use crate::provider::{LlmClient, LlmProvider};

/// Resolves `llm.provider` plus its per-provider overrides into a live
/// client. Mirrors `original_source::llm.client.build_llm_client`'s
/// provider dispatch and default-filling (`spec.md` §4.4).
pub fn build_llm_client(config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmConfigError> {
    let provider = config.provider.as_deref().ok_or(LlmConfigError::MissingProvider)?;

    let defaults = provider_defaults(provider)
        .ok_or_else(|| LlmConfigError::UnsupportedProvider(provider.to_string()))?;
    let (default_model, default_base_url) = defaults;

    let settings = config.providers.get(provider).cloned().unwrap_or_default();
    let api_key = settings
        .api_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| LlmConfigError::MissingApiKey { provider: provider.to_string() })?;
    let base_url = settings.base_url.unwrap_or_else(|| default_base_url.to_string());
    let model = settings.model.unwrap_or_else(|| default_model.to_string());
    let timeout = Duration::from_secs_f64(config.timeout_seconds.max(0.0));

    match provider {
        "openai" => {
            let backend = OpenAiBackend::new(base_url, api_key, model, timeout)?;
            Ok(Box::new(LlmClient::new(backend)))
        }
        "gemini" => {
            let backend = GeminiBackend::new(base_url, api_key, model, timeout)?;
            Ok(Box::new(LlmClient::new(backend)))
        }
        other => Err(LlmConfigError::UnsupportedProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use zotomatic_config::LlmProviderSettings;

    fn base_config() -> LlmConfig {
        LlmConfig {
            provider: None,
            providers: HashMap::new(),
            timeout_seconds: 30.0,
            output_language: "en".into(),
            daily_call_limit: 0,
        }
    }

    #[test]
    fn missing_provider_is_an_error() {
        let config = base_config();
        assert!(matches!(build_llm_client(&config), Err(LlmConfigError::MissingProvider)));
    }

    #[test]
    fn unsupported_provider_is_an_error() {
        let mut config = base_config();
        config.provider = Some("anthropic".into());
        assert!(matches!(build_llm_client(&config), Err(LlmConfigError::UnsupportedProvider(_))));
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let mut config = base_config();
        config.provider = Some("openai".into());
        let error = build_llm_client(&config).unwrap_err();
        assert!(matches!(error, LlmConfigError::MissingApiKey { provider } if provider == "openai"));
    }

    #[test]
    fn fills_in_provider_defaults_when_api_key_present() {
        let mut config = base_config();
        config.provider = Some("openai".into());
        config.providers.insert(
            "openai".into(),
            LlmProviderSettings { api_key: Some("sk-test".into()), base_url: None, model: None },
        );
        assert!(build_llm_client(&config).is_ok());
    }
}
