use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmApiError;
use crate::provider::{ChatBackend, TokenBudgets};
use crate::types::ChatMessage;

/// Backend for Google's Gemini `generateContent` endpoint. Gemini's
/// `maxOutputTokens` budget also covers the model's internal "thinking"
/// tokens, so every stage gets a noticeably larger budget than the
/// equivalent OpenAI call (`spec.md` §4.4).
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, LlmApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.3,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn chat_completion(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String, LlmApiError> {
        let system_instruction = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| Content { role: None, parts: vec![Part { text: &m.content }] });

        let contents = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                Content { role: Some(role), parts: vec![Part { text: &m.content }] }
            })
            .collect();

        let body = GenerateRequest {
            system_instruction,
            contents,
            generation_config: GenerationConfig { max_output_tokens: max_tokens, temperature: self.temperature },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(LlmApiError::Api { status: status.as_u16(), message });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default())
    }

    fn token_budgets(&self) -> TokenBudgets {
        TokenBudgets { quick: 1200, standard: 2000, deep_chunk: 1200, deep_reduce: 2200, tags: 800 }
    }
}
