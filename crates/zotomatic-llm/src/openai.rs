use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmApiError;
use crate::provider::{ChatBackend, TokenBudgets};
use crate::types::ChatMessage;

/// Backend for OpenAI-compatible `/chat/completions` endpoints (OpenAI
/// itself and any self-hosted gateway exposing the same shape).
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiBackend {
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
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn chat_completion(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String, LlmApiError> {
        let body = ChatRequest {
            model: &self.model,
            messages: messages.iter().map(|m| WireMessage { role: m.role, content: &m.content }).collect(),
            max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LlmApiError::Api { status: status.as_u16(), message: text });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn token_budgets(&self) -> TokenBudgets {
        TokenBudgets { quick: 600, standard: 900, deep_chunk: 400, deep_reduce: 900, tags: 400 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_the_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "a concise summary"}}]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(server.uri(), "sk-test", "gpt-4o-mini", Duration::from_secs(5)).unwrap();
        let messages = vec![ChatMessage::user("summarize this")];
        let result = backend.chat_completion(&messages, 600).await.unwrap();
        assert_eq!(result, "a concise summary");
    }

    #[tokio::test]
    async fn surfaces_non_success_status_as_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(server.uri(), "sk-test", "gpt-4o-mini", Duration::from_secs(5)).unwrap();
        let messages = vec![ChatMessage::user("summarize this")];
        let error = backend.chat_completion(&messages, 600).await.unwrap_err();
        assert!(matches!(error, LlmApiError::Api { status: 429, .. }));
    }
}
