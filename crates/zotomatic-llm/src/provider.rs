use async_trait::async_trait;
use zotomatic_core::SummaryMode;

use crate::error::LlmApiError;
use crate::pdf_text::{NullPdfTextSource, PdfTextSource};
use crate::prompts;
use crate::types::{ChatMessage, SummaryContext, SummaryResult, TagResult, TagsContext};

/// Per-call token budgets for one prompting stage. Providers differ here:
/// Gemini's `max_tokens` also counts its internal "thinking" tokens, so its
/// budgets run well above OpenAI's for the same stage (`spec.md` §4.4).
#[derive(Debug, Clone, Copy)]
pub struct TokenBudgets {
    pub quick: u32,
    pub standard: u32,
    pub deep_chunk: u32,
    pub deep_reduce: u32,
    pub tags: u32,
}

/// The raw chat-completion call a provider backend must support. Kept
/// separate from [`LlmProvider`] so the summary/tag template logic lives
/// once, in [`LlmClient`], instead of being duplicated per provider.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String, LlmApiError>;

    fn token_budgets(&self) -> TokenBudgets;

    async fn close(&self) {}
}

/// Object-safe façade used by the daemon (C9) to generate summaries and
/// tags without caring which provider backs the call. Per `spec.md` §4.4
/// and §7, both methods swallow provider errors and return an empty
/// result — the note workflow leaves the corresponding field `pending`
/// rather than failing the run.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_summary(&self, context: &SummaryContext) -> SummaryResult;
    async fn generate_tags(&self, context: &TagsContext) -> TagResult;
    async fn close(&self);
}

/// Shared template logic over any [`ChatBackend`]: quick/standard/deep
/// summary modes and tag generation, mirroring
/// `original_source::llm.client.BaseLLMClient`.
pub struct LlmClient<B: ChatBackend> {
    backend: B,
    pdf_text: Box<dyn PdfTextSource>,
}

impl<B: ChatBackend> LlmClient<B> {
    pub fn new(backend: B) -> Self {
        Self::with_pdf_text_source(backend, Box::new(NullPdfTextSource))
    }

    pub fn with_pdf_text_source(backend: B, pdf_text: Box<dyn PdfTextSource>) -> Self {
        Self { backend, pdf_text }
    }

    async fn summarize_quick(&self, language: &str, abstract_text: &str) -> Result<String, LlmApiError> {
        let messages = prompts::summary_quick(language, abstract_text);
        self.backend.chat_completion(&messages, self.backend.token_budgets().quick).await
    }

    async fn summarize_standard(&self, language: &str, abstract_text: &str, pdf_path: &std::path::Path) -> Result<String, LlmApiError> {
        let snippets = self.pdf_text.section_snippets(pdf_path);
        let samples = prompts::render_section_samples(&snippets);
        let messages = prompts::summary_standard(language, abstract_text, &samples);
        self.backend.chat_completion(&messages, self.backend.token_budgets().standard).await
    }

    async fn summarize_deep(&self, language: &str, abstract_text: &str, pdf_path: &std::path::Path) -> Result<String, LlmApiError> {
        let chunks = self.pdf_text.chunks(pdf_path);
        if chunks.is_empty() {
            return self.summarize_standard(language, abstract_text, pdf_path).await;
        }
        let chunk_count = chunks.len();
        let mut chunk_summaries = Vec::with_capacity(chunk_count);
        for (index, chunk) in chunks.iter().enumerate() {
            let messages = prompts::summary_deep_chunk(language, index + 1, chunk_count, 3, 5, chunk);
            let summary = self
                .backend
                .chat_completion(&messages, self.backend.token_budgets().deep_chunk)
                .await?;
            chunk_summaries.push(summary);
        }
        let combined = chunk_summaries.join("\n");
        let messages = prompts::summary_deep_reduce(language, 6, 8, abstract_text, &combined);
        self.backend.chat_completion(&messages, self.backend.token_budgets().deep_reduce).await
    }
}

#[async_trait]
impl<B: ChatBackend> LlmProvider for LlmClient<B> {
    async fn generate_summary(&self, context: &SummaryContext) -> SummaryResult {
        let abstract_text = self
            .pdf_text
            .abstract_candidate(&context.pdf_path)
            .unwrap_or_default();

        let result = match context.mode {
            SummaryMode::Quick => self.summarize_quick(&context.language, &abstract_text).await,
            SummaryMode::Standard => {
                self.summarize_standard(&context.language, &abstract_text, &context.pdf_path).await
            }
            SummaryMode::Deep => {
                self.summarize_deep(&context.language, &abstract_text, &context.pdf_path).await
            }
        };

        match result {
            Ok(summary) if !summary.trim().is_empty() => {
                SummaryResult { mode: Some(context.mode), summary: summary.trim().to_string() }
            }
            Ok(_) => SummaryResult::empty(context.mode),
            Err(error) => {
                tracing::warn!(%error, mode = ?context.mode, "LLM summary generation failed, leaving field pending");
                SummaryResult::empty(context.mode)
            }
        }
    }

    async fn generate_tags(&self, context: &TagsContext) -> TagResult {
        let abstract_text = self
            .pdf_text
            .abstract_candidate(&context.pdf_path)
            .unwrap_or_default();
        let messages = prompts::tags(&context.language, &abstract_text, &context.paper_title, context.max_tags);

        let raw = match self
            .backend
            .chat_completion(&messages, self.backend.token_budgets().tags)
            .await
        {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(%error, "LLM tag generation failed, leaving field pending");
                return TagResult::default();
            }
        };

        let mut seen = std::collections::HashSet::new();
        let tags: Vec<String> = raw
            .split(',')
            .map(|t| t.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .take(context.max_tags)
            .collect();

        TagResult { tags }
    }

    async fn close(&self) {
        self.backend.close().await
    }
}
