mod error;
mod factory;
mod gemini;
mod ledger;
mod openai;
mod pdf_text;
mod prompts;
mod provider;
mod types;

pub use error::{LlmApiError, LlmConfigError};
pub use factory::build_llm_client;
pub use gemini::GeminiBackend;
pub use ledger::UsageLedger;
pub use openai::OpenAiBackend;
pub use pdf_text::{NullPdfTextSource, PdfTextSource};
pub use provider::{ChatBackend, LlmClient, LlmProvider, TokenBudgets};
pub use types::{ChatMessage, SectionSnippet, SummaryContext, SummaryResult, TagResult, TagsContext};
