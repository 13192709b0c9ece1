//! LLM abstraction and Gemini client.
//!
//! A completion backend turns one prompt into one reply. Failures are returned as `LlmError`;
//! substituting a fallback reply is the caller's job.

mod gemini;

use async_trait::async_trait;

pub use gemini::{GeminiClient, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion api error: {0}")]
    Api(String),
    #[error("completion returned no text")]
    EmptyResponse,
    #[error("completion backend not configured: {0}")]
    NotConfigured(&'static str),
}

/// Single-shot text completion.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name for logs (e.g. "gemini").
    fn name(&self) -> &str;
    /// Generate a reply for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}
