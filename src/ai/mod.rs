//! Generative-language backends
//!
//! The proxy only sees [`LanguageModel`]; the Gemini REST client is the
//! production implementation.

pub mod gemini;

use async_trait::async_trait;

use crate::Result;
use crate::models::ChatTurn;

pub use gemini::GeminiClient;

/// A remote text-generation service
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Single-shot completion. A reply without any text is a format error.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Continue a conversation. `history` is forwarded in order; an empty
    /// string means the provider returned no text.
    async fn converse(&self, system: &str, history: &[ChatTurn], message: &str) -> Result<String>;
}
