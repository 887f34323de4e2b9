//! Language-model service trait.

use async_trait::async_trait;

use crate::error::Result;

/// A text-completion service.
///
/// Requests are single-shot: the full prompt goes in, the full response comes
/// back. Streaming is left to front ends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` and return the raw response text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// The model name, for logs and error messages.
    fn name(&self) -> &str;
}
