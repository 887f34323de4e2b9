//! Embedding service trait.

use async_trait::async_trait;

use crate::error::Result;

/// A service that turns text into fixed-length vectors.
///
/// The same implementation (and model) must be used to build an index and to
/// embed the queries run against it, otherwise scores compare vectors from
/// different spaces. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// calls [`embed`](EmbeddingProvider::embed) once per input, in order.
///
/// # Example
///
/// ```rust,ignore
/// use chatdoc::EmbeddingProvider;
///
/// let embedding = provider.embed("hello world").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, one per input.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// A short name for logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }
}
