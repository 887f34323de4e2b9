//! Question → relevant chunks.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::ChatConfig;
use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{ChatError, Result};
use crate::index::VectorIndex;

/// Finds the chunks most relevant to a question.
///
/// The retriever embeds the question with the same [`EmbeddingProvider`] that
/// built the index, then asks the index for the `top_k` chunks scoring at
/// least `min_score`. Finding nothing relevant yields an empty
/// [`RetrievalResult`], not an error.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    /// Bind a retriever to an index with the default `top_k = 3` and `min_score = 0.2`.
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let defaults = ChatConfig::default();
        Self { index, embedder, top_k: defaults.top_k, min_score: defaults.score_threshold }
    }

    /// Take `top_k` and the score threshold from a [`ChatConfig`].
    pub fn with_config(self, config: &ChatConfig) -> Self {
        self.with_top_k(config.top_k).with_min_score(config.score_threshold)
    }

    /// Set the maximum number of chunks returned per search.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the minimum relevance score a chunk needs to be returned.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Maximum number of chunks returned per search.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Minimum relevance score for a returned chunk.
    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// The index this retriever searches.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Embed `query` and return the best matching chunks.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Generation`] if the embedding service fails, and
    /// propagates index errors such as [`ChatError::DimensionMismatch`].
    pub async fn search(&self, query: &str) -> Result<RetrievalResult> {
        let vector = self.embedder.embed(query).await.map_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "query embedding failed");
            match e {
                ChatError::Generation { .. } => e,
                other => ChatError::generation(self.embedder.name(), other.to_string()),
            }
        })?;

        let result = self.index.query(&vector, self.top_k, self.min_score)?;
        debug!(result_count = result.len(), top_k = self.top_k, "retrieved chunks");
        Ok(result)
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("indexed", &self.index.len())
            .field("embedder", &self.embedder.name())
            .field("top_k", &self.top_k)
            .field("min_score", &self.min_score)
            .finish()
    }
}
