//! Configuration for a chat session.

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// Default Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Configuration parameters for a [`ChatSession`](crate::ChatSession).
///
/// Every session receives its own copy, so sessions with different settings
/// can live side by side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks handed to the language model.
    pub top_k: usize,
    /// Minimum relevance score in `[0, 1]`; chunks scoring below it are dropped.
    pub score_threshold: f32,
    /// Language model used to answer questions.
    pub model: String,
    /// Embedding model used for both indexing and queries.
    pub embedding_model: String,
    /// Base URL of the model server.
    pub base_url: String,
    /// Timeout applied to each request to an external service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 100,
            top_k: 3,
            score_threshold: 0.2,
            model: "mistral".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl ChatConfig {
    /// Create a new builder for constructing a [`ChatConfig`].
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `score_threshold` is outside `[0, 1]`
    /// - `model` or `embedding_model` is empty
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChatError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChatError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(ChatError::Config("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ChatError::Config(format!(
                "score_threshold ({}) must be within [0, 1]",
                self.score_threshold
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ChatError::Config("model must not be empty".to_string()));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(ChatError::Config("embedding_model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`ChatConfig`].
#[derive(Debug, Clone, Default)]
pub struct ChatConfigBuilder {
    config: ChatConfig,
}

impl ChatConfigBuilder {
    /// Start from an existing configuration instead of the defaults.
    pub fn from_config(config: ChatConfig) -> Self {
        Self { config }
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum relevance score.
    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.config.score_threshold = threshold;
        self
    }

    /// Set the language model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the embedding model name.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the model server base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set a per-request timeout for external services.
    pub fn request_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Build the [`ChatConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`ChatConfig::validate`].
    pub fn build(self) -> Result<ChatConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
