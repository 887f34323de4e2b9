//! Ollama client for embeddings and text generation.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use tracing::{debug, error};

use crate::config::{ChatConfig, DEFAULT_BASE_URL};
use crate::embedding::EmbeddingProvider;
use crate::error::{ChatError, Result};
use crate::llm::LanguageModel;

const SERVICE: &str = "Ollama";
const DEFAULT_PORT: u16 = 11434;

/// An [`EmbeddingProvider`] and [`LanguageModel`] backed by an Ollama server.
///
/// Wraps [`ollama_rs::Ollama`]: embeddings go through `/api/embed` and answers
/// through `/api/generate` (non-streaming).
///
/// # Configuration
///
/// - `base_url` – defaults to `http://localhost:11434`, or `OLLAMA_HOST` via [`from_env`](Self::from_env).
/// - `model` – the generation model, defaults to `mistral`.
/// - `embedding_model` – defaults to `nomic-embed-text`.
///
/// # Example
///
/// ```rust,ignore
/// use chatdoc::ollama::OllamaClient;
///
/// let client = OllamaClient::from_config(&ChatConfig::default())?;
/// let answer = client.generate("Why is the sky blue?").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OllamaClient {
    ollama: Ollama,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl OllamaClient {
    /// Create a client without a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] if `base_url` is not a valid URL.
    pub fn new(
        base_url: impl AsRef<str>,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url.as_ref());
        let ollama = connect(&base_url, reqwest::Client::new())?;
        Ok(Self { ollama, base_url, model: model.into(), embedding_model: embedding_model.into() })
    }

    /// Create a client from the model names, URL and timeout in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] if the URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let mut client = Self::new(&config.base_url, &config.model, &config.embedding_model)?;
        if let Some(secs) = config.request_timeout_secs {
            client = client.with_timeout(Duration::from_secs(secs))?;
        }
        Ok(client)
    }

    /// Create a client from the defaults, honouring the `OLLAMA_HOST` environment variable.
    pub fn from_env() -> Result<Self> {
        let mut config = ChatConfig::default();
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config.base_url = host;
        }
        Self::from_config(&config)
    }

    /// Apply a timeout to every request.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        self.ollama = connect(&self.base_url, client)?;
        Ok(self)
    }

    /// The server URL, normalized to `scheme://host[:port]`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn service_error(&self, action: &str, e: impl std::fmt::Display) -> ChatError {
        error!(provider = SERVICE, url = %self.base_url, error = %e, "{action} failed");
        ChatError::generation(SERVICE, format!("{action} failed: {e}"))
    }
}

fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }
    let url = url.trim_end_matches('/');
    if url.contains("://") { url.to_string() } else { format!("http://{url}") }
}

/// Split `base_url` into the host and port `ollama-rs` expects.
fn connect(base_url: &str, client: reqwest::Client) -> Result<Ollama> {
    let invalid = |reason: String| ChatError::Config(format!("invalid Ollama URL '{base_url}': {reason}"));

    let url = reqwest::Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    let host = url.host_str().ok_or_else(|| invalid("missing host".to_string()))?;
    let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);

    Ok(Ollama::new_with_client(format!("{}://{host}", url.scheme()), port, client))
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = SERVICE, model = %self.embedding_model, text_len = text.len(), "embedding text");

        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );
        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|e| self.service_error("embedding request", e))?;

        match response.embeddings.into_iter().next() {
            Some(embedding) if !embedding.is_empty() => Ok(embedding),
            _ => Err(ChatError::generation(
                SERVICE,
                format!("model '{}' returned an empty embedding", self.embedding_model),
            )),
        }
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = SERVICE, model = %self.embedding_model, batch_size = texts.len(), "embedding batch");

        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::Multiple(texts.iter().map(|t| t.to_string()).collect()),
        );
        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|e| self.service_error("embedding request", e))?;

        if response.embeddings.len() != texts.len() {
            return Err(ChatError::generation(
                SERVICE,
                format!("returned {} embeddings for {} texts", response.embeddings.len(), texts.len()),
            ));
        }
        Ok(response.embeddings)
    }

    fn name(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = SERVICE, model = %self.model, prompt_len = prompt.len(), "generating");

        let request = GenerationRequest::new(self.model.clone(), prompt.to_string());
        let response =
            self.ollama.generate(request).await.map_err(|e| self.service_error("generate request", e))?;
        Ok(response.response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
