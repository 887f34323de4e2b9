//! Chat session over one loaded document.
//!
//! A [`ChatSession`] is either **Empty** or **Ready**:
//!
//! - `ingest` success: Empty/Ready → Ready (the previous index is dropped, never merged)
//! - `ingest` failure: state unchanged
//! - `ask`: Ready → Ready; on Empty it fails with [`ChatError::NoDocumentLoaded`]
//!   without touching any external service
//! - `clear`: → Empty
//!
//! # Example
//!
//! ```rust,ignore
//! use chatdoc::{ChatConfig, ChatSession};
//!
//! let mut session = ChatSession::builder()
//!     .config(ChatConfig::default())
//!     .embedding_provider(embedder)
//!     .language_model(model)
//!     .build()?;
//!
//! session.ingest_file("paper.pdf").await?;
//! let answer = session.ask("What does this paper mainly talk about?").await?;
//! session.clear();
//! ```
//!
//! Sessions are not meant to be shared between concurrent conversations:
//! `ingest` takes `&mut self`, so sharing one requires an external lock.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::chain::QaChain;
use crate::chunking::{Chunker, RecursiveChunker};
use crate::composer::{AnswerComposer, PromptTemplate};
use crate::config::ChatConfig;
use crate::document::{Document, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{ChatError, Result};
use crate::index::{InMemoryIndex, VectorIndex};
use crate::llm::LanguageModel;
use crate::loader::{DocumentLoader, FileLoader};
use crate::retriever::Retriever;

/// Whether a session has a document loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Empty,
    Ready,
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// The ingested document's ID.
    pub document_id: String,
    /// Number of chunks indexed.
    pub chunk_count: usize,
    /// Embedding dimensionality reported by the index.
    pub dimensions: Option<usize>,
}

struct ActiveDocument {
    document_id: String,
    chain: QaChain,
}

/// Owns the index, retriever and composer for one loaded document.
///
/// Construct one via [`ChatSession::builder()`].
pub struct ChatSession {
    config: ChatConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn LanguageModel>,
    chunker: Arc<dyn Chunker>,
    loader: Arc<dyn DocumentLoader>,
    template: PromptTemplate,
    active: Option<ActiveDocument>,
}

impl ChatSession {
    /// Create a new [`ChatSessionBuilder`].
    pub fn builder() -> ChatSessionBuilder {
        ChatSessionBuilder::default()
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Current [`SessionState`].
    pub fn state(&self) -> SessionState {
        if self.active.is_some() { SessionState::Ready } else { SessionState::Empty }
    }

    /// Whether a document is loaded.
    pub fn is_ready(&self) -> bool {
        self.active.is_some()
    }

    /// ID of the loaded document, if any.
    pub fn document_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.document_id.as_str())
    }

    /// Chunk, embed and index `document`, replacing any previously loaded one.
    ///
    /// The new index is built completely before it replaces the old one, so a
    /// failure leaves the session exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyDocument`] if there is nothing to chunk and
    /// [`ChatError::Generation`] if the embedding service fails.
    pub async fn ingest(&mut self, document: Document) -> Result<IngestSummary> {
        let document_id = document.id.clone();

        let outcome = self.build_chain(document).await;
        let (chain, summary) = match outcome {
            Ok(built) => built,
            Err(e) => {
                warn!(document.id = %document_id, error = %e, state = ?self.state(), "ingest failed, keeping previous state");
                return Err(e);
            }
        };

        if let Some(previous) = self.active.replace(ActiveDocument { document_id, chain }) {
            info!(document.id = %previous.document_id, "discarded previous document");
        }
        info!(
            document.id = %summary.document_id,
            chunk_count = summary.chunk_count,
            "ingested document"
        );
        Ok(summary)
    }

    /// Load the file at `path` (format from its extension) and ingest it.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::UnsupportedFormat`] or [`ChatError::DocumentLoad`]
    /// from the loader, plus everything [`ingest`](Self::ingest) can return.
    pub async fn ingest_file(&mut self, path: impl AsRef<Path>) -> Result<IngestSummary> {
        let path = path.as_ref();
        let document = self.loader.load_path(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to load document");
            e
        })?;
        self.ingest(document).await
    }

    /// Answer `question` from the loaded document.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NoDocumentLoaded`] when the session is Empty, and
    /// [`ChatError::Generation`] if the embedding or language-model service fails.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let active = self.active.as_ref().ok_or(ChatError::NoDocumentLoaded)?;
        active.chain.invoke(question).await
    }

    /// Run only the retrieval stage for `question`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NoDocumentLoaded`] when the session is Empty.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        let active = self.active.as_ref().ok_or(ChatError::NoDocumentLoaded)?;
        active.chain.retrieve(question).await
    }

    /// Drop the loaded document's index, retriever and composer.
    pub fn clear(&mut self) {
        if let Some(previous) = self.active.take() {
            info!(document.id = %previous.document_id, "cleared session");
        }
    }

    async fn build_chain(&self, document: Document) -> Result<(QaChain, IngestSummary)> {
        let chunks = self.chunker.chunk(&document)?;
        let document_id = document.id;

        let index = InMemoryIndex::build(chunks, self.embedder.as_ref()).await?;
        let summary =
            IngestSummary { document_id, chunk_count: index.len(), dimensions: index.dimensions() };

        let retriever =
            Retriever::new(Arc::new(index), Arc::clone(&self.embedder)).with_config(&self.config);
        let composer =
            AnswerComposer::new(Arc::clone(&self.model)).with_template(self.template.clone());

        Ok((QaChain::new(retriever, composer), summary))
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("config", &self.config)
            .field("embedder", &self.embedder.name())
            .field("model", &self.model.name())
            .field("document_id", &self.document_id())
            .finish()
    }
}

/// Builder for constructing a [`ChatSession`].
///
/// The embedding provider and language model are required. The config
/// defaults to [`ChatConfig::default()`], the chunker to a
/// [`RecursiveChunker`] sized from the config, the loader to [`FileLoader`]
/// and the template to [`PromptTemplate::default()`].
#[derive(Default)]
pub struct ChatSessionBuilder {
    config: Option<ChatConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    model: Option<Arc<dyn LanguageModel>>,
    chunker: Option<Arc<dyn Chunker>>,
    loader: Option<Arc<dyn DocumentLoader>>,
    template: Option<PromptTemplate>,
}

impl ChatSessionBuilder {
    /// Set the configuration. Defaults to [`ChatConfig::default()`].
    pub fn config(mut self, config: ChatConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider used for chunks and questions (required).
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    /// Set the language model that writes answers (required).
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Override the chunker sized from the config.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the loader used by [`ChatSession::ingest_file`].
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Override the prompt template.
    pub fn prompt_template(mut self, template: PromptTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Build the [`ChatSession`] in the Empty state.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] if a required part is missing or the
    /// config is invalid.
    pub fn build(self) -> Result<ChatSession> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedder = self
            .embedder
            .ok_or_else(|| ChatError::Config("embedding_provider is required".to_string()))?;
        let model =
            self.model.ok_or_else(|| ChatError::Config("language_model is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)?),
        };

        Ok(ChatSession {
            config,
            embedder,
            model,
            chunker,
            loader: self.loader.unwrap_or_else(|| Arc::new(FileLoader)),
            template: self.template.unwrap_or_default(),
            active: None,
        })
    }
}
