//! # chatdoc
//!
//! Ask questions about a PDF, HTML or text document using retrieval-augmented
//! generation.
//!
//! ## Overview
//!
//! A [`ChatSession`] ingests one document at a time:
//!
//! - [`RecursiveChunker`] splits the text into overlapping chunks
//! - [`InMemoryIndex`] embeds every chunk through an [`EmbeddingProvider`]
//! - [`Retriever`] embeds each question and picks the top-k chunks above a score threshold
//! - [`AnswerComposer`] builds the prompt and calls the [`LanguageModel`]
//!
//! The embedding service and language model are traits; the `ollama` feature
//! (on by default) provides [`ollama::OllamaClient`] implementing both.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chatdoc::{ChatConfig, ChatSession, ollama::OllamaClient};
//!
//! let config = ChatConfig::default();
//! let ollama = Arc::new(OllamaClient::from_config(&config)?);
//!
//! let mut session = ChatSession::builder()
//!     .config(config)
//!     .embedding_provider(ollama.clone())
//!     .language_model(ollama)
//!     .build()?;
//!
//! session.ingest_file("paper.pdf").await?;
//! println!("{}", session.ask("What does this paper mainly talk about?").await?);
//! ```
//!
//! ## Features
//!
//! - `ollama` (default): Ollama embeddings and generation over HTTP
//! - `pdf`: PDF text extraction via `pdf-extract`

pub mod chain;
pub mod chunking;
pub mod composer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod loader;
pub mod retriever;
pub mod session;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use chain::QaChain;
pub use chunking::{Chunker, RecursiveChunker};
pub use composer::{AnswerComposer, DEFAULT_TEMPLATE, Prompt, PromptTemplate};
pub use config::{ChatConfig, ChatConfigBuilder};
pub use document::{Chunk, Document, DocumentFormat, RetrievalResult, ScoredChunk};
pub use embedding::EmbeddingProvider;
pub use error::{ChatError, Result};
pub use index::{InMemoryIndex, VectorIndex};
pub use llm::LanguageModel;
pub use loader::{DocumentLoader, FileLoader, html_to_text};
pub use retriever::Retriever;
pub use session::{ChatSession, ChatSessionBuilder, IngestSummary, SessionState};
