//! Command-line arguments.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chatdoc::{ChatConfig, ChatConfigBuilder};
use clap::Parser;

/// Ask questions about a PDF, HTML or text document using a local Ollama model.
#[derive(Debug, Parser)]
#[command(name = "chatdoc", version, about)]
pub struct Cli {
    /// Path to the document (pdf, html, txt); omit to chat with the model directly
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Ask a single question and exit; omit for interactive mode
    #[arg(short, long)]
    pub text: Option<String>,

    /// Language model used to answer (default: mistral)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Embedding model used for indexing and queries
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_HOST")]
    pub base_url: Option<String>,

    /// Maximum chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Number of chunks given to the model as context
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Minimum relevance score in [0, 1]
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Per-request timeout for the Ollama server, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// JSON file with a base configuration; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Merge the config file (if any) with command-line overrides.
    pub fn resolve_config(&self) -> anyhow::Result<ChatConfig> {
        let base = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_json::from_str::<ChatConfig>(&raw)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => ChatConfig::default(),
        };

        let mut builder = ChatConfigBuilder::from_config(base);
        if let Some(model) = &self.model {
            builder = builder.model(model);
        }
        if let Some(model) = &self.embedding_model {
            builder = builder.embedding_model(model);
        }
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        if let Some(size) = self.chunk_size {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = self.chunk_overlap {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(k) = self.top_k {
            builder = builder.top_k(k);
        }
        if let Some(threshold) = self.score_threshold {
            builder = builder.score_threshold(threshold);
        }
        if self.timeout_secs.is_some() {
            builder = builder.request_timeout_secs(self.timeout_secs);
        }

        Ok(builder.build()?)
    }
}
