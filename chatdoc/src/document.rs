//! Data types for documents, chunks, and retrieval results.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// The source format a document was extracted from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// HTML markup.
    Html,
    /// Plain text.
    Text,
}

impl DocumentFormat {
    /// Determine the format from a file extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::UnsupportedFormat`] for unknown or missing extensions.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "html" | "htm" => Ok(Self::Html),
            "txt" | "text" | "md" => Ok(Self::Text),
            _ => Err(ChatError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// The short tag used in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw document text plus the format it came from.
///
/// Documents are transient: the session drops them once they are chunked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier of the document, usually its path.
    pub id: String,
    /// The extracted plain text.
    pub text: String,
    /// The source format.
    pub format: DocumentFormat,
    /// Key-value metadata copied onto every chunk.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>, format: DocumentFormat) -> Self {
        Self { id: id.into(), text: text.into(), format, metadata: HashMap::new() }
    }

    /// Create a plain-text document.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, text, DocumentFormat::Text)
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A retrievable segment of a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_{index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Position of the chunk within its ingestion, starting at zero.
    pub index: usize,
    /// Character offset of the chunk's first character in the document.
    pub start: usize,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
}

/// A [`Chunk`] paired with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Relevance in `[0, 1]` (higher is more relevant).
    pub score: f32,
}

/// Chunks retrieved for one query, best first.
///
/// Created per query and never persisted. An empty result is a valid outcome
/// meaning "no relevant context".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Wrap hits that are already ranked.
    pub fn new(hits: Vec<ScoredChunk>) -> Self {
        Self { hits }
    }

    /// The ranked hits.
    pub fn hits(&self) -> &[ScoredChunk] {
        &self.hits
    }

    /// Iterate over the ranked chunks, dropping scores.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.hits.iter().map(|hit| &hit.chunk)
    }

    /// Number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether nothing cleared the score threshold.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Consume the result, yielding the ranked hits.
    pub fn into_hits(self) -> Vec<ScoredChunk> {
        self.hits
    }
}

impl IntoIterator for RetrievalResult {
    type Item = ScoredChunk;
    type IntoIter = std::vec::IntoIter<ScoredChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}
