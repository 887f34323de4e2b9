//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which cuts
//! a sliding window over the document and places each cut on the strongest
//! boundary available: paragraph, then sentence, then line, then word, and
//! finally a hard character cutoff.

use crate::config::ChatConfig;
use crate::document::{Chunk, Document};
use crate::error::{ChatError, Result};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into ordered chunks.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyDocument`] if the document has no extractable text.
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>>;
}

const PARAGRAPH: &[&str] = &["\n\n"];
const SENTENCE: &[&str] = &[". ", "! ", "? ", ".\n", "!\n", "?\n"];
const LINE: &[&str] = &["\n"];
const WORD: &[&str] = &[" ", "\t"];

/// Boundary levels, strongest first.
const LEVELS: [&[&str]; 4] = [PARAGRAPH, SENTENCE, LINE, WORD];

/// Splits text into overlapping chunks, preferring semantic boundaries.
///
/// Sizes and offsets are counted in characters, not bytes. Every chunk except
/// the last holds at most `chunk_size` characters, and each chunk starts exactly
/// `chunk_overlap` characters before the previous one ends. A trailing fragment
/// shorter than a quarter of `chunk_size` is folded into the last chunk instead
/// of being emitted on its own.
///
/// Chunk IDs are `{document_id}_{chunk_index}`. Each chunk inherits the parent
/// document's metadata plus `chunk_index` and `format`.
///
/// # Example
///
/// ```rust,ignore
/// use chatdoc::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1024, 100)?;
/// let chunks = chunker.chunk(&document)?;
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of characters shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] unless `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(ChatError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker using the sizes from a [`ChatConfig`].
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Maximum characters per chunk (the last chunk may run over).
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Compute `(start, end)` character ranges for the given text.
    fn windows(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let len = chars.len();
        let min_tail = self.chunk_size / 4;
        // A cut must leave fresh text after the overlap, and should not come too early.
        let min_advance = (self.chunk_overlap + 1).max(self.chunk_size / 3);

        let mut ranges = Vec::new();
        let mut start = 0;

        loop {
            if len - start <= self.chunk_size {
                ranges.push((start, len));
                break;
            }

            let max_end = start + self.chunk_size;
            let mut end = find_break(chars, start + min_advance, max_end).unwrap_or(max_end);
            if len - end < min_tail {
                end = len;
            }

            ranges.push((start, end));
            if end == len {
                break;
            }
            start = end - self.chunk_overlap;
        }

        ranges
    }
}

/// Find the rightmost cut position in `min_end..=max_end` at the strongest level.
///
/// A cut position is the index just past a separator, so the separator stays
/// with the preceding chunk.
fn find_break(chars: &[char], min_end: usize, max_end: usize) -> Option<usize> {
    LEVELS.iter().find_map(|separators| {
        (min_end..=max_end)
            .rev()
            .find(|&end| separators.iter().any(|separator| ends_with(chars, end, separator)))
    })
}

fn ends_with(chars: &[char], end: usize, separator: &str) -> bool {
    let width = separator.chars().count();
    end >= width && chars[end - width..end].iter().copied().eq(separator.chars())
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        if document.text.trim().is_empty() {
            return Err(ChatError::EmptyDocument { document_id: document.id.clone() });
        }

        let chars: Vec<char> = document.text.chars().collect();

        let chunks = self
            .windows(&chars)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), index.to_string());
                metadata.insert("format".to_string(), document.format.to_string());
                Chunk {
                    id: format!("{}_{index}", document.id),
                    text: chars[start..end].iter().collect(),
                    index,
                    start,
                    document_id: document.id.clone(),
                    metadata,
                }
            })
            .collect();

        Ok(chunks)
    }
}
