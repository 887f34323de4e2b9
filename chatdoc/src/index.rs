//! Vector index over embedded chunks.
//!
//! [`InMemoryIndex`] keeps `(chunk, embedding)` pairs in ingestion order and
//! answers queries with a linear cosine scan, so each query costs O(chunks).
//! That is fine for single documents; larger corpora can plug an approximate
//! nearest-neighbour structure in behind [`VectorIndex`] without touching the
//! retriever or the session.

use tracing::{debug, error, info};

use crate::document::{Chunk, RetrievalResult, ScoredChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{ChatError, Result};

/// A queryable store of chunk embeddings.
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` chunks scoring at least `min_score`, best first.
    ///
    /// Chunks with equal scores keep their ingestion order. Fewer than `k`
    /// results (possibly none) are returned when few chunks clear the threshold.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::IndexNotBuilt`] if the index holds no built data and
    /// [`ChatError::DimensionMismatch`] if `vector` does not match the index.
    fn query(&self, vector: &[f32], k: usize, min_score: f32) -> Result<RetrievalResult>;

    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality of the stored vectors, if known.
    fn dimensions(&self) -> Option<usize>;
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// An in-memory index scored by cosine similarity.
///
/// Scores are cosine similarities clamped to `[0, 1]`; opposite-facing vectors
/// count as irrelevant. The index is immutable once built and is rebuilt
/// wholesale for every ingestion.
///
/// # Example
///
/// ```rust,ignore
/// use chatdoc::{InMemoryIndex, VectorIndex};
///
/// let index = InMemoryIndex::build(chunks, &embedder).await?;
/// let result = index.query(&query_vector, 3, 0.2)?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    entries: Option<Vec<IndexEntry>>,
    dimensions: Option<usize>,
}

impl InMemoryIndex {
    /// Create an index that has not been built yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed every chunk with `embedder` and index the results.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Generation`] if the embedding service fails or returns
    /// the wrong number of vectors or an empty vector, and [`ChatError::DimensionMismatch`] if the
    /// vectors disagree in length.
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
            error!(provider = embedder.name(), error = %e, "embedding failed while building index");
            match e {
                ChatError::Generation { .. } | ChatError::DimensionMismatch { .. } => e,
                other => ChatError::generation(embedder.name(), other.to_string()),
            }
        })?;

        if embeddings.len() != chunks.len() {
            return Err(ChatError::generation(
                embedder.name(),
                format!("returned {} embeddings for {} chunks", embeddings.len(), chunks.len()),
            ));
        }

        if let Some(position) = embeddings.iter().position(Vec::is_empty) {
            error!(provider = embedder.name(), chunk = %chunks[position].id, "empty embedding");
            return Err(ChatError::generation(
                embedder.name(),
                format!("returned an empty embedding for chunk '{}'", chunks[position].id),
            ));
        }

        let index = Self::from_embeddings(chunks.into_iter().zip(embeddings))?;
        info!(chunk_count = index.len(), dimensions = ?index.dimensions, "built index");
        Ok(index)
    }

    /// Index chunks whose embeddings were computed elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::DimensionMismatch`] if the vectors disagree in length
    /// and [`ChatError::Config`] if a vector is empty.
    pub fn from_embeddings(pairs: impl IntoIterator<Item = (Chunk, Vec<f32>)>) -> Result<Self> {
        let mut dimensions = None;
        let mut entries = Vec::new();

        for (chunk, embedding) in pairs {
            if embedding.is_empty() {
                return Err(ChatError::Config(format!("chunk '{}' has an empty embedding", chunk.id)));
            }
            match dimensions {
                None => dimensions = Some(embedding.len()),
                Some(expected) if expected != embedding.len() => {
                    return Err(ChatError::DimensionMismatch { expected, actual: embedding.len() });
                }
                Some(_) => {}
            }
            entries.push(IndexEntry { chunk, embedding });
        }

        Ok(Self { entries: Some(entries), dimensions })
    }

    /// Whether [`build`](Self::build) or [`from_embeddings`](Self::from_embeddings) produced this index.
    pub fn is_built(&self) -> bool {
        self.entries.is_some()
    }
}

/// Cosine similarity clamped to `[0, 1]`.
///
/// Returns 0.0 if either vector has zero magnitude.
fn relevance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

impl VectorIndex for InMemoryIndex {
    fn query(&self, vector: &[f32], k: usize, min_score: f32) -> Result<RetrievalResult> {
        let entries = self.entries.as_ref().ok_or(ChatError::IndexNotBuilt)?;

        if let Some(expected) = self.dimensions {
            if vector.len() != expected {
                return Err(ChatError::DimensionMismatch { expected, actual: vector.len() });
            }
        }

        let mut scored: Vec<(&IndexEntry, f32)> = entries
            .iter()
            .map(|entry| (entry, relevance(&entry.embedding, vector)))
            .filter(|(_, score)| *score >= min_score)
            .collect();

        // `sort_by` is stable, so equal scores stay in ingestion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let hits: Vec<ScoredChunk> = scored
            .into_iter()
            .map(|(entry, score)| ScoredChunk { chunk: entry.chunk.clone(), score })
            .collect();

        debug!(scanned = entries.len(), result_count = hits.len(), k, min_score, "index query");
        Ok(RetrievalResult::new(hits))
    }

    fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn chunk(index: usize) -> Chunk {
        Chunk {
            id: format!("doc_{index}"),
            text: format!("chunk {index}"),
            index,
            start: index * 10,
            document_id: "doc".to_string(),
            metadata: HashMap::new(),
        }
    }

    fn index(vectors: Vec<Vec<f32>>) -> InMemoryIndex {
        InMemoryIndex::from_embeddings(vectors.into_iter().enumerate().map(|(i, v)| (chunk(i), v)))
            .unwrap()
    }

    #[test]
    fn query_before_build_fails() {
        let err = InMemoryIndex::new().query(&[1.0, 0.0], 3, 0.2).unwrap_err();
        assert!(matches!(err, ChatError::IndexNotBuilt));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn ranks_by_score_then_ingestion_order() {
        let index = index(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 0.0],
        ]);
        let result = index.query(&[1.0, 0.0], 3, 0.2).unwrap();

        let order: Vec<usize> = result.chunks().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 3, 2]);
        assert!((result.hits()[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn threshold_can_leave_nothing() {
        let index = index(vec![vec![0.0, 1.0], vec![-1.0, 0.0]]);
        let result = index.query(&[1.0, 0.0], 3, 0.2).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn negative_similarity_clamps_to_zero() {
        assert_eq!(relevance(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(relevance(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let err = InMemoryIndex::from_embeddings(vec![(chunk(0), vec![1.0]), (chunk(1), vec![1.0, 2.0])])
            .unwrap_err();
        assert!(matches!(err, ChatError::DimensionMismatch { expected: 1, actual: 2 }));

        let err = index(vec![vec![1.0, 0.0]]).query(&[1.0, 0.0, 0.0], 3, 0.0).unwrap_err();
        assert!(matches!(err, ChatError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn built_but_empty_index_returns_empty_result() {
        let index = InMemoryIndex::from_embeddings(Vec::new()).unwrap();
        assert!(index.is_built());
        assert!(index.is_empty());
        assert!(index.query(&[1.0], 3, 0.0).unwrap().is_empty());
    }
}
