//! Property tests for in-memory index ranking.

mod common;

use std::collections::HashMap;

use chatdoc::{Chunk, ChatError, InMemoryIndex, VectorIndex};
use common::KeywordEmbedder;
use proptest::prelude::*;

const DIM: usize = 8;

fn chunk(index: usize) -> Chunk {
    Chunk {
        id: format!("doc_{index}"),
        text: format!("chunk {index}"),
        index,
        start: index,
        document_id: "doc".to_string(),
        metadata: HashMap::new(),
    }
}

/// Small integer components make exact score ties likely.
fn arb_embedding() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec((-2i8..=2).prop_map(f32::from), DIM)
}

/// *For any* indexed embeddings, a query returns at most `k` results, all
/// scoring at least `min_score` and within `[0, 1]`, ordered by descending
/// score with ties in ingestion order, and nothing better was left out.
mod prop_index_ranking {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn ranked_truncated_and_filtered(
            embeddings in proptest::collection::vec(arb_embedding(), 0..30),
            query in arb_embedding(),
            k in 0usize..6,
            min_score in 0.0f32..1.0,
        ) {
            let count = embeddings.len();
            let index = InMemoryIndex::from_embeddings(
                embeddings.into_iter().enumerate().map(|(i, e)| (chunk(i), e)),
            )
            .unwrap();

            let result = index.query(&query, k, min_score).unwrap();
            let hits = result.hits();

            prop_assert!(hits.len() <= k);
            prop_assert!(hits.len() <= count);

            for hit in hits {
                prop_assert!(hit.score >= min_score);
                prop_assert!((0.0..=1.0).contains(&hit.score));
            }

            for pair in hits.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].chunk.index < pair[1].chunk.index);
                }
            }

            // Anything left out scores below the threshold or below the last hit.
            if hits.len() < k {
                let everything = index.query(&query, count, 0.0).unwrap();
                let qualifying = everything.hits().iter().filter(|h| h.score >= min_score).count();
                prop_assert_eq!(qualifying, hits.len());
            }
        }
    }
}

#[test]
fn unbuilt_index_reports_index_not_built() {
    let err = InMemoryIndex::new().query(&[0.0; DIM], 3, 0.2).unwrap_err();
    assert!(matches!(err, ChatError::IndexNotBuilt));
}

#[tokio::test]
async fn build_embeds_each_chunk_once() {
    let embedder = KeywordEmbedder::new(&["alpha", "beta"]);
    let mut chunks: Vec<Chunk> = (0..4).map(chunk).collect();
    chunks[2].text = "alpha beta".to_string();

    let index = InMemoryIndex::build(chunks, &embedder).await.unwrap();

    assert_eq!(embedder.calls(), 4);
    assert_eq!(index.len(), 4);
    assert_eq!(index.dimensions(), Some(2));

    let result = index.query(&[1.0, 1.0], 3, 0.2).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.hits()[0].chunk.index, 2);
}

#[tokio::test]
async fn build_surfaces_embedding_failures() {
    let embedder = KeywordEmbedder::new(&["alpha"]);
    embedder.set_failing(true);

    let err = InMemoryIndex::build(vec![chunk(0)], &embedder).await.unwrap_err();
    assert!(matches!(err, ChatError::Generation { .. }));
}

#[tokio::test]
async fn build_treats_empty_embeddings_as_a_service_fault() {
    let embedder = KeywordEmbedder::new(&[]);

    let err = InMemoryIndex::build(vec![chunk(0), chunk(1)], &embedder).await.unwrap_err();
    assert!(matches!(
        err,
        ChatError::Generation { service, message } if service == "keywords" && message.contains("doc_0")
    ));
}
