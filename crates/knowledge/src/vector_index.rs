//! Index abstraction consumed by the retrieval engine.
//!
//! Backends only store and score. Ranking order, thresholds and the shape of
//! search results are decided by [`crate::retrieval::RetrievalEngine`] so
//! every backend behaves the same way.

use crate::types::{IndexStats, KnowledgeChunk, KnowledgeSource, ScoredChunk};
use docask_core::AppResult;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Read access to an index of embedded chunks.
#[async_trait::async_trait]
pub trait ChunkIndex: Send + Sync {
    /// Short backend name for logs ("sqlite", "memory").
    fn backend_name(&self) -> &str;

    /// The `top_k` chunks most similar to `query_embedding`.
    ///
    /// Ordered by descending cosine similarity, ties broken by ascending
    /// chunk id.
    async fn vector_search(&self, query_embedding: &[f32], top_k: usize)
        -> AppResult<Vec<ScoredChunk>>;

    /// Every chunk, embeddings omitted.
    async fn all_chunks(&self) -> AppResult<Vec<KnowledgeChunk>>;

    /// Sources for the given ids. Unknown ids are absent from the map.
    async fn sources(&self, ids: &[String]) -> AppResult<HashMap<String, KnowledgeSource>>;

    async fn stats(&self) -> AppResult<IndexStats>;
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Descending score, then ascending chunk id. Total even for NaN scores.
pub fn compare_scored(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id))
}

/// Score `chunks` against `query_embedding` and keep the best `top_k`.
///
/// Chunks without an embedding, or whose score is NaN, are skipped.
/// Returned chunks keep their embeddings stripped.
pub fn rank_by_similarity(
    chunks: impl IntoIterator<Item = KnowledgeChunk>,
    query_embedding: &[f32],
    top_k: usize,
) -> Vec<ScoredChunk> {
    let mut results: Vec<ScoredChunk> = chunks
        .into_iter()
        .filter_map(|mut chunk| {
            let embedding = chunk.embedding.take()?;
            let score = cosine_similarity(query_embedding, &embedding);
            (!score.is_nan()).then_some((chunk, score))
        })
        .collect();

    results.sort_by(compare_scored);
    results.truncate(top_k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Option<Vec<f32>>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source_id: "doc".to_string(),
            position: 0,
            text: id.to_string(),
            embedding,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_ties_broken_by_id() {
        let chunks = vec![
            chunk("c", Some(vec![1.0, 0.0])),
            chunk("a", Some(vec![1.0, 0.0])),
            chunk("b", Some(vec![0.0, 1.0])),
            chunk("no-embedding", None),
        ];

        let ranked = rank_by_similarity(chunks, &[1.0, 0.0], 10);
        let ids: Vec<&str> = ranked.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert!(ranked.iter().all(|(c, _)| c.embedding.is_none()));
    }

    #[test]
    fn test_nan_scores_sort_consistently_and_are_not_ranked() {
        let mut scored = vec![
            (chunk("b", None), 0.5),
            (chunk("nan", None), f32::NAN),
            (chunk("a", None), 0.5),
            (chunk("c", None), 0.9),
        ];
        scored.sort_by(compare_scored);
        let ids: Vec<&str> = scored.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["nan", "c", "a", "b"]);

        let chunks = vec![
            chunk("corrupt", Some(vec![f32::NAN, 1.0])),
            chunk("good", Some(vec![1.0, 0.0])),
        ];
        let ranked = rank_by_similarity(chunks, &[1.0, 0.0], 10);
        let ids: Vec<&str> = ranked.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[test]
    fn test_rank_truncates() {
        let chunks = (0..5).map(|i| chunk(&format!("c{}", i), Some(vec![1.0, i as f32])));
        assert_eq!(rank_by_similarity(chunks, &[1.0, 0.0], 2).len(), 2);
    }
}
