//! Term-frequency ranking for keyword search.
//!
//! Scores are `sum(tf * idf)` over the distinct query terms, where `tf` is
//! the term count divided by the chunk's term count and
//! `idf = ln(1 + N / df)`. They are only comparable within one query.

use crate::types::{KnowledgeChunk, ScoredChunk};
use crate::vector_index::compare_scored;
use std::collections::{BTreeSet, HashMap};
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "do", "does", "for", "from", "had",
    "has", "have", "how", "in", "is", "it", "its", "of", "on", "or", "that", "the", "their",
    "them", "they", "this", "to", "was", "were", "what", "when", "where", "which", "who", "why",
    "with",
];

/// Lower-cased words of `text` without stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Rank `chunks` against `query`, best first, at most `top_k`.
///
/// Chunks sharing no term with the query are left out.
pub fn rank_keyword(chunks: Vec<KnowledgeChunk>, query: &str, top_k: usize) -> Vec<ScoredChunk> {
    let terms: BTreeSet<String> = tokenize(query).into_iter().collect();
    if terms.is_empty() || chunks.is_empty() {
        return Vec::new();
    }

    let counted: Vec<(KnowledgeChunk, HashMap<&str, usize>, usize)> = chunks
        .into_iter()
        .map(|chunk| {
            let words = tokenize(&chunk.text);
            let total = words.len();
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for word in &words {
                if let Some(term) = terms.get(word) {
                    *counts.entry(term.as_str()).or_insert(0) += 1;
                }
            }
            (chunk, counts, total)
        })
        .collect();

    let n = counted.len() as f32;
    let idf: HashMap<&str, f32> = terms
        .iter()
        .map(|term| {
            let df = counted
                .iter()
                .filter(|(_, counts, _)| counts.contains_key(term.as_str()))
                .count();
            let idf = if df == 0 {
                0.0
            } else {
                (1.0 + n / df as f32).ln()
            };
            (term.as_str(), idf)
        })
        .collect();

    let mut results: Vec<ScoredChunk> = counted
        .into_iter()
        .filter(|(_, counts, _)| !counts.is_empty())
        .map(|(mut chunk, counts, total)| {
            let score = terms
                .iter()
                .map(|term| {
                    let tf = counts.get(term.as_str()).copied().unwrap_or(0) as f32
                        / total.max(1) as f32;
                    tf * idf.get(term.as_str()).copied().unwrap_or(0.0)
                })
                .sum();
            chunk.embedding = None;
            (chunk, score)
        })
        .collect();

    results.sort_by(compare_scored);
    results.truncate(top_k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source_id: "doc".to_string(),
            position: 0,
            text: text.to_string(),
            embedding: None,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn test_tokenize_drops_stop_words() {
        assert_eq!(
            tokenize("What is the Borrow-Checker?"),
            vec!["borrow", "checker"]
        );
    }

    #[test]
    fn test_rank_prefers_rarer_terms() {
        let chunks = vec![
            chunk("1", "rust memory safety"),
            chunk("2", "rust async runtime"),
            chunk("3", "python garbage collector"),
        ];
        let ranked = rank_keyword(chunks, "rust safety", 10);
        let ids: Vec<&str> = ranked.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(ranked[0].1 > ranked[1].1);
    }

    #[test]
    fn test_no_matches_and_blank_query() {
        let chunks = vec![chunk("1", "rust memory safety")];
        assert!(rank_keyword(chunks.clone(), "kubernetes", 10).is_empty());
        assert!(rank_keyword(chunks, "the of and", 10).is_empty());
    }

    #[test]
    fn test_ties_ordered_by_id() {
        let chunks = vec![chunk("b", "tokio tasks"), chunk("a", "tokio tasks")];
        let ranked = rank_keyword(chunks, "tokio", 10);
        assert_eq!(ranked[0].0.id, "a");
        assert_eq!(ranked[1].0.id, "b");
    }
}
