//! Corpus-wide search.
//!
//! Turns raw index hits into [`RetrievedChunk`]s with a document id and a
//! human-readable source reference.

use crate::embeddings::EmbeddingProvider;
use crate::keyword::rank_keyword;
use crate::types::{
    IndexStats, KnowledgeChunk, KnowledgeSource, RetrievedChunk, ScoredChunk, SearchMode,
};
use crate::vector_index::ChunkIndex;
use docask_core::AppResult;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Search over one index with one query embedder.
#[derive(Clone)]
pub struct RetrievalEngine {
    index: Arc<dyn ChunkIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl RetrievalEngine {
    pub fn new(index: Arc<dyn ChunkIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// Document and chunk counts of the searched index.
    pub async fn stats(&self) -> AppResult<IndexStats> {
        self.index.stats().await
    }

    /// Ranked chunks for `query`, best first.
    ///
    /// Nothing relevant is an empty list, not an error. `min_score` only
    /// applies in vector mode.
    #[instrument(skip(self), fields(backend = self.index.backend_name()))]
    pub async fn search(
        &self,
        query: &str,
        mode: SearchMode,
        top_k: usize,
        min_score: f32,
    ) -> AppResult<Vec<RetrievedChunk>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let hits: Vec<ScoredChunk> = match mode {
            SearchMode::Vector => {
                let embedding = self.embedder.embed(query).await?;
                self.index
                    .vector_search(&embedding, top_k)
                    .await?
                    .into_iter()
                    .filter(|(_, score)| *score >= min_score)
                    .collect()
            }
            SearchMode::Keyword => rank_keyword(self.index.all_chunks().await?, query, top_k),
        };

        debug!("{} search returned {} chunks", mode.as_str(), hits.len());

        let source_ids: Vec<String> = hits
            .iter()
            .map(|(chunk, _)| chunk.source_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let sources = if source_ids.is_empty() {
            HashMap::new()
        } else {
            self.index.sources(&source_ids).await?
        };

        Ok(hits
            .into_iter()
            .map(|(chunk, score)| {
                let source_ref = source_ref(&chunk, sources.get(&chunk.source_id));
                RetrievedChunk {
                    id: chunk.id,
                    document_id: chunk.source_id,
                    excerpt: chunk.text,
                    relevance_score: score,
                    source_ref,
                }
            })
            .collect())
    }
}

/// "notes.md, lines 3-9" style reference for a chunk.
pub fn source_ref(chunk: &KnowledgeChunk, source: Option<&KnowledgeSource>) -> String {
    format!(
        "{}, {}",
        source_name(chunk, source),
        source_location(chunk)
    )
}

fn source_name(chunk: &KnowledgeChunk, source: Option<&KnowledgeSource>) -> String {
    if let Some(name) = source.and_then(KnowledgeSource::file_name) {
        return name.to_string();
    }

    if let Some(name) = chunk
        .metadata
        .get("source_path")
        .and_then(|v| v.as_str())
        .and_then(|p| p.rsplit(['/', '\\']).next())
        .filter(|name| !name.is_empty())
    {
        return name.to_string();
    }

    if let Some(url) = source.and_then(|s| s.url.as_deref()) {
        return url.to_string();
    }

    chunk.source_id.clone()
}

fn source_location(chunk: &KnowledgeChunk) -> String {
    if let Some((start, end)) = range(&chunk.metadata, "line_range") {
        return format!("lines {}-{}", start, end);
    }
    if let Some((start, end)) = range(&chunk.metadata, "byte_range") {
        return format!("byte offset {}-{}", start, end);
    }
    format!("position {}", chunk.position)
}

fn range(metadata: &serde_json::Value, key: &str) -> Option<(u64, u64)> {
    let pair = metadata.get(key)?.as_array()?;
    match pair.as_slice() {
        [start, end] => Some((start.as_u64()?, end.as_u64()?)),
        _ => None,
    }
}

/// Shorten `text` to at most `max_chars` characters, cutting at a word
/// boundary when one exists, and mark the cut with "...".
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(last_space) if last_space > 0 => format!("{}...", truncated[..last_space].trim_end()),
        _ => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(metadata: serde_json::Value) -> KnowledgeChunk {
        KnowledgeChunk {
            id: "c1".to_string(),
            source_id: "doc:guide".to_string(),
            position: 4,
            text: "text".to_string(),
            embedding: None,
            metadata,
        }
    }

    fn source(path: Option<&str>) -> KnowledgeSource {
        KnowledgeSource {
            id: "doc:guide".to_string(),
            path: path.map(String::from),
            url: Some("https://example.org/guide".to_string()),
            content_type: "markdown".to_string(),
            learned_at: "2026-01-01T00:00:00Z".to_string(),
            size_bytes: 0,
        }
    }

    #[test]
    fn test_source_ref_prefers_source_path_and_lines() {
        let chunk = chunk(json!({"line_range": [10, 24], "byte_range": [0, 400]}));
        assert_eq!(
            source_ref(&chunk, Some(&source(Some("docs/guide.md")))),
            "guide.md, lines 10-24"
        );
    }

    #[test]
    fn test_source_ref_fallbacks() {
        let chunk_meta = chunk(json!({"source_path": "/tmp/notes.txt", "byte_range": [5, 90]}));
        assert_eq!(source_ref(&chunk_meta, None), "notes.txt, byte offset 5-90");

        let bare = chunk(json!({}));
        assert_eq!(
            source_ref(&bare, Some(&source(None))),
            "https://example.org/guide, position 4"
        );
        assert_eq!(source_ref(&bare, None), "doc:guide, position 4");
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("Short text", 100), "Short text");

        let long = "This is a very long text that needs to be truncated at some point";
        let result = truncate_snippet(long, 30);
        assert_eq!(result, "This is a very long text that...");

        assert_eq!(truncate_snippet("ééééé", 3), "ééé...");
    }
}
