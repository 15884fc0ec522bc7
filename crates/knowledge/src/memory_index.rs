//! In-process chunk index.

use crate::types::{IndexStats, KnowledgeChunk, KnowledgeSource, ScoredChunk};
use crate::vector_index::{rank_by_similarity, ChunkIndex};
use docask_core::{AppError, AppResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Chunk index held in memory. Insertion order is irrelevant to results.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    sources: RwLock<HashMap<String, KnowledgeSource>>,
    chunks: RwLock<BTreeMap<String, KnowledgeChunk>>,
}

fn poisoned() -> AppError {
    AppError::Knowledge("Memory index lock poisoned".to_string())
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_source(&self, source: KnowledgeSource) -> AppResult<()> {
        self.sources
            .write()
            .map_err(|_| poisoned())?
            .insert(source.id.clone(), source);
        Ok(())
    }

    /// Insert or replace a chunk. The chunk must carry an embedding.
    pub fn insert_chunk(&self, chunk: KnowledgeChunk) -> AppResult<()> {
        if chunk.embedding.is_none() {
            return Err(AppError::Knowledge(format!(
                "Chunk '{}' missing embedding",
                chunk.id
            )));
        }
        self.chunks
            .write()
            .map_err(|_| poisoned())?
            .insert(chunk.id.clone(), chunk);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChunkIndex for MemoryIndex {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        let chunks = self.chunks.read().map_err(|_| poisoned())?;
        Ok(rank_by_similarity(
            chunks.values().cloned(),
            query_embedding,
            top_k,
        ))
    }

    async fn all_chunks(&self) -> AppResult<Vec<KnowledgeChunk>> {
        let chunks = self.chunks.read().map_err(|_| poisoned())?;
        Ok(chunks
            .values()
            .map(|chunk| KnowledgeChunk {
                embedding: None,
                ..chunk.clone()
            })
            .collect())
    }

    async fn sources(&self, ids: &[String]) -> AppResult<HashMap<String, KnowledgeSource>> {
        let sources = self.sources.read().map_err(|_| poisoned())?;
        Ok(ids
            .iter()
            .filter_map(|id| sources.get(id).map(|s| (id.clone(), s.clone())))
            .collect())
    }

    async fn stats(&self) -> AppResult<IndexStats> {
        Ok(IndexStats {
            sources_count: self.sources.read().map_err(|_| poisoned())?.len() as u32,
            chunks_count: self.chunks.read().map_err(|_| poisoned())?.len() as u32,
        })
    }
}
