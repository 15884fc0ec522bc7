//! Retrieval and question answering over an indexed document corpus.
//!
//! - [`index::SqliteIndex`] and [`memory_index::MemoryIndex`] behind the
//!   [`vector_index::ChunkIndex`] trait
//! - [`retrieval::RetrievalEngine`]: keyword and vector search
//! - [`context::ContextAssembler`]: token-accounted context bundles
//! - [`rag::AskEngine`]: plan, search, answer and synthesize with streamed events

pub mod context;
pub mod embeddings;
pub mod index;
pub mod keyword;
pub mod memory_index;
pub mod rag;
pub mod retrieval;
pub mod types;
pub mod vector_index;


// Re-export commonly used types
pub use context::{ContextAssembler, ContextBundle, ContextSelection, InclusionMode};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::SqliteIndex;
pub use memory_index::MemoryIndex;
pub use rag::{AskEngine, AskEvent, AskStream, ModelOverrides, StageContext};
pub use retrieval::RetrievalEngine;
pub use types::{
    IndexStats, KnowledgeChunk, KnowledgeSource, RetrievedChunk, ScoredChunk, SearchMode,
};
pub use vector_index::ChunkIndex;

use docask_core::{AppConfig, AppResult};
use std::sync::Arc;

/// Retrieval engine over the configured SQLite index and query embedder.
pub fn open_retrieval(config: &AppConfig) -> AppResult<RetrievalEngine> {
    let index = SqliteIndex::open(&config.index_path())?;
    let endpoint = config
        .get_provider_config(&config.index.embedding_provider)
        .and_then(|p| p.endpoint().map(str::to_string));
    let embedder = create_provider(&config.index, endpoint.as_deref())?;

    tracing::debug!(
        index = %index.path().display(),
        embedder = embedder.provider_name(),
        model = embedder.model_name(),
        "Opened retrieval engine"
    );

    Ok(RetrievalEngine::new(Arc::new(index), embedder))
}
