//! Embedding provider trait and factory.

use docask_core::config::IndexConfig;
use docask_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create the embedding provider the index was built with.
///
/// `endpoint` overrides the provider's default base URL.
pub fn create_provider(
    config: &IndexConfig,
    endpoint: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.embedding_provider.as_str() {
        "mock" => Ok(Arc::new(super::providers::MockProvider::new(
            config.dimensions,
        ))),

        "ollama" => Ok(Arc::new(super::providers::OllamaProvider::new(
            endpoint,
            &config.embedding_model,
            config.dimensions,
        )?)),

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama",
            other
        ))),
    }
}
