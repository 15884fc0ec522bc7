//! Mock embedding provider using trigram-based content-aware embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use crate::keyword::tokenize;
use docask_core::AppResult;
use std::collections::BTreeMap;

/// Deterministic offline embedder.
///
/// Hashes character trigrams and whole words into a fixed number of
/// dimensions, then normalizes. Texts sharing vocabulary land close
/// together, which is enough for tests and for indexes built without a
/// model server.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, bytes: &[u8], multiplier: u64) -> usize {
        let hash = bytes
            .iter()
            .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(*b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];

        let mut word_freq: BTreeMap<String, u32> = BTreeMap::new();
        for word in tokenize(text).into_iter().filter(|w| w.chars().count() > 2) {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let dim = self.bucket(trigram.as_bytes(), 37);
                embedding[dim] += (*freq as f32).sqrt();
            }

            let dim = self.bucket(word.as_bytes(), 31);
            embedding[dim] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_index::cosine_similarity;

    #[tokio::test]
    async fn test_mock_provider_embed_single() {
        let provider = MockProvider::new(384);
        let embedding = provider.embed("hello world").await.unwrap();

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_mock_provider_deterministic() {
        let provider = MockProvider::new(128);
        let a = provider.embed("ownership and borrowing").await.unwrap();
        let b = provider.embed("ownership and borrowing").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_mock_provider_content_aware() {
        let provider = MockProvider::new(384);
        let query = provider.embed("borrow checker rules").await.unwrap();
        let close = provider
            .embed("the borrow checker enforces ownership rules")
            .await
            .unwrap();
        let far = provider.embed("sourdough bread baking").await.unwrap();

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn test_mock_provider_empty_text_is_zero_vector() {
        let provider = MockProvider::new(16);
        let embedding = provider.embed("   ").await.unwrap();
        assert!(embedding.iter().all(|v| *v == 0.0));
    }
}
