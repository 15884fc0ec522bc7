//! Query and chunk embedding.
//!
//! The index stores vectors produced by one provider; queries must be
//! embedded by the same provider and model for scores to mean anything.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
