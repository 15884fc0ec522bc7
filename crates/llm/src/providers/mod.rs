//! LLM provider implementations.

pub mod mock;
pub mod ollama;
pub mod openai;

pub use mock::{MockReply, ScriptedClient};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
