//! LLM integration crate for docask.
//!
//! Provider-agnostic model access plus the model selector:
//! - [`LlmClient`] with plain and schema-constrained completions
//! - Providers: Ollama, OpenAI-compatible chat completions, a scripted mock
//! - [`registry::select_model`] picks a catalog entry per task and prompt size
//! - [`provision::provision`] pairs the selection with a client
//!
//! # Example
//! ```no_run
//! use docask_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod provision;
pub mod registry;
pub mod thinking;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockReply, OllamaClient, OpenAiClient, ScriptedClient};
pub use provision::{provision, ClientProvider, FactoryClients, ProvisionedModel, StaticClients};
pub use registry::{select_model, ModelHandle, TaskType};
pub use types::ProviderType;
