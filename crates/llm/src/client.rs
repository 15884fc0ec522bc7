//! LLM client abstraction and request/response types.
//!
//! Every provider adapter implements [`LlmClient`]. Plain completions return
//! text; [`LlmClient::complete_structured`] asks the provider to honor a JSON
//! schema and hands back the parsed value.

use docask_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::thinking::{clean_thinking_content, extract_json};

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the LLM
    pub prompt: String,

    /// Provider-side model name (e.g., "llama3.2", "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// JSON schema the reply must conform to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<serde_json::Value>,
}

impl LlmRequest {
    /// Create a new LLM request with required fields.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: None,
            system: None,
            format: None,
        }
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Constrain the reply to a JSON schema.
    pub fn with_format(mut self, schema: serde_json::Value) -> Self {
        self.format = Some(schema);
        self
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: LlmUsage,

    /// Whether the response was complete
    #[serde(default = "default_true")]
    pub done: bool,
}

fn default_true() -> bool {
    true
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for LLM providers.
///
/// Errors returned by `complete` are `AppError::ModelInvocation`
/// for transport and provider failures.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama", "openai").
    fn provider_name(&self) -> &str;

    /// Perform a completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;

    /// Complete with a JSON schema constraint and parse the reply.
    ///
    /// Thinking blocks are removed and the JSON object is located inside any
    /// surrounding prose before parsing. Unparseable replies surface as
    /// `AppError::Serialization`.
    async fn complete_structured(
        &self,
        request: &LlmRequest,
        schema: &serde_json::Value,
    ) -> AppResult<serde_json::Value> {
        let request = request.clone().with_format(schema.clone());
        let response = self.complete(&request).await?;

        let cleaned = clean_thinking_content(&response.content);
        let json = extract_json(&cleaned).ok_or_else(|| {
            AppError::Serialization(format!(
                "No JSON object in {} reply",
                self.provider_name()
            ))
        })?;

        Ok(serde_json::from_str(json)?)
    }
}
