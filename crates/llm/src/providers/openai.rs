//! OpenAI-compatible chat completions provider.
//!
//! Works against api.openai.com and any server exposing `/chat/completions`
//! (vLLM, LM Studio, OpenRouter). Structured output is requested through
//! `response_format: {"type": "json_schema", ...}`.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docask_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            response_format: request.format.clone().map(|schema| ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "structured_response".to_string(),
                    strict: false,
                    schema,
                },
            }),
        }
    }

    async fn post(&self, body: &ChatRequest) -> AppResult<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ModelInvocation(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::ModelInvocation(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            model = %request.model,
            structured = request.format.is_some(),
            "OpenAI completion"
        );

        let body = self.to_chat_request(request);
        let chat: ChatResponse = self.post(&body).await?.json().await.map_err(|e| {
            AppError::ModelInvocation(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let usage = chat
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ModelInvocation("No choices in OpenAI response".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content,
            model: chat.model,
            usage,
            done: choice.finish_reason.as_deref() != Some("length"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_request_shape() {
        let client = OpenAiClient::new("https://api.openai.com/v1/", "sk-test");
        assert_eq!(client.base_url, "https://api.openai.com/v1");

        let request = LlmRequest::new("Plan this", "gpt-4o-mini")
            .with_system("You plan searches")
            .with_format(serde_json::json!({"type": "object"}));

        let body = serde_json::to_value(client.to_chat_request(&request)).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Plan this");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["schema"]["type"], "object");
    }

    #[test]
    fn test_plain_request_has_no_response_format() {
        let client = OpenAiClient::new("http://localhost:8000/v1", "key");
        let body =
            serde_json::to_value(client.to_chat_request(&LlmRequest::new("Hi", "m"))).unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
        assert!(body.get("stream").is_none());
    }
}
