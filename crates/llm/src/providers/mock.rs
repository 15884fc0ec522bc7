//! Scripted LLM client for tests and offline runs.
//!
//! A responder closure decides each reply from the incoming request, which
//! lets one client play planner, answerer and final synthesizer depending on
//! the prompt it sees.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docask_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Reply after sleeping, for timeout and ordering tests.
    Delayed(Duration, String),
    /// Fail with `AppError::ModelInvocation`.
    Error(String),
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::Text(value.to_string())
    }
}

type Responder = dyn Fn(&LlmRequest) -> MockReply + Send + Sync;

/// LLM client whose replies come from a closure.
#[derive(Clone)]
pub struct ScriptedClient {
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<LlmRequest>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

/// Counts one call as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedClient {
    pub fn new(responder: impl Fn(&LlmRequest) -> MockReply + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replies with the prompt it was given.
    pub fn echo() -> Self {
        Self::new(|request| MockReply::Text(request.prompt.clone()))
    }

    /// Replies from `replies` in order; once exhausted every call fails.
    pub fn sequence(replies: Vec<MockReply>) -> Self {
        let queue = Mutex::new(std::collections::VecDeque::from(replies));
        Self::new(move |_| {
            queue
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or_else(|| MockReply::Error("script exhausted".to_string()))
        })
    }

    /// Requests received so far, in call order.
    pub fn calls(&self) -> Vec<LlmRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Most calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ScriptedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedClient")
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let content = match (self.responder)(request) {
            MockReply::Text(content) => content,
            MockReply::Delayed(delay, content) => {
                tokio::time::sleep(delay).await;
                content
            }
            MockReply::Error(message) => return Err(AppError::ModelInvocation(message)),
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_peak_in_flight_counts_overlapping_calls() {
        let client = ScriptedClient::new(|_| {
            MockReply::Delayed(Duration::from_millis(100), "ok".to_string())
        });
        let request = LlmRequest::new("q", "m");

        let (a, b) = tokio::join!(client.complete(&request), client.complete(&request));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(client.peak_in_flight(), 2);

        client.complete(&request).await.unwrap();
        assert_eq!(client.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_sequence_then_exhausted() {
        let client = ScriptedClient::sequence(vec![MockReply::text("one")]);
        let request = LlmRequest::new("q", "m");

        assert_eq!(client.complete(&request).await.unwrap().content, "one");
        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, AppError::ModelInvocation(_)));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_structured_through_default_method() {
        let client = ScriptedClient::new(|_| {
            MockReply::text("<think>hmm</think>```json\n{\"ok\": true}\n```")
        });
        let value = client
            .complete_structured(&LlmRequest::new("q", "m"), &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert!(client.calls()[0].format.is_some());
    }

    #[tokio::test]
    async fn test_structured_rejects_prose() {
        let client = ScriptedClient::new(|_| MockReply::text("I cannot help with that"));
        let err = client
            .complete_structured(&LlmRequest::new("q", "m"), &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
