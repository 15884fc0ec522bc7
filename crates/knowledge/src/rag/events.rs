//! Streamed ask events.

use super::types::{FinalAnswer, Strategy, SubAnswer};
use docask_core::AppError;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

/// One step of an ask run, serialized as `{"type": ..., ...}`.
///
/// A successful run yields `strategy`, one `answer` per directive in
/// completion order, `final`, then `complete`. A failed run ends with a
/// single `error` and nothing after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AskEvent {
    Strategy(Strategy),
    Answer(SubAnswer),
    Final(FinalAnswer),
    Error { kind: String, message: String },
    Complete,
}

impl AskEvent {
    pub fn error(err: &AppError) -> Self {
        Self::Error {
            kind: error_kind(err).to_string(),
            message: err.to_string(),
        }
    }
}

fn error_kind(err: &AppError) -> &'static str {
    match err {
        AppError::Config(_) => "configuration",
        AppError::Planning(_) => "planning",
        AppError::ModelInvocation(_) => "model_invocation",
        AppError::RetrievalTimeout(_) | AppError::Timeout(_) => "timeout",
        AppError::Cancelled(_) => "cancelled",
        AppError::Knowledge(_) => "knowledge",
        AppError::Prompt(_) => "prompt",
        AppError::Serialization(_) => "serialization",
        AppError::Io(_) | AppError::Other(_) => "internal",
    }
}

/// Receiving end of an ask run.
///
/// Dropping the stream cancels the run.
pub struct AskStream {
    rx: mpsc::Receiver<AskEvent>,
    _cancel_on_drop: DropGuard,
}

impl AskStream {
    pub(crate) fn new(rx: mpsc::Receiver<AskEvent>, guard: DropGuard) -> Self {
        Self {
            rx,
            _cancel_on_drop: guard,
        }
    }
}

impl Stream for AskStream {
    type Item = AskEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::types::SearchDirective;
    use serde_json::json;

    #[test]
    fn test_event_wire_format() {
        let strategy = AskEvent::Strategy(Strategy {
            reasoning: "r".to_string(),
            directives: vec![SearchDirective {
                term: "t".to_string(),
                instructions: "i".to_string(),
            }],
        });
        assert_eq!(
            serde_json::to_value(&strategy).unwrap(),
            json!({"type": "strategy", "reasoning": "r", "searches": [{"term": "t", "instructions": "i"}]})
        );

        assert_eq!(
            serde_json::to_value(AskEvent::Complete).unwrap(),
            json!({"type": "complete"})
        );

        let error = AskEvent::error(&AppError::Planning("no searches".to_string()));
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"type": "error", "kind": "planning", "message": "Planning error: no searches"})
        );
    }

    #[test]
    fn test_final_event_round_trips() {
        let event = AskEvent::Final(FinalAnswer {
            text: "Done [doc:a].".to_string(),
            citations: vec!["doc:a".to_string()],
        });
        let text = serde_json::to_string(&event).unwrap();
        assert!(text.starts_with("{\"type\":\"final\""));
        assert_eq!(serde_json::from_str::<AskEvent>(&text).unwrap(), event);
    }
}
