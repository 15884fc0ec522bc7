//! Model selection.
//!
//! [`select_model`] turns a task type, a token estimate and an optional
//! override into one concrete catalog entry. It reads nothing but the
//! `ModelsConfig` snapshot it is handed, so callers resolve again at every
//! call site instead of caching a handle.

use docask_core::config::{DefaultModels, ModelEntry, ModelKind, ModelsConfig};
use docask_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// What a model is being asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Chat,
    Transformation,
    Tools,
    LargeContext,
    Embedding,
    SpeechToText,
    TextToSpeech,
}

impl TaskType {
    pub const ALL: [TaskType; 7] = [
        TaskType::Chat,
        TaskType::Transformation,
        TaskType::Tools,
        TaskType::LargeContext,
        TaskType::Embedding,
        TaskType::SpeechToText,
        TaskType::TextToSpeech,
    ];

    /// Parse a task name ("chat", "large_context", "large-context").
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "chat" => Some(Self::Chat),
            "transformation" => Some(Self::Transformation),
            "tools" => Some(Self::Tools),
            "large_context" => Some(Self::LargeContext),
            "embedding" => Some(Self::Embedding),
            "speech_to_text" | "stt" => Some(Self::SpeechToText),
            "text_to_speech" | "tts" => Some(Self::TextToSpeech),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Transformation => "transformation",
            Self::Tools => "tools",
            Self::LargeContext => "large_context",
            Self::Embedding => "embedding",
            Self::SpeechToText => "speech_to_text",
            Self::TextToSpeech => "text_to_speech",
        }
    }

    /// Tasks served by a language model.
    pub fn is_language(&self) -> bool {
        self.expected_kind() == ModelKind::Language
    }

    pub fn expected_kind(&self) -> ModelKind {
        match self {
            Self::Chat | Self::Transformation | Self::Tools | Self::LargeContext => {
                ModelKind::Language
            }
            Self::Embedding => ModelKind::Embedding,
            Self::SpeechToText => ModelKind::SpeechToText,
            Self::TextToSpeech => ModelKind::TextToSpeech,
        }
    }

    fn default_id<'a>(&self, defaults: &'a DefaultModels) -> Option<&'a str> {
        let id = match self {
            Self::Chat => &defaults.chat,
            Self::Transformation => &defaults.transformation,
            Self::Tools => &defaults.tools,
            Self::LargeContext => &defaults.large_context,
            Self::Embedding => &defaults.embedding,
            Self::SpeechToText => &defaults.speech_to_text,
            Self::TextToSpeech => &defaults.text_to_speech,
        };
        id.as_deref()
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved model, ready to be turned into a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHandle {
    pub id: String,
    pub provider: String,
    pub name: String,
    pub kind: ModelKind,
}

impl From<&ModelEntry> for ModelHandle {
    fn from(entry: &ModelEntry) -> Self {
        Self {
            id: entry.id.clone(),
            provider: entry.provider.clone(),
            name: entry.name.clone(),
            kind: entry.kind,
        }
    }
}

/// Resolve the model for one call.
///
/// Precedence:
/// 1. `override_id`, which must name a catalog entry of the right kind
/// 2. the large-context default, when `token_estimate` exceeds the threshold
///    and the task is a language task
/// 3. the task's own default
/// 4. the chat default, for language tasks
///
/// Anything else is `AppError::Config`; no arbitrary model is ever picked.
pub fn select_model(
    config: &ModelsConfig,
    task: TaskType,
    token_estimate: usize,
    override_id: Option<&str>,
) -> AppResult<ModelHandle> {
    if let Some(id) = override_id {
        return lookup(config, id, task, "override");
    }

    if task.is_language() && token_estimate > config.large_context_threshold {
        match config.defaults.large_context.as_deref() {
            Some(id) => {
                tracing::debug!(
                    task = %task,
                    token_estimate,
                    threshold = config.large_context_threshold,
                    "Using large context model"
                );
                return lookup(config, id, task, "large_context default");
            }
            None => {
                tracing::warn!(
                    task = %task,
                    token_estimate,
                    "Token estimate exceeds the large context threshold but no large context model is configured"
                );
            }
        }
    }

    if let Some(id) = task.default_id(&config.defaults) {
        return lookup(config, id, task, "task default");
    }

    if task.is_language() {
        if let Some(id) = config.defaults.chat.as_deref() {
            return lookup(config, id, task, "chat default");
        }
    }

    Err(AppError::Config(format!(
        "No model configured for task '{}'",
        task
    )))
}

fn lookup(
    config: &ModelsConfig,
    id: &str,
    task: TaskType,
    origin: &str,
) -> AppResult<ModelHandle> {
    let entry = config.entry(id).ok_or_else(|| {
        AppError::Config(format!(
            "Model '{}' ({}) for task '{}' is not in the catalog",
            id, origin, task
        ))
    })?;

    if entry.kind != task.expected_kind() {
        return Err(AppError::Config(format!(
            "Model '{}' ({}) has kind {:?} and cannot serve task '{}'",
            id, origin, entry.kind, task
        )));
    }

    Ok(ModelHandle::from(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, kind: ModelKind) -> ModelEntry {
        ModelEntry {
            id: id.to_string(),
            provider: "mock".to_string(),
            name: format!("{}-model", id),
            kind,
        }
    }

    fn catalog() -> ModelsConfig {
        ModelsConfig {
            catalog: vec![
                entry("small", ModelKind::Language),
                entry("tooling", ModelKind::Language),
                entry("big", ModelKind::Language),
                entry("other", ModelKind::Language),
                entry("embed", ModelKind::Embedding),
            ],
            defaults: DefaultModels {
                chat: Some("small".to_string()),
                tools: Some("tooling".to_string()),
                large_context: Some("big".to_string()),
                embedding: Some("embed".to_string()),
                ..Default::default()
            },
            large_context_threshold: 105_000,
        }
    }

    #[test]
    fn test_task_default() {
        let handle = select_model(&catalog(), TaskType::Tools, 50, None).unwrap();
        assert_eq!(handle.id, "tooling");
    }

    #[test]
    fn test_falls_back_to_chat_for_language_tasks() {
        let handle = select_model(&catalog(), TaskType::Transformation, 50, None).unwrap();
        assert_eq!(handle.id, "small");
    }

    #[test]
    fn test_large_context_upgrade() {
        let handle = select_model(&catalog(), TaskType::Tools, 120_000, None).unwrap();
        assert_eq!(handle.id, "big");

        // Threshold is exclusive
        let handle = select_model(&catalog(), TaskType::Tools, 105_000, None).unwrap();
        assert_eq!(handle.id, "tooling");
    }

    #[test]
    fn test_override_beats_large_context() {
        let handle = select_model(&catalog(), TaskType::Chat, 120_000, Some("other")).unwrap();
        assert_eq!(handle.id, "other");
    }

    #[test]
    fn test_unknown_override_is_config_error() {
        let err = select_model(&catalog(), TaskType::Chat, 10, Some("nope")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_override_kind_mismatch() {
        let err = select_model(&catalog(), TaskType::Chat, 10, Some("embed")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_embedding_never_upgrades_or_falls_back() {
        let handle = select_model(&catalog(), TaskType::Embedding, 200_000, None).unwrap();
        assert_eq!(handle.id, "embed");

        let err = select_model(&catalog(), TaskType::TextToSpeech, 10, None).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_nothing_configured() {
        let config = ModelsConfig {
            catalog: vec![entry("small", ModelKind::Language)],
            defaults: DefaultModels::default(),
            large_context_threshold: 105_000,
        };
        let err = select_model(&config, TaskType::Chat, 10, None).unwrap_err();
        assert!(err.to_string().contains("No model configured"));
    }

    #[test]
    fn test_missing_large_context_falls_through() {
        let mut config = catalog();
        config.defaults.large_context = None;
        let handle = select_model(&config, TaskType::Chat, 500_000, None).unwrap();
        assert_eq!(handle.id, "small");
    }

    #[test]
    fn test_task_type_parse() {
        for task in TaskType::ALL {
            assert_eq!(TaskType::parse(task.as_str()), Some(task));
        }
        assert_eq!(TaskType::parse("large-context"), Some(TaskType::LargeContext));
        assert_eq!(TaskType::parse("unknown"), None);
    }
}
