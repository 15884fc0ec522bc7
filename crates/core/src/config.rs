//! Configuration management for docask.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.docask/config.yaml)
//!
//! The loaded [`AppConfig`] is an immutable snapshot. Pipeline components
//! receive the parts they need (`ModelsConfig`, `AskSettings`) by reference
//! per call instead of reading any global state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Default token estimate above which the large-context model takes over.
pub const DEFAULT_LARGE_CONTEXT_THRESHOLD: usize = 105_000;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docask/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default LLM provider used when a catalog entry does not name one
    pub provider: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Model catalog, per-task defaults and the large-context threshold
    pub models: ModelsConfig,

    /// Ask pipeline tuning
    pub ask: AskSettings,

    /// Retrieval index settings
    pub index: IndexConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Endpoint override for this provider, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// What a catalog model can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Language,
    Embedding,
    SpeechToText,
    TextToSpeech,
}

/// One model known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Stable identifier referenced by defaults and overrides
    pub id: String,

    /// Provider name ("ollama", "openai", "mock")
    pub provider: String,

    /// Provider-side model name
    pub name: String,

    #[serde(default)]
    pub kind: ModelKind,
}

/// Per-task default model ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultModels {
    pub chat: Option<String>,
    pub transformation: Option<String>,
    pub tools: Option<String>,
    pub large_context: Option<String>,
    pub embedding: Option<String>,
    pub speech_to_text: Option<String>,
    pub text_to_speech: Option<String>,
}

/// Model catalog snapshot consumed by the model selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsConfig {
    #[serde(default)]
    pub catalog: Vec<ModelEntry>,

    #[serde(default)]
    pub defaults: DefaultModels,

    #[serde(default = "default_large_context_threshold")]
    pub large_context_threshold: usize,
}

fn default_large_context_threshold() -> usize {
    DEFAULT_LARGE_CONTEXT_THRESHOLD
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            catalog: vec![ModelEntry {
                id: "ollama/llama3.2".to_string(),
                provider: "ollama".to_string(),
                name: "llama3.2".to_string(),
                kind: ModelKind::Language,
            }],
            defaults: DefaultModels {
                chat: Some("ollama/llama3.2".to_string()),
                ..Default::default()
            },
            large_context_threshold: DEFAULT_LARGE_CONTEXT_THRESHOLD,
        }
    }
}

impl ModelsConfig {
    /// Look up a catalog entry by id.
    pub fn entry(&self, id: &str) -> Option<&ModelEntry> {
        self.catalog.iter().find(|entry| entry.id == id)
    }
}

/// Tuning for the ask pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AskSettings {
    /// Chunks retrieved per directive
    pub top_k: usize,

    /// Minimum vector similarity for a chunk to count as evidence
    pub min_score: f32,

    /// Upper bound on directives accepted from the planner
    pub max_directives: usize,

    /// Directives processed at the same time
    pub max_concurrency: usize,

    pub planning_timeout_secs: u64,
    pub directive_timeout_secs: u64,
    pub final_timeout_secs: u64,

    /// Maximum tokens requested from each model call
    pub max_tokens: u32,
}

impl Default for AskSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            min_score: 0.2,
            max_directives: 5,
            max_concurrency: 4,
            planning_timeout_secs: 60,
            directive_timeout_secs: 90,
            final_timeout_secs: 120,
            max_tokens: 2000,
        }
    }
}

impl AskSettings {
    pub fn planning_timeout(&self) -> Duration {
        Duration::from_secs(self.planning_timeout_secs)
    }

    pub fn directive_timeout(&self) -> Duration {
        Duration::from_secs(self.directive_timeout_secs)
    }

    pub fn final_timeout(&self) -> Duration {
        Duration::from_secs(self.final_timeout_secs)
    }
}

/// Where the externally maintained index lives and how queries are embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexConfig {
    /// SQLite index file; relative paths resolve against the workspace
    pub path: Option<PathBuf>,

    /// Query embedding provider ("mock", "ollama")
    pub embedding_provider: String,

    pub embedding_model: String,

    pub dimensions: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: None,
            embedding_provider: "mock".to_string(),
            embedding_model: "trigram-v1".to_string(),
            dimensions: 384,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    models: Option<ModelsConfig>,
    ask: Option<AskSettings>,
    index: Option<IndexConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            llm: None,
            models: ModelsConfig::default(),
            ask: AskSettings::default(),
            index: IndexConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `DOCASK_WORKSPACE`: Override workspace path
    /// - `DOCASK_CONFIG`: Path to config file
    /// - `DOCASK_PROVIDER`: Default LLM provider
    /// - `DOCASK_MODEL`: Catalog id of the chat default model
    /// - `DOCASK_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docask_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("DOCASK_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("DOCASK_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".docask/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("DOCASK_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCASK_MODEL") {
            config.models.defaults.chat = Some(model);
        }

        config.api_key = std::env::var("DOCASK_API_KEY").ok();
        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_json = format.eq_ignore_ascii_case("json");
            }
        }

        if let Some(llm) = config_file.llm {
            result.llm = Some(llm);
        }

        if let Some(models) = config_file.models {
            result.models = models;
        }

        if let Some(ask) = config_file.ask {
            result.ask = ask;
        }

        if let Some(index) = config_file.index {
            result.index = index;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docask directory.
    pub fn docask_dir(&self) -> PathBuf {
        self.workspace.join(".docask")
    }

    /// Resolve the SQLite index path.
    pub fn index_path(&self) -> PathBuf {
        match self.index.path {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => self.workspace.join(path),
            None => self.docask_dir().join("index.db"),
        }
    }

    /// Get the configuration of a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve API key from environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        // Check explicit DOCASK_API_KEY first
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate the provider list and the model catalog.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama", "mock"];

        for entry in &self.models.catalog {
            if !known_providers.contains(&entry.provider.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown provider '{}' for model '{}'. Supported: {}",
                    entry.provider,
                    entry.id,
                    known_providers.join(", ")
                )));
            }
        }

        let defaults = &self.models.defaults;
        let expectations = [
            ("chat", &defaults.chat, ModelKind::Language),
            ("transformation", &defaults.transformation, ModelKind::Language),
            ("tools", &defaults.tools, ModelKind::Language),
            ("largeContext", &defaults.large_context, ModelKind::Language),
            ("embedding", &defaults.embedding, ModelKind::Embedding),
            ("speechToText", &defaults.speech_to_text, ModelKind::SpeechToText),
            ("textToSpeech", &defaults.text_to_speech, ModelKind::TextToSpeech),
        ];

        for (task, id, kind) in expectations {
            let Some(id) = id else { continue };
            match self.models.entry(id) {
                None => {
                    return Err(AppError::Config(format!(
                        "Default model '{}' for task '{}' is not in the catalog",
                        id, task
                    )))
                }
                Some(entry) if entry.kind != kind => {
                    return Err(AppError::Config(format!(
                        "Default model '{}' for task '{}' has kind {:?}, expected {:?}",
                        id, task, entry.kind, kind
                    )))
                }
                Some(_) => {}
            }
        }

        for entry in &self.models.catalog {
            if let Some(ProviderConfig::OpenAI { api_key_env, .. }) =
                self.get_provider_config(&entry.provider)
            {
                if self.api_key.is_none() && std::env::var(&api_key_env).is_err() {
                    return Err(AppError::Config(format!(
                        "API key not found in environment variable: {}",
                        api_key_env
                    )));
                }
            }
        }

        Ok(())
    }
}
