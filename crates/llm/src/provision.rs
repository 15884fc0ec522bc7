//! Turning a model selection into a usable client.
//!
//! [`provision`] estimates the outgoing prompt size, runs the selector and
//! asks a [`ClientProvider`] for the matching client. It is called once per
//! model invocation so the large-context upgrade sees the actual prompt.

use docask_core::config::{AppConfig, ModelsConfig};
use docask_core::tokens::estimate_tokens;
use docask_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Arc;

use crate::client::LlmClient;
use crate::factory::create_client;
use crate::registry::{select_model, ModelHandle, TaskType};

/// Maps a resolved model to the client that serves it.
pub trait ClientProvider: Send + Sync {
    fn client(&self, handle: &ModelHandle) -> AppResult<Arc<dyn LlmClient>>;
}

/// A selected model together with its client.
#[derive(Clone)]
pub struct ProvisionedModel {
    pub handle: ModelHandle,
    pub client: Arc<dyn LlmClient>,
    /// Token estimate that drove the selection
    pub token_estimate: usize,
}

impl std::fmt::Debug for ProvisionedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionedModel")
            .field("handle", &self.handle)
            .field("provider", &self.client.provider_name())
            .field("token_estimate", &self.token_estimate)
            .finish()
    }
}

/// Select and instantiate the model for a prompt.
pub fn provision(
    models: &ModelsConfig,
    clients: &dyn ClientProvider,
    task: TaskType,
    prompt: &str,
    override_id: Option<&str>,
) -> AppResult<ProvisionedModel> {
    let token_estimate = estimate_tokens(prompt);
    let handle = select_model(models, task, token_estimate, override_id)?;

    tracing::debug!(
        task = %task,
        model = %handle.id,
        provider = %handle.provider,
        token_estimate,
        "Provisioned model"
    );

    let client = clients.client(&handle)?;
    Ok(ProvisionedModel {
        handle,
        client,
        token_estimate,
    })
}

/// Builds clients through [`create_client`] using the configured endpoints
/// and API keys.
#[derive(Debug, Clone, Default)]
pub struct FactoryClients {
    endpoints: HashMap<String, String>,
    api_keys: HashMap<String, String>,
}

impl FactoryClients {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut endpoints = HashMap::new();
        let mut api_keys = HashMap::new();

        let mut providers: Vec<&str> = config
            .models
            .catalog
            .iter()
            .map(|entry| entry.provider.as_str())
            .collect();
        providers.sort_unstable();
        providers.dedup();

        for provider in providers {
            if let Some(endpoint) = config
                .get_provider_config(provider)
                .and_then(|p| p.endpoint().map(str::to_string))
            {
                endpoints.insert(provider.to_string(), endpoint);
            }
            if let Some(key) = config.resolve_api_key(provider) {
                api_keys.insert(provider.to_string(), key);
            }
        }

        Self {
            endpoints,
            api_keys,
        }
    }
}

impl ClientProvider for FactoryClients {
    fn client(&self, handle: &ModelHandle) -> AppResult<Arc<dyn LlmClient>> {
        create_client(
            &handle.provider,
            self.endpoints.get(&handle.provider).map(String::as_str),
            self.api_keys.get(&handle.provider).map(String::as_str),
        )
        .map_err(|e| AppError::Config(format!("Model '{}': {}", handle.id, e)))
    }
}

/// Fixed clients keyed by model id, with an optional catch-all.
#[derive(Clone, Default)]
pub struct StaticClients {
    by_model: HashMap<String, Arc<dyn LlmClient>>,
    fallback: Option<Arc<dyn LlmClient>>,
}

impl StaticClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve every model with `client`.
    pub fn uniform(client: Arc<dyn LlmClient>) -> Self {
        Self {
            by_model: HashMap::new(),
            fallback: Some(client),
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>, client: Arc<dyn LlmClient>) -> Self {
        self.by_model.insert(model_id.into(), client);
        self
    }
}

impl ClientProvider for StaticClients {
    fn client(&self, handle: &ModelHandle) -> AppResult<Arc<dyn LlmClient>> {
        self.by_model
            .get(&handle.id)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                AppError::Config(format!("No client registered for model '{}'", handle.id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedClient;
    use docask_core::config::{DefaultModels, ModelEntry, ModelKind};

    fn models(threshold: usize) -> ModelsConfig {
        let entry = |id: &str| ModelEntry {
            id: id.to_string(),
            provider: "mock".to_string(),
            name: id.to_string(),
            kind: ModelKind::Language,
        };
        ModelsConfig {
            catalog: vec![entry("small"), entry("big")],
            defaults: DefaultModels {
                chat: Some("small".to_string()),
                large_context: Some("big".to_string()),
                ..Default::default()
            },
            large_context_threshold: threshold,
        }
    }

    #[test]
    fn test_provision_uses_prompt_size() {
        let clients = StaticClients::uniform(Arc::new(ScriptedClient::echo()));

        let short =
            provision(&models(20), &clients, TaskType::Chat, "a short prompt", None).unwrap();
        assert_eq!(short.handle.id, "small");

        let long_prompt = "word ".repeat(50);
        let long = provision(&models(20), &clients, TaskType::Chat, &long_prompt, None).unwrap();
        assert_eq!(long.handle.id, "big");
        assert!(long.token_estimate > 20);
    }

    #[test]
    fn test_static_clients_by_model() {
        let small: Arc<dyn LlmClient> = Arc::new(ScriptedClient::echo());
        let clients = StaticClients::new().with_model("small", small);

        let handle = select_model(&models(100), TaskType::Chat, 0, None).unwrap();
        assert!(clients.client(&handle).is_ok());

        let big = select_model(&models(100), TaskType::Chat, 0, Some("big")).unwrap();
        assert!(matches!(clients.client(&big), Err(AppError::Config(_))));
    }

    #[test]
    fn test_factory_clients_from_default_config() {
        let config = AppConfig::default();
        let clients = FactoryClients::from_config(&config);
        let handle = select_model(&config.models, TaskType::Chat, 0, None).unwrap();
        let client = clients.client(&handle).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }
}
