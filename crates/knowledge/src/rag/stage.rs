//! Resources shared by the ask stages.

use crate::context::ContextAssembler;
use crate::retrieval::RetrievalEngine;
use docask_core::{AppResult, AskSettings, ModelsConfig};
use docask_llm::{provision, ClientProvider, LlmRequest, ProvisionedModel, TaskType};
use docask_prompt::{BuiltPrompt, PromptLibrary};
use std::sync::Arc;

/// Immutable snapshot every stage of one engine reads from.
pub struct StageContext {
    pub models: ModelsConfig,
    pub settings: AskSettings,
    pub prompts: PromptLibrary,
    pub clients: Arc<dyn ClientProvider>,
    pub retrieval: RetrievalEngine,
    pub assembler: ContextAssembler,
}

impl StageContext {
    pub fn new(
        models: ModelsConfig,
        settings: AskSettings,
        prompts: PromptLibrary,
        clients: Arc<dyn ClientProvider>,
        retrieval: RetrievalEngine,
    ) -> Self {
        Self {
            models,
            settings,
            prompts,
            clients,
            retrieval,
            assembler: ContextAssembler::new(),
        }
    }

    /// Resolve the model for `prompt` and build its request.
    ///
    /// Selection runs on every call so a large prompt can be moved to the
    /// large-context model.
    pub fn prepare(
        &self,
        prompt: &BuiltPrompt,
        override_id: Option<&str>,
    ) -> AppResult<(ProvisionedModel, LlmRequest)> {
        let model = provision(
            &self.models,
            self.clients.as_ref(),
            TaskType::Tools,
            &prompt.full_text(),
            override_id,
        )?;

        let mut request = LlmRequest::new(prompt.user.clone(), model.handle.name.clone())
            .with_max_tokens(self.settings.max_tokens);
        if let Some(system) = &prompt.system {
            request = request.with_system(system.clone());
        }

        Ok((model, request))
    }
}
