//! Models command handler.

use clap::{Args, Subcommand};
use docask_core::{config::AppConfig, AppError, AppResult};
use docask_llm::{select_model, TaskType};

/// Inspect the model catalog and selection
#[derive(Args, Debug)]
pub struct ModelsCommand {
    #[command(subcommand)]
    pub action: ModelsAction,
}

#[derive(Subcommand, Debug)]
pub enum ModelsAction {
    /// List catalog entries and per-task defaults
    List(ModelsListCommand),
    /// Show which model a call would use
    Resolve(ModelsResolveCommand),
}

#[derive(Args, Debug)]
pub struct ModelsListCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ModelsResolveCommand {
    /// Task type (chat, transformation, tools, large_context, embedding,
    /// speech_to_text, text_to_speech)
    #[arg(long, default_value = "chat")]
    pub task: String,

    /// Estimated prompt size in tokens
    #[arg(long, default_value_t = 0)]
    pub tokens: usize,

    /// Catalog id that overrides the defaults
    #[arg(long = "override")]
    pub override_id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ModelsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            ModelsAction::List(cmd) => cmd.execute(config),
            ModelsAction::Resolve(cmd) => cmd.execute(config),
        }
    }
}

impl ModelsListCommand {
    fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let models = &config.models;

        if self.json {
            println!("{}", serde_json::to_string_pretty(models)?);
            return Ok(());
        }

        println!("Catalog:");
        for entry in &models.catalog {
            println!(
                "  {} ({}/{}, {:?})",
                entry.id, entry.provider, entry.name, entry.kind
            );
        }

        println!("Defaults:");
        for task in TaskType::ALL {
            let id = default_for(config, task).unwrap_or("-");
            println!("  {}: {}", task, id);
        }
        println!("Large-context threshold: {} tokens", models.large_context_threshold);

        Ok(())
    }
}

fn default_for(config: &AppConfig, task: TaskType) -> Option<&str> {
    let defaults = &config.models.defaults;
    let id = match task {
        TaskType::Chat => &defaults.chat,
        TaskType::Transformation => &defaults.transformation,
        TaskType::Tools => &defaults.tools,
        TaskType::LargeContext => &defaults.large_context,
        TaskType::Embedding => &defaults.embedding,
        TaskType::SpeechToText => &defaults.speech_to_text,
        TaskType::TextToSpeech => &defaults.text_to_speech,
    };
    id.as_deref()
}

impl ModelsResolveCommand {
    fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let task = TaskType::parse(&self.task)
            .ok_or_else(|| AppError::Config(format!("Unknown task type '{}'", self.task)))?;

        let handle = select_model(
            &config.models,
            task,
            self.tokens,
            self.override_id.as_deref(),
        )?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&handle)?);
        } else {
            println!(
                "{} -> {} ({}/{}, {:?})",
                task, handle.id, handle.provider, handle.name, handle.kind
            );
        }

        Ok(())
    }
}
