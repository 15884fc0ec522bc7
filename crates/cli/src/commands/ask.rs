//! Ask command handler.
//!
//! Runs the ask pipeline and renders its events as they arrive: progress on
//! stderr, the answer on stdout, or every event as one JSON line with
//! `--json`.

use clap::Args;
use docask_core::{config::AppConfig, AppError, AppResult};
use docask_knowledge::rag::{AskEngine, AskEvent, ModelOverrides, StageContext};
use docask_llm::FactoryClients;
use docask_prompt::PromptLibrary;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Answer a question from the indexed documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Catalog id of the model that plans the searches
    #[arg(long)]
    pub strategy_model: Option<String>,

    /// Catalog id of the model that answers each search
    #[arg(long)]
    pub answer_model: Option<String>,

    /// Catalog id of the model that writes the final answer
    #[arg(long)]
    pub final_model: Option<String>,

    /// Print every event as a JSON line
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        config.validate()?;

        let retrieval = docask_knowledge::open_retrieval(config)?;
        let prompts = PromptLibrary::for_workspace(&config.workspace)?;
        let clients = FactoryClients::from_config(config);

        let engine = AskEngine::new(StageContext::new(
            config.models.clone(),
            config.ask.clone(),
            prompts,
            Arc::new(clients),
            retrieval,
        ));

        let overrides = ModelOverrides {
            strategy: self.strategy_model.clone(),
            answer: self.answer_model.clone(),
            final_answer: self.final_model.clone(),
        };

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling");
                    cancel.cancel();
                }
            }
        });

        let mut stream = engine.ask(self.question.clone(), overrides, cancel);
        let mut failure = None;

        while let Some(event) = stream.next().await {
            if self.json {
                println!("{}", serde_json::to_string(&event)?);
            } else {
                render(&event);
            }

            if let AskEvent::Error { kind, message } = event {
                failure = Some(AppError::Other(format!("ask failed ({}): {}", kind, message)));
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn render(event: &AskEvent) {
    match event {
        AskEvent::Strategy(strategy) => {
            eprintln!("Plan: {}", strategy.reasoning.trim());
            for (i, directive) in strategy.directives.iter().enumerate() {
                eprintln!("  {}. {}: {}", i + 1, directive.term, directive.instructions);
            }
            eprintln!();
        }
        AskEvent::Answer(answer) => {
            let mark = if answer.failed { "no results" } else { "done" };
            eprintln!(
                "[{}] search {} \"{}\" ({} citations)",
                mark,
                answer.directive_index + 1,
                answer.term,
                answer.citations.len()
            );
        }
        AskEvent::Final(answer) => {
            eprintln!();
            println!("{}", answer.text);
            if !answer.citations.is_empty() {
                println!();
                println!("Sources: {}", answer.citations.join(", "));
            }
        }
        AskEvent::Error { kind, message } => {
            eprintln!("Error ({}): {}", kind, message);
        }
        AskEvent::Complete => {}
    }
}
