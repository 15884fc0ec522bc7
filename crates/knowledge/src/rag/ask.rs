//! Ask orchestration.
//!
//! One run moves through `Planning -> Searching -> Synthesizing -> Done`,
//! or to `Failed` from any of them. Directives are answered concurrently on
//! a [`JoinSet`] bounded by a semaphore; synthesis starts only after every
//! directive task has resolved.

use super::answer::answer_directive;
use super::events::{AskEvent, AskStream};
use super::planner::plan;
use super::stage::StageContext;
use super::synthesis::synthesize;
use super::types::{ModelOverrides, SubAnswer};
use docask_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskState {
    Planning,
    Searching,
    Synthesizing,
    Done,
    Failed,
}

/// Answers questions over one index.
#[derive(Clone)]
pub struct AskEngine {
    ctx: Arc<StageContext>,
}

impl AskEngine {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Start a run and return its event stream.
    ///
    /// Cancelling `cancel`, or dropping the stream, stops the run. Must be
    /// called inside a Tokio runtime.
    pub fn ask(
        &self,
        question: impl Into<String>,
        overrides: ModelOverrides,
        cancel: CancellationToken,
    ) -> AskStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let token = cancel.child_token();

        let run = AskRun {
            ctx: Arc::clone(&self.ctx),
            question: question.into(),
            overrides,
            token: token.clone(),
            tx,
            state: AskState::Planning,
        };
        tokio::spawn(run.execute().instrument(info_span!("ask")));

        AskStream::new(rx, token.drop_guard())
    }
}

struct AskRun {
    ctx: Arc<StageContext>,
    question: String,
    overrides: ModelOverrides,
    token: CancellationToken,
    tx: mpsc::Sender<AskEvent>,
    state: AskState,
}

impl AskRun {
    async fn execute(mut self) {
        info!(question = %self.question, "Ask started");

        let token = self.token.clone();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(AppError::Cancelled("run cancelled".to_string())),
            result = self.drive() => result,
        };

        match outcome {
            Ok(()) => {
                self.transition(AskState::Done);
                let _ = self.tx.send(AskEvent::Complete).await;
            }
            Err(e) => {
                warn!("Ask failed in {:?}: {}", self.state, e);
                self.transition(AskState::Failed);
                let _ = self.tx.send(AskEvent::error(&e)).await;
            }
        }
    }

    fn transition(&mut self, next: AskState) {
        info!(from = ?self.state, to = ?next, "Ask state");
        self.state = next;
    }

    async fn emit(&self, event: AskEvent) -> AppResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AppError::Cancelled("event receiver dropped".to_string()))
    }

    async fn drive(&mut self) -> AppResult<()> {
        if self.question.trim().is_empty() {
            return Err(AppError::Planning("question is empty".to_string()));
        }

        let settings = &self.ctx.settings;
        let strategy = match tokio::time::timeout(
            settings.planning_timeout(),
            plan(&self.ctx, &self.question, self.overrides.strategy.as_deref()),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(AppError::Timeout(format!(
                    "planning exceeded {}s",
                    settings.planning_timeout_secs
                )))
            }
        };

        if strategy.directives.is_empty() {
            return Err(AppError::Planning("strategy has no searches".to_string()));
        }
        info!(directives = strategy.directives.len(), "Strategy ready");
        self.emit(AskEvent::Strategy(strategy.clone())).await?;

        self.transition(AskState::Searching);
        let answers = self.fan_out(&strategy.directives).await?;

        self.transition(AskState::Synthesizing);
        let final_timeout = self.ctx.settings.final_timeout();
        let final_answer = match tokio::time::timeout(
            final_timeout,
            synthesize(
                &self.ctx,
                &self.question,
                answers,
                self.overrides.final_answer.as_deref(),
            ),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(AppError::Timeout(format!(
                    "final synthesis exceeded {}s",
                    final_timeout.as_secs()
                )))
            }
        };

        self.emit(AskEvent::Final(final_answer)).await
    }

    /// Answer every directive, streaming each sub-answer as it lands.
    async fn fan_out(
        &self,
        directives: &[super::types::SearchDirective],
    ) -> AppResult<Vec<SubAnswer>> {
        let semaphore = Arc::new(Semaphore::new(self.ctx.settings.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, directive) in directives.iter().cloned().enumerate() {
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&semaphore);
            let token = self.token.clone();
            let question = self.question.clone();
            let override_id = self.overrides.answer.clone();

            tasks.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        answer = answer_directive(
                            &ctx,
                            &question,
                            index,
                            &directive,
                            override_id.as_deref(),
                        ) => Some(answer),
                    }
                }
                .instrument(info_span!("directive", index)),
            );
        }

        let mut answers: Vec<SubAnswer> = Vec::with_capacity(directives.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(answer)) => {
                    self.emit(AskEvent::Answer(answer.clone())).await?;
                    answers.push(answer);
                }
                Ok(None) => return Err(AppError::Cancelled("run cancelled".to_string())),
                Err(e) => warn!("Directive task did not finish: {}", e),
            }
        }

        for (index, directive) in directives.iter().enumerate() {
            if !answers.iter().any(|a| a.directive_index == index) {
                let answer = SubAnswer::no_information(index, &directive.term);
                self.emit(AskEvent::Answer(answer.clone())).await?;
                answers.push(answer);
            }
        }

        Ok(answers)
    }
}
