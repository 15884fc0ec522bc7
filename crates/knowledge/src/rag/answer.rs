//! Per-directive answers.
//!
//! Every directive is answered on its own from its own search results.
//! Nothing that goes wrong here is fatal: the directive is reported as
//! having found nothing and its siblings carry on.

use super::citations::sanitize_citations;
use super::stage::StageContext;
use super::types::{SearchDirective, SubAnswer};
use crate::types::SearchMode;
use docask_core::{AppError, AppResult};
use docask_llm::thinking::clean_thinking_content;
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Answer one directive within the directive time budget.
#[instrument(skip_all, fields(term = %directive.term))]
pub async fn answer_directive(
    ctx: &StageContext,
    question: &str,
    index: usize,
    directive: &SearchDirective,
    override_id: Option<&str>,
) -> SubAnswer {
    let budget = ctx.settings.directive_timeout();
    let outcome = match tokio::time::timeout(
        budget,
        search_and_answer(ctx, question, index, directive, override_id),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(AppError::RetrievalTimeout(format!(
            "directive {} exceeded {}s",
            index,
            budget.as_secs()
        ))),
    };

    match outcome {
        Ok(answer) => {
            info!(citations = answer.citations.len(), "Directive answered");
            answer
        }
        Err(e) => {
            warn!("Directive failed softly: {}", e);
            SubAnswer::no_information(index, &directive.term)
        }
    }
}

async fn search_and_answer(
    ctx: &StageContext,
    question: &str,
    index: usize,
    directive: &SearchDirective,
    override_id: Option<&str>,
) -> AppResult<SubAnswer> {
    let chunks = ctx
        .retrieval
        .search(
            &directive.term,
            SearchMode::Vector,
            ctx.settings.top_k,
            ctx.settings.min_score,
        )
        .await?;

    if chunks.is_empty() {
        return Err(AppError::Knowledge(format!(
            "no chunks above {:.2} for \"{}\"",
            ctx.settings.min_score, directive.term
        )));
    }

    let bundle = ctx.assembler.from_chunks(&chunks);
    let ids = bundle.source_ids();
    debug!(
        documents = ids.len(),
        tokens = bundle.token_count(),
        chars = bundle.char_count(),
        "Directive context assembled"
    );

    let prompt = ctx.prompts.render(
        "ask.directive",
        &json!({
            "question": question,
            "term": directive.term,
            "instructions": directive.instructions,
            "context": bundle.text(),
            "ids": ids,
            "example_id": ids.first(),
        }),
    )?;

    let (model, request) = ctx.prepare(&prompt, override_id)?;
    debug!(model = %model.handle.id, "Answering directive");
    let response = model.client.complete(&request).await?;

    let allowed: HashSet<String> = ids.into_iter().collect();
    let sanitized = sanitize_citations(clean_thinking_content(&response.content).trim(), &allowed);
    if sanitized.text.trim().is_empty() {
        return Err(AppError::ModelInvocation(format!(
            "{} returned an empty answer",
            model.handle.id
        )));
    }

    Ok(SubAnswer {
        directive_index: index,
        term: directive.term.clone(),
        text: sanitized.text,
        citations: sanitized.citations,
        supporting_chunk_ids: chunks.into_iter().map(|c| c.id).collect(),
        failed: false,
    })
}
