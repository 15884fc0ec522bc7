//! Final answer from the collected sub-answers.

use super::citations::sanitize_citations;
use super::stage::StageContext;
use super::types::{no_information_text, FinalAnswer, SubAnswer};
use docask_core::AppResult;
use docask_llm::thinking::clean_thinking_content;
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Merge sub-answers into the final answer.
///
/// Citations are limited to those the successful sub-answers already carry.
/// When no sub-answer succeeded the model is not called.
#[instrument(name = "synthesize", skip_all, fields(answers = answers.len()))]
pub async fn synthesize(
    ctx: &StageContext,
    question: &str,
    mut answers: Vec<SubAnswer>,
    override_id: Option<&str>,
) -> AppResult<FinalAnswer> {
    answers.sort_by_key(|a| a.directive_index);
    let (succeeded, failed): (Vec<SubAnswer>, Vec<SubAnswer>) =
        answers.into_iter().partition(|a| !a.failed);

    let not_found = not_found_section(&failed);

    if succeeded.is_empty() {
        info!("No directive found evidence, skipping final model call");
        return Ok(FinalAnswer {
            text: format!(
                "The indexed documents do not contain enough evidence to answer \"{}\".{}",
                question, not_found
            ),
            citations: Vec::new(),
        });
    }

    let mut ids: Vec<String> = Vec::new();
    for id in succeeded.iter().flat_map(|a| a.citations.iter()) {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }

    let notes: Vec<_> = succeeded
        .iter()
        .map(|a| {
            json!({
                "index": a.directive_index + 1,
                "term": a.term,
                "text": a.text,
            })
        })
        .collect();

    let prompt = ctx.prompts.render(
        "ask.final",
        &json!({
            "question": question,
            "answers": notes,
            "ids": ids,
            "example_id": ids.first().map(String::as_str).unwrap_or("document-id"),
        }),
    )?;

    let (model, request) = ctx.prepare(&prompt, override_id)?;
    debug!(model = %model.handle.id, permitted = ids.len(), "Synthesizing final answer");
    let response = model.client.complete(&request).await?;

    let allowed: HashSet<String> = ids.into_iter().collect();
    let sanitized = sanitize_citations(clean_thinking_content(&response.content).trim(), &allowed);

    Ok(FinalAnswer {
        text: format!("{}{}", sanitized.text.trim_end(), not_found),
        citations: sanitized.citations,
    })
}

fn not_found_section(failed: &[SubAnswer]) -> String {
    if failed.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = failed
        .iter()
        .map(|a| format!("- {}", no_information_text(&a.term)))
        .collect();
    format!("\n\n## Not found\n\n{}", lines.join("\n"))
}
