//! Query planning: question in, search directives out.

use super::stage::StageContext;
use super::types::{SearchDirective, Strategy};
use docask_core::{AppError, AppResult};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

/// Ask the strategy model for a search plan.
///
/// A reply that cannot be used is retried once with stricter formatting
/// instructions; a second bad reply is `AppError::Planning`. Model and
/// configuration errors are returned as they are.
#[instrument(name = "plan", skip_all)]
pub async fn plan(
    ctx: &StageContext,
    question: &str,
    override_id: Option<&str>,
) -> AppResult<Strategy> {
    let first = match attempt(ctx, question, override_id, false).await? {
        Ok(strategy) => return Ok(strategy),
        Err(reason) => reason,
    };

    warn!("Planner reply unusable ({}), retrying with strict instructions", first);

    match attempt(ctx, question, override_id, true).await? {
        Ok(strategy) => Ok(strategy),
        Err(second) => Err(AppError::Planning(format!(
            "Planner produced no usable strategy after retry: {}",
            second
        ))),
    }
}

/// One planner call. The outer error is fatal, the inner one is a malformed
/// reply worth retrying.
async fn attempt(
    ctx: &StageContext,
    question: &str,
    override_id: Option<&str>,
    strict: bool,
) -> AppResult<Result<Strategy, String>> {
    let schema = Strategy::json_schema();
    let schema_text = serde_json::to_string_pretty(&schema)?;
    let prompt = ctx.prompts.render(
        "ask.strategy",
        &json!({
            "question": question,
            "max_directives": ctx.settings.max_directives,
            "strict": strict,
            "schema": schema_text,
        }),
    )?;

    let (model, request) = ctx.prepare(&prompt, override_id)?;
    info!(model = %model.handle.id, strict, "Planning searches");
    debug!(prompt = %request.prompt, "Strategy prompt");

    let value = match model.client.complete_structured(&request, &schema).await {
        Ok(value) => value,
        Err(AppError::Serialization(reason)) => return Ok(Err(reason)),
        Err(e) => return Err(e),
    };

    Ok(validate(value, ctx.settings.max_directives))
}

/// Parse and check a planner reply; caps the directive count.
fn validate(value: serde_json::Value, max_directives: usize) -> Result<Strategy, String> {
    let mut strategy: Strategy =
        serde_json::from_value(value).map_err(|e| format!("reply does not match schema: {}", e))?;

    if strategy.directives.is_empty() {
        return Err("reply contains no searches".to_string());
    }
    if strategy.directives.iter().any(|d| d.term.trim().is_empty()) {
        return Err("reply contains a blank search term".to_string());
    }

    if strategy.directives.len() > max_directives {
        debug!(
            "Planner returned {} searches, keeping {}",
            strategy.directives.len(),
            max_directives
        );
        strategy.directives.truncate(max_directives.max(1));
    }

    strategy.directives = strategy
        .directives
        .into_iter()
        .map(|d| SearchDirective {
            term: d.term.trim().to_string(),
            instructions: d.instructions.trim().to_string(),
        })
        .collect();

    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_caps_and_trims() {
        let value = json!({
            "reasoning": "r",
            "searches": [
                {"term": " a ", "instructions": "x"},
                {"term": "b", "instructions": "y"},
                {"term": "c", "instructions": "z"}
            ]
        });
        let strategy = validate(value, 2).unwrap();
        assert_eq!(strategy.directives.len(), 2);
        assert_eq!(strategy.directives[0].term, "a");
    }

    #[test]
    fn test_validate_rejects_empty_and_blank() {
        assert!(validate(json!({"reasoning": "r", "searches": []}), 5).is_err());
        assert!(validate(
            json!({"reasoning": "r", "searches": [{"term": "  ", "instructions": "x"}]}),
            5
        )
        .is_err());
        assert!(validate(json!({"plan": "nothing"}), 5).is_err());
    }
}
