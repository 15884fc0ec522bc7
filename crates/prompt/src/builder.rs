//! Rendering prompt definitions.

use crate::types::{BuiltPrompt, PromptDefinition};
use docask_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;

/// Render a definition against `data`.
///
/// `data` is any serializable value; templates address its fields by name
/// (`{{question}}`, `{{#each ids}}`). Missing fields render as empty text.
///
/// # Example
/// ```no_run
/// use docask_prompt::{build_prompt, PromptLibrary};
/// use serde_json::json;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let library = PromptLibrary::builtin()?;
/// let built = build_prompt(
///     library.get("ask.strategy")?,
///     &json!({"question": "What is Rust?", "max_directives": 5}),
/// )?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt<T: Serialize>(
    definition: &PromptDefinition,
    data: &T,
) -> AppResult<BuiltPrompt> {
    tracing::debug!(prompt = %definition.id, "Building prompt");

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, data))
        .transpose()?
        .map(|s| s.trim_end().to_string());

    let user = render_template(&definition.template, data)?;

    Ok(BuiltPrompt {
        system,
        user,
        source_prompt_id: definition.id.clone(),
    })
}

/// Render a Handlebars template.
pub fn render_template<T: Serialize>(template: &str, data: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptOutputSpec;
    use serde_json::json;

    fn definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            description: String::new(),
            system: system.map(str::to_string),
            template: "Question: {{question}}".to_string(),
            output: PromptOutputSpec::default(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let rendered = render_template("Question: {{question}}", &json!({"question": "a < b?"}));
        // No HTML escaping
        assert_eq!(rendered.unwrap(), "Question: a < b?");
    }

    #[test]
    fn test_render_each_over_ids() {
        let rendered = render_template(
            "{{#each ids}}[{{this}}] {{/each}}",
            &json!({"ids": ["doc:a", "doc:b"]}),
        )
        .unwrap();
        assert_eq!(rendered, "[doc:a] [doc:b] ");
    }

    #[test]
    fn test_build_prompt_with_system() {
        let built = build_prompt(
            &definition(Some("You answer about {{question}}\n")),
            &json!({"question": "Rust"}),
        )
        .unwrap();
        assert_eq!(built.system.as_deref(), Some("You answer about Rust"));
        assert_eq!(built.user, "Question: Rust");
        assert_eq!(built.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_render_template_missing_variable() {
        let result = render_template("Question: {{missing}}", &json!({}));
        assert_eq!(result.unwrap(), "Question: ");
    }

    #[test]
    fn test_render_template_syntax_error() {
        let err = render_template("{{#if}}", &json!({})).unwrap_err();
        assert!(matches!(err, AppError::Prompt(_)));
    }
}
