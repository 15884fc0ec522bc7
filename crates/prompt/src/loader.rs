//! Loading prompt definitions.
//!
//! The ask pipeline's prompts ship inside the binary. A workspace can replace
//! any of them by dropping `<id>.yml` into `.docask/prompts/`.

use crate::builder::build_prompt;
use crate::types::{BuiltPrompt, PromptDefinition, PromptOrigin};
use docask_core::{AppError, AppResult};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const BUILTIN_PROMPTS: [(&str, &str); 3] = [
    ("ask.strategy", include_str!("../prompts/ask.strategy.yml")),
    ("ask.directive", include_str!("../prompts/ask.directive.yml")),
    ("ask.final", include_str!("../prompts/ask.final.yml")),
];

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".docask/prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// # Example
/// ```no_run
/// use docask_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "ask.strategy")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompt file {:?}: {}", prompt_file, e))
    })?;

    let definition = parse_prompt(&contents)
        .map_err(|e| AppError::Prompt(format!("{:?}: {}", prompt_file, e)))?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}'",
            prompt_file, definition.id
        )));
    }

    Ok(definition)
}

/// List all prompt IDs present in the workspace.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids: Vec<String> = walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("yml"))
        .filter_map(|e| {
            e.path()
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .collect();

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn parse_prompt(contents: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML: {}", e)))?;
    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.trim().is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.trim().is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    let mut parts = def.api_version.split('.');
    let well_formed = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(major), Some(minor), None)
            if !major.is_empty() && !minor.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
    );
    if !well_formed {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

/// The set of prompts a run renders from.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    definitions: HashMap<String, (PromptDefinition, PromptOrigin)>,
}

impl PromptLibrary {
    /// Prompts compiled into the binary.
    pub fn builtin() -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for (id, source) in BUILTIN_PROMPTS {
            let definition = parse_prompt(source)
                .map_err(|e| AppError::Prompt(format!("Built-in prompt '{}': {}", id, e)))?;
            definitions.insert(id.to_string(), (definition, PromptOrigin::Builtin));
        }
        Ok(Self { definitions })
    }

    /// Built-in prompts, replaced by any workspace file with the same id.
    pub fn for_workspace(workspace_path: &Path) -> AppResult<Self> {
        let mut library = Self::builtin()?;

        for id in list_prompts(workspace_path)? {
            let definition = load_prompt(workspace_path, &id)?;
            tracing::info!(prompt = %id, "Using workspace prompt override");
            library
                .definitions
                .insert(id, (definition, PromptOrigin::Workspace));
        }

        Ok(library)
    }

    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.definitions
            .get(id)
            .map(|(definition, _)| definition)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))
    }

    pub fn origin(&self, id: &str) -> Option<PromptOrigin> {
        self.definitions.get(id).map(|(_, origin)| *origin)
    }

    /// Render prompt `id` against `data`.
    pub fn render<T: Serialize>(&self, id: &str, data: &T) -> AppResult<BuiltPrompt> {
        build_prompt(self.get(id)?, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, content: &str) {
        let prompts_dir = dir.join(".docask/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join(format!("{}.yml", id)), content).unwrap();
    }

    fn valid_yaml(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Override"
apiVersion: "1.1"
template: "Custom: {{{{question}}}}"
"#,
            id
        )
    }

    #[test]
    fn test_builtin_prompts_parse() {
        let library = PromptLibrary::builtin().unwrap();
        for id in ["ask.strategy", "ask.directive", "ask.final"] {
            assert!(library.get(id).is_ok(), "missing {}", id);
            assert_eq!(library.origin(id), Some(PromptOrigin::Builtin));
        }
    }

    #[test]
    fn test_strict_section_only_when_requested() {
        let library = PromptLibrary::builtin().unwrap();
        let relaxed = library
            .render("ask.strategy", &json!({"question": "Q", "max_directives": 5, "strict": false}))
            .unwrap();
        let strict = library
            .render("ask.strategy", &json!({"question": "Q", "max_directives": 5, "strict": true}))
            .unwrap();
        assert!(!relaxed.user.contains("previous reply could not be used"));
        assert!(strict.user.contains("previous reply could not be used"));
        assert!(relaxed.system.is_some());
    }

    #[test]
    fn test_workspace_override() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "ask.final", &valid_yaml("ask.final"));

        let library = PromptLibrary::for_workspace(temp_dir.path()).unwrap();
        assert_eq!(library.origin("ask.final"), Some(PromptOrigin::Workspace));
        assert_eq!(library.origin("ask.strategy"), Some(PromptOrigin::Builtin));

        let built = library.render("ask.final", &json!({"question": "Why?"})).unwrap();
        assert_eq!(built.user, "Custom: Why?");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", "invalid: yaml: content:");
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_id_must_match_file_name() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "ask.final", &valid_yaml("something.else"));
        assert!(PromptLibrary::for_workspace(temp_dir.path()).is_err());
    }

    #[test]
    fn test_api_version_validation() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            "bad.version",
            "id: bad.version\ntitle: T\napiVersion: \"v1\"\ntemplate: x\n",
        );
        let err = load_prompt(temp_dir.path(), "bad.version").unwrap_err();
        assert!(err.to_string().contains("apiVersion"));
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "prompt2", &valid_yaml("prompt2"));
        write_prompt(temp_dir.path(), "prompt1", &valid_yaml("prompt1"));

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["prompt1".to_string(), "prompt2".to_string()]);
    }
}
