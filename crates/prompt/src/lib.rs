//! Prompt system for docask.
//!
//! - YAML prompt definitions with an optional system template
//! - Handlebars rendering against any serializable data
//! - Built-in ask prompts with per-workspace overrides

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, render_template};
pub use loader::{list_prompts, load_prompt, PromptLibrary};
pub use types::{BuiltPrompt, PromptDefinition, PromptOrigin, PromptOutputSpec};
