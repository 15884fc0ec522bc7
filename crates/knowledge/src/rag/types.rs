//! Ask pipeline data types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One search the planner wants run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchDirective {
    /// Query sent to the search engine
    pub term: String,

    /// What the answer model should extract from the results
    pub instructions: String,
}

/// Planner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Strategy {
    /// Why these searches answer the question
    pub reasoning: String,

    #[serde(rename = "searches")]
    pub directives: Vec<SearchDirective>,
}

impl Strategy {
    /// JSON schema handed to structured-output models.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Strategy)).unwrap_or_default()
    }
}

/// Result of one directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAnswer {
    /// Position of the directive in the strategy
    pub directive_index: usize,
    pub term: String,
    /// Answer text with sanitized `[document-id]` citations
    pub text: String,
    pub citations: Vec<String>,
    pub supporting_chunk_ids: Vec<String>,
    pub failed: bool,
}

impl SubAnswer {
    /// Soft failure placeholder for a directive that produced nothing usable.
    pub fn no_information(directive_index: usize, term: &str) -> Self {
        Self {
            directive_index,
            term: term.to_string(),
            text: no_information_text(term),
            citations: Vec::new(),
            supporting_chunk_ids: Vec::new(),
            failed: true,
        }
    }
}

pub fn no_information_text(term: &str) -> String {
    format!("No relevant information found for \"{}\".", term)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub text: String,
    /// Cited document ids, in order of first appearance
    pub citations: Vec<String>,
}

/// Per-stage model overrides for one run. `None` defers to the selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOverrides {
    pub strategy: Option<String>,
    pub answer: Option<String>,
    pub final_answer: Option<String>,
}
