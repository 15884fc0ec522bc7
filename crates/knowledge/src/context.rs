//! Context bundles handed to answer models.
//!
//! A bundle records which sources were included and how, and carries its
//! token and character counts. The counts are computed once from the
//! rendered text when the bundle is built, so they always describe what a
//! model will actually receive. Assembly never truncates to a budget.

use crate::types::RetrievedChunk;
use docask_core::tokens::{count_chars, estimate_tokens};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Characters kept when a selection without a summary is shown in summary mode.
pub const DEFAULT_SUMMARY_CHARS: usize = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InclusionMode {
    Excluded,
    Summary,
    Full,
}

impl InclusionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excluded => "excluded",
            Self::Summary => "summary",
            Self::Full => "full",
        }
    }
}

/// A candidate source and how it should be included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSelection {
    pub source_id: String,
    pub content: String,
    /// Precomputed condensed form, used in summary mode when present
    pub summary: Option<String>,
    pub mode: InclusionMode,
}

impl ContextSelection {
    pub fn new(
        source_id: impl Into<String>,
        content: impl Into<String>,
        mode: InclusionMode,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            content: content.into(),
            summary: None,
            mode,
        }
    }

    pub fn full(source_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(source_id, content, InclusionMode::Full)
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// One included source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextItem {
    source_id: String,
    mode: InclusionMode,
    content: String,
}

impl ContextItem {
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn mode(&self) -> InclusionMode {
        self.mode
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Immutable assembled context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextBundle {
    items: Vec<ContextItem>,
    text: String,
    token_count: usize,
    char_count: usize,
}

impl ContextBundle {
    fn from_items(items: Vec<ContextItem>) -> Self {
        let text = items
            .iter()
            .map(|item| format!("[{}] ({})\n{}", item.source_id, item.mode.as_str(), item.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            token_count: estimate_tokens(&text),
            char_count: count_chars(&text),
            items,
            text,
        }
    }

    pub fn items(&self) -> &[ContextItem] {
        &self.items
    }

    /// Rendered context; each item starts with its bracketed source id.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids of the included sources, in bundle order.
    pub fn source_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.source_id.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    summary_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            summary_chars: DEFAULT_SUMMARY_CHARS,
        }
    }
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summary_chars(mut self, summary_chars: usize) -> Self {
        self.summary_chars = summary_chars;
        self
    }

    /// Assemble selections in order. The first selection for a source id
    /// wins; excluded selections contribute nothing.
    pub fn build(&self, selections: &[ContextSelection]) -> ContextBundle {
        let mut seen = HashSet::new();
        let items = selections
            .iter()
            .filter(|s| seen.insert(s.source_id.clone()))
            .filter_map(|s| {
                let content = match s.mode {
                    InclusionMode::Excluded => return None,
                    InclusionMode::Full => s.content.clone(),
                    InclusionMode::Summary => match &s.summary {
                        Some(summary) => summary.clone(),
                        None => condense(&s.content, self.summary_chars),
                    },
                };
                Some(ContextItem {
                    source_id: s.source_id.clone(),
                    mode: s.mode,
                    content,
                })
            })
            .collect();

        ContextBundle::from_items(items)
    }

    /// Full-mode bundle of retrieved chunks grouped by document.
    ///
    /// Documents keep the order of their best chunk; each excerpt is
    /// prefixed with its source reference.
    pub fn from_chunks(&self, chunks: &[RetrievedChunk]) -> ContextBundle {
        let mut order: Vec<&str> = Vec::new();
        for chunk in chunks {
            if !order.contains(&chunk.document_id.as_str()) {
                order.push(&chunk.document_id);
            }
        }

        let selections: Vec<ContextSelection> = order
            .into_iter()
            .map(|document_id| {
                let content = chunks
                    .iter()
                    .filter(|c| c.document_id == document_id)
                    .map(|c| format!("({})\n{}", c.source_ref, c.excerpt))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                ContextSelection::full(document_id, content)
            })
            .collect();

        self.build(&selections)
    }
}

/// Prefix of `text` of at most `max_chars` characters, cut at a word boundary.
fn condense(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let prefix = &text[..cut];
    match prefix.rfind(char::is_whitespace) {
        Some(space) if space > 0 => prefix[..space].trim_end().to_string(),
        _ => prefix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_selection() {
        let bundle = ContextAssembler::new().build(&[]);
        assert!(bundle.is_empty());
        assert_eq!(bundle.text(), "");
        assert_eq!(bundle.token_count(), 0);
        assert_eq!(bundle.char_count(), 0);
    }

    #[test]
    fn test_modes() {
        let long = "alpha beta gamma delta epsilon zeta eta theta";
        let selections = vec![
            ContextSelection::full("doc:a", "Full body."),
            ContextSelection::new("doc:b", long, InclusionMode::Summary),
            ContextSelection::new("doc:c", "hidden", InclusionMode::Excluded),
            ContextSelection::new("doc:d", long, InclusionMode::Summary)
                .with_summary("Greek letters."),
        ];

        let bundle = ContextAssembler::new().with_summary_chars(20).build(&selections);
        let ids: Vec<&str> = bundle.items().iter().map(|i| i.source_id()).collect();
        assert_eq!(ids, vec!["doc:a", "doc:b", "doc:d"]);
        assert_eq!(bundle.items()[1].content(), "alpha beta gamma");
        assert_eq!(bundle.items()[2].content(), "Greek letters.");
        assert!(!bundle.text().contains("hidden"));
        assert!(bundle.text().starts_with("[doc:a] (full)\nFull body."));
    }

    #[test]
    fn test_duplicate_source_keeps_first() {
        let selections = vec![
            ContextSelection::new("doc:a", "first", InclusionMode::Excluded),
            ContextSelection::full("doc:a", "second"),
        ];
        assert!(ContextAssembler::new().build(&selections).is_empty());
    }

    #[test]
    fn test_from_chunks_groups_by_document() {
        let chunk = |id: &str, doc: &str, text: &str| RetrievedChunk {
            id: id.to_string(),
            document_id: doc.to_string(),
            excerpt: text.to_string(),
            relevance_score: 0.5,
            source_ref: format!("{}.md, position 0", doc),
        };
        let bundle = ContextAssembler::new().from_chunks(&[
            chunk("1", "b", "one"),
            chunk("2", "a", "two"),
            chunk("3", "b", "three"),
        ]);

        assert_eq!(bundle.source_ids(), vec!["b", "a"]);
        assert_eq!(
            bundle.items()[0].content(),
            "(b.md, position 0)\none\n\n(b.md, position 0)\nthree"
        );
    }

    fn selection_strategy() -> impl Strategy<Value = ContextSelection> {
        (
            "[a-z]{1,4}",
            ".{0,200}",
            proptest::option::of(".{0,50}"),
            prop_oneof![
                Just(InclusionMode::Excluded),
                Just(InclusionMode::Summary),
                Just(InclusionMode::Full)
            ],
        )
            .prop_map(|(id, content, summary, mode)| ContextSelection {
                source_id: id,
                content,
                summary,
                mode,
            })
    }

    proptest! {
        #[test]
        fn counts_match_rendered_text(
            selections in proptest::collection::vec(selection_strategy(), 0..8)
        ) {
            let bundle = ContextAssembler::new().with_summary_chars(40).build(&selections);
            prop_assert_eq!(bundle.token_count(), estimate_tokens(bundle.text()));
            prop_assert_eq!(bundle.char_count(), count_chars(bundle.text()));
            prop_assert!(bundle.char_count() >= bundle.token_count());
        }

        #[test]
        fn build_is_deterministic(
            selections in proptest::collection::vec(selection_strategy(), 0..8)
        ) {
            let assembler = ContextAssembler::new();
            prop_assert_eq!(assembler.build(&selections), assembler.build(&selections));
        }
    }
}
