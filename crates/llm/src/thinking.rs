//! Cleanup of raw model output.
//!
//! Reasoning models wrap their chain of thought in `<think>` tags, and some
//! emit only the closing tag. Everything downstream (JSON parsing, citation
//! sanitizing, the streamed answer text) must only ever see the cleaned part.

use regex::Regex;
use std::sync::LazyLock;

/// Inputs longer than this are returned untouched.
pub const MAX_THINKING_INPUT_CHARS: usize = 100_000;

static THINK_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<think>(.*?)</think>").ok());

static THINK_NO_OPEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*?)</think>").ok());

static BLANK_RUN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").ok());

static FENCED_JSON: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").ok());

/// Split model output into `(thinking, cleaned)`.
pub fn parse_thinking_content(content: &str) -> (String, String) {
    if content.len() > MAX_THINKING_INPUT_CHARS {
        return (String::new(), content.to_string());
    }

    let (Some(block), Some(no_open)) = (THINK_BLOCK.as_ref(), THINK_NO_OPEN.as_ref()) else {
        return (String::new(), content.to_string());
    };

    let thoughts: Vec<&str> = block
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .collect();

    if !thoughts.is_empty() {
        let stripped = block.replace_all(content, "");
        let cleaned = match BLANK_RUN.as_ref() {
            Some(blank) => blank.replace_all(&stripped, "\n\n").trim().to_string(),
            None => stripped.trim().to_string(),
        };
        return (thoughts.join("\n\n"), cleaned);
    }

    if let Some(caps) = no_open.captures(content) {
        let thinking = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
        return (thinking.to_string(), content[end..].trim().to_string());
    }

    (String::new(), content.to_string())
}

/// Drop thinking blocks and return only the answer part.
pub fn clean_thinking_content(content: &str) -> String {
    parse_thinking_content(content).1
}

/// Find the JSON object inside a model reply.
///
/// Accepts bare JSON, a fenced ```json block, or an object surrounded by
/// prose. Returns the slice spanning the outermost braces.
pub fn extract_json(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    if let Some(fenced) = FENCED_JSON.as_ref().and_then(|re| re.captures(trimmed)) {
        if let Some(inner) = fenced.get(1) {
            let inner = inner.as_str().trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_block() {
        let (thinking, cleaned) =
            parse_thinking_content("<think>Let me analyze this</think>Here's my answer");
        assert_eq!(thinking, "Let me analyze this");
        assert_eq!(cleaned, "Here's my answer");
    }

    #[test]
    fn test_multiple_blocks_and_blank_lines() {
        let raw = "<think>a</think>First\n\n\n\n<think> b </think>Second";
        let (thinking, cleaned) = parse_thinking_content(raw);
        assert_eq!(thinking, "a\n\nb");
        assert_eq!(cleaned, "First\n\nSecond");
    }

    #[test]
    fn test_missing_opening_tag() {
        let (thinking, cleaned) = parse_thinking_content("planning steps</think>\nThe answer");
        assert_eq!(thinking, "planning steps");
        assert_eq!(cleaned, "The answer");
    }

    #[test]
    fn test_no_tags_is_identity() {
        let (thinking, cleaned) = parse_thinking_content("  plain text ");
        assert!(thinking.is_empty());
        assert_eq!(cleaned, "  plain text ");
    }

    #[test]
    fn test_oversized_input_untouched() {
        let raw = format!("<think>x</think>{}", "y".repeat(MAX_THINKING_INPUT_CHARS));
        assert_eq!(clean_thinking_content(&raw), raw);
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a":1}"#), Some(r#"{"a":1}"#));
        assert_eq!(
            extract_json("```json\n{\"a\": 1}\n```"),
            Some("{\"a\": 1}")
        );
        assert_eq!(
            extract_json("Sure! Here it is: {\"a\": {\"b\": 2}} hope it helps"),
            Some("{\"a\": {\"b\": 2}}")
        );
        assert_eq!(extract_json("no json here"), None);
    }
}
