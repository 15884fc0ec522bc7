//! Bracket citation handling for model output.
//!
//! Models cite documents as `[document-id]`. Only ids that were actually put
//! in front of the model survive; anything else is removed from the text and
//! logged. Markdown links (`[text](url)`) and bracketed prose are left alone.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static BRACKETS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]\r\n]{1,200})\]").ok());

/// Model text after citation cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SanitizedText {
    pub text: String,
    /// Kept ids, de-duplicated, in order of first appearance
    pub citations: Vec<String>,
    /// Ids that were stripped
    pub removed: Vec<String>,
}

/// Parts of a bracket body read as a citation group.
struct Citation<'a> {
    kept: Vec<&'a str>,
    removed: Vec<&'a str>,
}

/// Classify a bracket body against `allowed`, or `None` when it reads as
/// prose.
///
/// The whole body is tried first so ids containing spaces or separators
/// match. Otherwise the body is split on `,` and `;`. A group that names no
/// allowed id is still a citation when every part looks like a reference,
/// and is stripped.
fn classify<'a>(body: &'a str, allowed: &HashSet<String>) -> Option<Citation<'a>> {
    let whole = body.trim();
    if whole.is_empty() {
        return None;
    }
    if allowed.contains(whole) {
        return Some(Citation {
            kept: vec![whole],
            removed: Vec::new(),
        });
    }

    let parts: Vec<&str> = whole
        .split([',', ';'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let names_allowed = parts.iter().any(|p| allowed.contains(*p));
    if parts.is_empty() || !(names_allowed || parts.iter().all(|p| looks_like_reference(p))) {
        return None;
    }

    let (kept, removed): (Vec<&str>, Vec<&str>) =
        parts.into_iter().partition(|p| allowed.contains(*p));
    Some(Citation { kept, removed })
}

/// Single tokens (`doc:a`, `7`), prefixed ids (`source:Other Paper`) and
/// author-year forms (`Smith 2020`).
fn looks_like_reference(part: &str) -> bool {
    !part.contains(char::is_whitespace)
        || part.contains(':')
        || part.chars().any(|c| c.is_ascii_digit())
}

/// Keep citations to ids in `allowed`, strip the rest.
pub fn sanitize_citations(text: &str, allowed: &HashSet<String>) -> SanitizedText {
    let Some(pattern) = BRACKETS.as_ref() else {
        return SanitizedText {
            text: text.to_string(),
            ..SanitizedText::default()
        };
    };

    let mut result = SanitizedText::default();
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let rest = &text[whole.end()..];
        if rest.starts_with('(') {
            continue;
        }
        let Some(Citation { kept, removed }) = classify(body.as_str(), allowed) else {
            continue;
        };

        output.push_str(&text[last..whole.start()]);
        last = whole.end();

        for id in &kept {
            if !result.citations.iter().any(|c| c == *id) {
                result.citations.push(id.to_string());
            }
        }
        for id in removed {
            tracing::warn!(citation = %id, "Removed citation to a document that was not provided");
            result.removed.push(id.to_string());
        }

        if kept.is_empty() {
            let next = rest.chars().next();
            if next.is_none_or(|c| c.is_whitespace() || ",.;:!?)".contains(c)) {
                let trimmed = output.trim_end_matches([' ', '\t']).len();
                output.truncate(trimmed);
            }
        } else {
            for id in kept {
                output.push('[');
                output.push_str(id);
                output.push(']');
            }
        }
    }

    output.push_str(&text[last..]);
    result.text = output;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_keeps_allowed_and_orders_by_first_use() {
        let out = sanitize_citations(
            "Rust has ownership [doc:b]. Borrowing is checked [doc:a] [doc:b].",
            &allowed(&["doc:a", "doc:b"]),
        );
        assert_eq!(out.citations, vec!["doc:b", "doc:a"]);
        assert_eq!(
            out.text,
            "Rust has ownership [doc:b]. Borrowing is checked [doc:a] [doc:b]."
        );
        assert!(out.removed.is_empty());
    }

    #[test]
    fn test_strips_invented_ids() {
        let out = sanitize_citations(
            "Claim one [doc:a]. Claim two [doc:zz]. Claim three [7] and more.",
            &allowed(&["doc:a"]),
        );
        assert_eq!(out.text, "Claim one [doc:a]. Claim two. Claim three and more.");
        assert_eq!(out.citations, vec!["doc:a"]);
        assert_eq!(out.removed, vec!["doc:zz", "7"]);
    }

    #[test]
    fn test_grouped_citations_filtered() {
        let out = sanitize_citations(
            "Both agree [doc:a, doc:x; doc:b].",
            &allowed(&["doc:a", "doc:b"]),
        );
        assert_eq!(out.text, "Both agree [doc:a][doc:b].");
        assert_eq!(out.citations, vec!["doc:a", "doc:b"]);
    }

    #[test]
    fn test_links_and_prose_untouched() {
        let text = "See [the book](https://doc.rust-lang.org) and [as noted above] here.";
        let out = sanitize_citations(text, &allowed(&[]));
        assert_eq!(out.text, text);
        assert!(out.citations.is_empty());
        assert!(out.removed.is_empty());
    }

    #[test]
    fn test_strips_invented_author_year_citations() {
        let out = sanitize_citations(
            "Claim [doc:a]. Other claim [Smith 2020]. Third [Jones 2019; doc:q].",
            &allowed(&["doc:a"]),
        );
        assert_eq!(out.text, "Claim [doc:a]. Other claim. Third.");
        assert_eq!(out.citations, vec!["doc:a"]);
        assert_eq!(out.removed, vec!["Smith 2020", "Jones 2019", "doc:q"]);
    }

    #[test]
    fn test_ids_with_spaces_are_recognised() {
        let out = sanitize_citations(
            "X causes Y [source:My Paper]. Also [source:My Paper, doc:b].",
            &allowed(&["source:My Paper", "doc:b"]),
        );
        assert_eq!(out.citations, vec!["source:My Paper", "doc:b"]);
        assert_eq!(
            out.text,
            "X causes Y [source:My Paper]. Also [source:My Paper][doc:b]."
        );
        assert!(out.removed.is_empty());
    }

    #[test]
    fn test_unknown_prefixed_id_with_spaces_is_stripped() {
        let out = sanitize_citations("Claim [source:Other Paper] here.", &allowed(&["doc:a"]));
        assert_eq!(out.text, "Claim here.");
        assert_eq!(out.removed, vec!["source:Other Paper"]);
    }
}
