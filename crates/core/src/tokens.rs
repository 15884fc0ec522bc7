//! Token estimation shared by context assembly and model selection.
//!
//! The estimate is a stable approximation of a BPE tokenizer: text is split on
//! Unicode word boundaries, whitespace runs are free, and every other segment
//! costs one token per started group of four characters. The result never
//! depends on anything but the input string.

use unicode_segmentation::UnicodeSegmentation;

/// Characters folded into one token for long word segments.
const CHARS_PER_TOKEN: usize = 4;

/// Every estimated token covers at least this many characters of input.
pub const MIN_CHARS_PER_TOKEN: usize = 1;

/// Estimate the number of tokens in `text`.
pub fn estimate_tokens(text: &str) -> usize {
    text.split_word_bounds()
        .filter(|segment| !segment.chars().all(char::is_whitespace))
        .map(|segment| segment.chars().count().div_ceil(CHARS_PER_TOKEN))
        .sum()
}

/// Count Unicode scalar values in `text`.
pub fn count_chars(text: &str) -> usize {
    text.chars().count()
}
