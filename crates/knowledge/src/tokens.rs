//! Token counting used for context budgets.
//!
//! A token is a Unicode word-boundary segment that is not pure whitespace, so
//! words, numbers and punctuation marks each count once.

use unicode_segmentation::UnicodeSegmentation;

fn token_indices(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_word_bound_indices()
        .filter(|(_, segment)| !segment.chars().all(char::is_whitespace))
}

/// Number of tokens in `text`.
pub fn count_tokens(text: &str) -> usize {
    token_indices(text).count()
}

/// Longest prefix of `text` holding at most `max_tokens` tokens.
///
/// The cut always falls on a segment boundary, never inside a character.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    if max_tokens == 0 {
        return "";
    }
    match token_indices(text).nth(max_tokens - 1) {
        Some((start, segment)) => &text[..start + segment.len()],
        None => text,
    }
}
