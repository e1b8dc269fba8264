//! Splitting a draft answer into checkable claims.
//!
//! A claim is a clause of a sentence or list item. Sentences come from
//! Unicode sentence boundaries, list items from line breaks, and clauses from
//! `,`, `;` and `:` when followed by whitespace (so `1,000` and `10:30` stay
//! whole). Enumerations are split further at connectors such as "and" or
//! "such as", so every listed item is checked on its own. Clauses without
//! content words are not claims.

use unicode_segmentation::UnicodeSegmentation;

/// Words that carry no evidence on their own, including phrases a model uses
/// to talk about its sources rather than the book's content.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "both", "but", "by", "can", "could", "did", "do",
    "does", "each", "either", "etc", "for", "from", "further", "had", "has", "have", "having",
    "he", "her", "here", "hers", "him", "his", "how", "however", "i", "if", "in", "into", "is",
    "it", "its", "itself", "just", "may", "me", "might", "more", "most", "must", "my", "no",
    "nor", "not", "of", "on", "once", "only", "or", "other", "our", "ours", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "then", "there", "these", "they", "this", "those", "through", "thus", "to", "too",
    "under", "until", "up", "us", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "yes", "you", "your", "yours",
    // source talk
    "according", "answer", "book", "chapter", "context", "describes", "explains", "mentioned",
    "mentions", "passage", "passages", "provided", "section", "selection", "selected", "source",
    "sources", "states", "stated", "text",
];

/// Words that join the items of an enumeration.
const CONNECTORS: &[&[&str]] = &[
    &["as", "well", "as"],
    &["such", "as"],
    &["including"],
    &["and"],
    &["or"],
];

/// A clause of the draft, located by byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Markers cited anywhere in the enclosing sentence
    pub cited_markers: Vec<usize>,
}

/// Normalized word form used for overlap checks.
///
/// Lowercases and folds simple plurals and possessives so "phases" matches
/// "phase" and "robot's" matches "robot".
pub fn normalize_word(word: &str) -> String {
    let mut word = word.to_lowercase();
    if let Some(stripped) = word.strip_suffix("'s").or_else(|| word.strip_suffix("’s")) {
        word = stripped.to_string();
    }
    if word.chars().count() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word.pop();
    }
    word
}

/// Every normalized word of `text`, including stop words.
pub fn all_words(text: &str) -> Vec<String> {
    text.unicode_words().map(normalize_word).collect()
}

/// Normalized content words of `text`, with citation markers removed.
pub fn content_words(text: &str) -> Vec<String> {
    strip_markers(text)
        .unicode_words()
        .filter(|w| w.chars().count() >= 2)
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .map(normalize_word)
        .collect()
}

/// Citation markers (`[n]`) appearing in `text`, in order of appearance.
pub fn cited_markers(text: &str) -> Vec<usize> {
    let mut markers = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        rest = &rest[open + 1..];
        let Some(close) = rest.find(']') else { break };
        let inner = &rest[..close];
        for part in inner.split(',') {
            if let Ok(n) = part.trim().parse::<usize>() {
                if !markers.contains(&n) {
                    markers.push(n);
                }
            }
        }
        rest = &rest[close + 1..];
    }
    markers
}

/// Replace every `[n]` / `[n, m]` marker with a space.
fn strip_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close)
                if !after[..close].trim().is_empty()
                    && after[..close]
                        .chars()
                        .all(|c| c.is_ascii_digit() || c == ',' || c.is_whitespace()) =>
            {
                out.push(' ');
                rest = &after[close + 1..];
            }
            _ => {
                out.push('[');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Whether `text` has at least one content word.
pub fn has_content(text: &str) -> bool {
    !content_words(text).is_empty()
}

/// Decompose a draft into claims.
pub fn decompose(draft: &str) -> Vec<Claim> {
    let mut claims = Vec::new();
    let mut line_start = 0;

    for line in draft.split_inclusive('\n') {
        let item_offset = line_start + list_marker_len(line);
        let item = &draft[item_offset..line_start + line.len()];

        for (sentence_offset, sentence) in item.split_sentence_bound_indices() {
            let sentence_start = item_offset + sentence_offset;
            let markers = cited_markers(sentence);
            for (clause_offset, clause) in split_clauses(sentence) {
                for (item_offset, item) in split_enumeration(clause) {
                    let offset = sentence_start + clause_offset + item_offset;
                    if let Some(claim) = make_claim(offset, item, &markers) {
                        claims.push(claim);
                    }
                }
            }
        }

        line_start += line.len();
    }

    claims
}

/// Byte length of a leading list marker such as `- `, `* `, `• `, `1. ` or `2) `.
fn list_marker_len(line: &str) -> usize {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();

    for bullet in ["- ", "* ", "• ", "+ "] {
        if trimmed.starts_with(bullet) {
            return indent + bullet.len();
        }
    }

    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if rest.starts_with(". ") || rest.starts_with(") ") {
            return indent + digits + 2;
        }
    }
    indent
}

/// Split a sentence at `,`, `;`, `:` followed by whitespace or end of text.
fn split_clauses(sentence: &str) -> Vec<(usize, &str)> {
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut chars = sentence.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if matches!(c, ',' | ';' | ':') {
            let at_break = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_break {
                clauses.push((start, &sentence[start..idx]));
                start = idx + c.len_utf8();
            }
        }
    }
    clauses.push((start, &sentence[start..]));
    clauses
}

/// Split a clause at enumeration connectors, dropping the connector words.
fn split_enumeration(clause: &str) -> Vec<(usize, &str)> {
    let words: Vec<(usize, &str)> = clause.unicode_word_indices().collect();
    let matches_at = |i: usize, connector: &[&str]| {
        words.len() - i >= connector.len()
            && words[i..i + connector.len()]
                .iter()
                .zip(connector)
                .all(|((_, word), c)| word.eq_ignore_ascii_case(c))
    };

    let mut items = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < words.len() {
        match CONNECTORS.iter().find(|c| matches_at(i, **c)) {
            Some(connector) => {
                let (last_idx, last) = words[i + connector.len() - 1];
                items.push((start, &clause[start..words[i].0]));
                start = last_idx + last.len();
                i += connector.len();
            }
            None => i += 1,
        }
    }
    items.push((start, &clause[start..]));
    items
}

fn make_claim(offset: usize, clause: &str, markers: &[usize]) -> Option<Claim> {
    let is_edge = |c: char| c.is_whitespace() || matches!(c, '.' | '!' | '?' | '"' | '“' | '”');
    let leading = clause.len() - clause.trim_start_matches(is_edge).len();
    let trimmed = clause.trim_matches(is_edge);
    if trimmed.is_empty() || !has_content(trimmed) {
        return None;
    }

    let start = offset + leading;
    Some(Claim {
        start,
        end: start + trimmed.len(),
        text: trimmed.to_string(),
        cited_markers: markers.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(claims: &[Claim]) -> Vec<&str> {
        claims.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_sentences_and_clauses() {
        let draft = "The gait cycle has stance and swing [1]. Stance covers 60%, swing covers 40%; both repeat.";
        let claims = decompose(draft);
        assert_eq!(
            texts(&claims),
            vec![
                "The gait cycle has stance",
                "swing [1]",
                "Stance covers 60%",
                "swing covers 40%",
                "both repeat",
            ]
        );
        assert_eq!(claims[0].cited_markers, vec![1]);
        assert_eq!(claims[1].cited_markers, vec![1]);
        assert!(claims[2].cited_markers.is_empty());
    }

    #[test]
    fn test_spans_point_into_draft() {
        let draft = "Intro line.\n- Heel strike starts stance.\n2) Toe off ends it.";
        for claim in decompose(draft) {
            assert_eq!(&draft[claim.start..claim.end], claim.text);
        }
        let claims = decompose(draft);
        assert_eq!(texts(&claims), vec!["Intro line", "Heel strike starts stance", "Toe off ends it"]);
    }

    #[test]
    fn test_numbers_and_times_are_not_split() {
        let claims = decompose("It weighs 1,000 kg; it starts at 10:30.");
        assert_eq!(texts(&claims), vec!["It weighs 1,000 kg", "it starts at 10:30"]);
    }

    #[test]
    fn test_clauses_without_content_are_dropped() {
        let claims = decompose("According to the text, the robot balances.");
        assert_eq!(texts(&claims), vec!["the robot balances"]);

        assert!(decompose("Yes. It is.").is_empty());
    }

    #[test]
    fn test_enumerations_split_into_items() {
        let draft = "The cycle has four phases including stance. Phases such as swing [1]. Heel strike and toe off or flight.";
        let claims = decompose(draft);
        assert_eq!(
            texts(&claims),
            vec!["The cycle has four phases", "stance", "Phases", "swing [1]", "Heel strike", "toe off", "flight"]
        );
        for claim in &claims {
            assert_eq!(&draft[claim.start..claim.end], claim.text);
        }

        let claims = decompose("Bipeds turn as well as walk.");
        assert_eq!(texts(&claims), vec!["Bipeds turn", "walk"]);
    }

    #[test]
    fn test_connectors_match_whole_words_only() {
        let claims = decompose("The android lands on its forefoot.");
        assert_eq!(texts(&claims), vec!["The android lands on its forefoot"]);
    }

    #[test]
    fn test_cited_markers() {
        assert_eq!(cited_markers("a [2] b [1, 3] c [x] [2]"), vec![2, 1, 3]);
        assert!(cited_markers("no markers [here").is_empty());
    }

    #[test]
    fn test_content_words_ignore_markers_and_stop_words() {
        assert_eq!(
            content_words("The phases of the gait [2]."),
            vec!["phase".to_string(), "gait".to_string()]
        );
    }

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("Phases"), "phase");
        assert_eq!(normalize_word("robot's"), "robot");
        assert_eq!(normalize_word("stress"), "stress");
        assert_eq!(normalize_word("gas"), "gas");
    }
}
