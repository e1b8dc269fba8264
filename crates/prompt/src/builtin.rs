//! Prompt definitions compiled into the binary.

/// Prompt used for questions answered against the whole book.
pub const FULL_BOOK_PROMPT_ID: &str = "book.answer.full";

/// Prompt used for questions answered against a user selection.
pub const SELECTION_PROMPT_ID: &str = "book.answer.selection";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        FULL_BOOK_PROMPT_ID,
        include_str!("../prompts/book.answer.full.yml"),
    ),
    (
        SELECTION_PROMPT_ID,
        include_str!("../prompts/book.answer.selection.yml"),
    ),
];

/// Raw YAML of a built-in prompt, if one exists with this id.
pub fn builtin_source(prompt_id: &str) -> Option<&'static str> {
    BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .map(|(_, source)| *source)
}

/// Ids of all built-in prompts.
pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTIN_PROMPTS.iter().map(|(id, _)| *id)
}
