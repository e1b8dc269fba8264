//! Prompt system for bookrag.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - Built-in grounded-answer prompts with workspace overrides
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use builtin::{FULL_BOOK_PROMPT_ID, SELECTION_PROMPT_ID};
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, EvidenceScope, PromptBehavior, PromptDefinition};
