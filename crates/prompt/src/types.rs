//! Answer prompt definitions and their rendered form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An answer prompt as written in YAML, built in or overridden per workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Stable id, also the override file name without `.yml`
    pub id: String,

    /// Listed by `bookrag prompts`
    pub title: String,

    /// Definition schema version, `major.minor`
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    pub behavior: PromptBehavior,

    /// Handlebars template for the system message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Handlebars template for the user message. Receives `context` and `question`.
    pub template: String,
}

/// How a prompt constrains the answering model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// The only evidence the model may answer from
    pub evidence: EvidenceScope,
}

/// Evidence an answer prompt is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceScope {
    /// Numbered passages retrieved from the whole book
    Book,
    /// The text span the reader selected
    Selection,
}

impl fmt::Display for EvidenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceScope::Book => write!(f, "book"),
            EvidenceScope::Selection => write!(f, "selection"),
        }
    }
}

/// System and user messages rendered from a [`PromptDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub system: Option<String>,
    pub user: String,
    /// Id of the definition this was rendered from
    pub prompt_id: String,
}
