//! Constrained answer generation.

use crate::retry::RetryPolicy;
use crate::types::{AssembledContext, GeneratedAnswer, Query, QueryKind};
use bookrag_core::{AppError, AppResult};
use bookrag_llm::{LlmClient, LlmRequest};
use bookrag_prompt::{
    build_prompt, load_prompt, EvidenceScope, PromptDefinition, FULL_BOOK_PROMPT_ID,
    SELECTION_PROMPT_ID,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// The two prompt definitions the agent chooses between.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub full_book: PromptDefinition,
    pub selection: PromptDefinition,
}

impl PromptSet {
    /// Load both prompts, preferring workspace overrides over built-ins.
    ///
    /// An override written for the other evidence scope is rejected.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            full_book: load_scoped(workspace, FULL_BOOK_PROMPT_ID, EvidenceScope::Book)?,
            selection: load_scoped(workspace, SELECTION_PROMPT_ID, EvidenceScope::Selection)?,
        })
    }

    fn for_kind(&self, kind: &QueryKind) -> &PromptDefinition {
        match kind {
            QueryKind::FullBook => &self.full_book,
            QueryKind::Selection { .. } => &self.selection,
        }
    }
}

fn load_scoped(workspace: &Path, id: &str, scope: EvidenceScope) -> AppResult<PromptDefinition> {
    let definition = load_prompt(workspace, id)?;
    if definition.behavior.evidence != scope {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' answers from the {} but must answer from the {}",
            id, definition.behavior.evidence, scope
        )));
    }
    Ok(definition)
}

/// Sampling parameters for the answer model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Renders the grounded prompt and asks the model for a draft.
pub struct GenerationAgent {
    llm: Arc<dyn LlmClient>,
    prompts: PromptSet,
    settings: GenerationSettings,
    retry: RetryPolicy,
}

impl GenerationAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: PromptSet,
        settings: GenerationSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            llm,
            prompts,
            settings,
            retry,
        }
    }

    /// Produce a draft answer for `query` from `context`.
    ///
    /// An empty context yields the no-context sentinel and the model is not
    /// called.
    pub async fn generate(
        &self,
        query: &Query,
        context: AssembledContext,
    ) -> AppResult<GeneratedAnswer> {
        if context.is_empty() {
            info!("Empty context, skipping generation");
            return Ok(GeneratedAnswer::no_context(context));
        }

        let request = self.build_request(query, &context)?;
        debug!(
            provider = self.llm.provider_name(),
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Requesting draft answer"
        );

        let response = self
            .retry
            .run("answer generation", || self.llm.complete(&request))
            .await
            .map_err(|e| AppError::GenerationUnavailable(e.to_string()))?;

        info!(
            completion_tokens = response.usage.completion_tokens,
            "Draft answer generated"
        );
        Ok(GeneratedAnswer::draft(response.content.trim(), context))
    }

    fn build_request(&self, query: &Query, context: &AssembledContext) -> AppResult<LlmRequest> {
        let definition = self.prompts.for_kind(&query.kind);

        let mut variables = HashMap::new();
        variables.insert("question".to_string(), query.text.clone());
        variables.insert("context".to_string(), context.render());
        let built = build_prompt(definition, variables)?;
        debug!(prompt = %built.prompt_id, "Rendered answer prompt");

        let mut request = LlmRequest::new(built.user, self.settings.model.clone())
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        Ok(request)
    }
}
