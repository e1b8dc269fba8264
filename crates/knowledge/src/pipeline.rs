//! Query orchestration: parse, gather context, generate, validate, respond.

use crate::context::ContextAssembler;
use crate::embeddings::EmbeddingProvider;
use crate::generation::{GenerationAgent, GenerationSettings, PromptSet};
use crate::grounding::{GroundingValidator, SupportScorer};
use crate::response::ResponseBuilder;
use crate::retriever::Retriever;
use crate::retry::RetryPolicy;
use crate::store::{ChunkStore, VectorIndex};
use crate::types::{ContextSource, Query, QueryKind, QueryRequest, Response};
use bookrag_core::{AppResult, RagConfig};
use bookrag_llm::LlmClient;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Everything needed to answer book questions.
///
/// Built once and shared; each [`RagPipeline::answer`] call is independent.
pub struct RagPipeline {
    config: Arc<RagConfig>,
    retriever: Retriever,
    generator: GenerationAgent,
    validator: GroundingValidator,
    responder: ResponseBuilder,
}

impl RagPipeline {
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn ChunkStore>,
        llm: Arc<dyn LlmClient>,
        prompts: PromptSet,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        config.validate()?;
        let retry = RetryPolicy::from_settings(&config.retry);
        let validator = GroundingValidator::from_config(&config)?;
        let generator = GenerationAgent::new(
            llm,
            prompts,
            GenerationSettings {
                model: model.into(),
                temperature: config.temperature,
                max_tokens: config.max_response_tokens,
            },
            retry.clone(),
        );

        Ok(Self {
            retriever: Retriever::new(embedder, index, store, retry),
            generator,
            validator,
            responder: ResponseBuilder::new(config.refusal_message.clone()),
            config: Arc::new(config),
        })
    }

    /// Replace the configured claim scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn SupportScorer>) -> Self {
        self.validator = self.validator.with_scorer(scorer);
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer one question.
    ///
    /// Invalid input is rejected before any external call. Retrieval and
    /// generation outages surface as errors; every other outcome is a
    /// [`Response`], grounded or refused.
    pub async fn answer(&self, request: QueryRequest) -> AppResult<Response> {
        let query = Query::parse(request, self.config.max_query_length)?;
        let query_id = Uuid::new_v4().to_string();
        let span = info_span!("rag_query", query_id = %query_id, kind = query.kind.as_str());

        self.run(&query_id, query).instrument(span).await
    }

    async fn run(&self, query_id: &str, query: Query) -> AppResult<Response> {
        info!(chars = query.text.chars().count(), "Answering query");

        let source = match &query.kind {
            QueryKind::FullBook => ContextSource::Retrieved(
                self.retriever
                    .retrieve(
                        &query.text,
                        self.config.top_k,
                        self.config.similarity_threshold,
                    )
                    .await?,
            ),
            QueryKind::Selection { selected_text } => {
                ContextSource::Selection(selected_text.clone())
            }
        };

        let context = ContextAssembler::assemble(source, self.config.context_token_budget);
        let answer = self.generator.generate(&query, context).await?;
        let verdict = self.validator.validate(&answer);
        let response = self.responder.build(query_id, &verdict, &answer);

        info!(
            state = ?verdict.state,
            grounded = response.grounded,
            sources = response.sources.len(),
            confidence = response.confidence,
            "Query answered"
        );
        Ok(response)
    }
}
