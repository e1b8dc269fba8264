//! Command handlers for the bookrag CLI.

pub mod ask;
pub mod prompts;
pub mod stats;

pub use ask::AskCommand;
pub use prompts::PromptsCommand;
pub use stats::StatsCommand;

use bookrag_core::{config::AppConfig, AppError, AppResult, RagConfig};
use bookrag_knowledge::{create_provider, PromptSet, RagPipeline, SqliteChunkStore};
use bookrag_llm::create_client;
use std::sync::Arc;

/// Open the configured chunk store.
pub(crate) fn open_store(config: &AppConfig) -> AppResult<Arc<SqliteChunkStore>> {
    let path = config.store_path();
    tracing::debug!("Chunk store: {:?}", path);
    Ok(Arc::new(SqliteChunkStore::open(path)?))
}

/// Wire the answering pipeline from configuration.
pub(crate) fn build_pipeline(config: &AppConfig, rag: RagConfig) -> AppResult<RagPipeline> {
    let store = open_store(config)?;
    let embedder = create_provider(&config.embedding)?;

    let endpoint = config
        .get_provider_config(&config.provider)
        .and_then(|p| p.endpoint());
    let api_key = config.resolve_api_key(&config.provider);
    let llm = create_client(&config.provider, endpoint, api_key.as_deref())
        .map_err(AppError::Config)?;

    tracing::debug!(
        provider = %config.provider,
        model = %config.model,
        embedding = embedder.model_name(),
        "Building pipeline"
    );

    RagPipeline::new(
        rag,
        embedder,
        store.clone(),
        store,
        llm,
        PromptSet::load(&config.workspace)?,
        config.model.clone(),
    )
}
