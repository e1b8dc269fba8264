//! Stats command handler.
//!
//! Summarizes the stored book corpus.

use super::open_store;
use bookrag_core::{config::AppConfig, AppError, AppResult};
use bookrag_knowledge::ChunkStore;
use clap::Args;

/// Show corpus statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let store = open_store(config)?;
        let stats = store.stats().await?;

        if self.json {
            let output = serde_json::json!({
                "store": store.path(),
                "chunks": stats.chunks,
                "sections": stats.sections,
                "totalTokens": stats.total_tokens,
            });
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("Store:    {}", store.path().display());
            println!("Chunks:   {}", stats.chunks);
            println!("Sections: {}", stats.sections);
            println!("Tokens:   {}", stats.total_tokens);
            if stats.chunks == 0 {
                tracing::warn!("The chunk store is empty; every full-book question will be refused");
            }
        }

        Ok(())
    }
}
