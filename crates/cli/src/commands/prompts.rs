//! Prompts command handler.

use bookrag_core::{config::AppConfig, AppResult};
use bookrag_prompt::{list_prompts, load_prompt};
use clap::Args;

/// List answer prompts (built-in and workspace overrides)
#[derive(Args, Debug)]
pub struct PromptsCommand {}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        for id in list_prompts(&config.workspace)? {
            let prompt = load_prompt(&config.workspace, &id)?;
            println!("{:<24} {}", prompt.id, prompt.title);
        }
        Ok(())
    }
}
