//! Ask command handler.
//!
//! Answers a question from the book, or from a selected passage only.

use super::build_pipeline;
use bookrag_core::{config::AppConfig, AppError, AppResult};
use bookrag_knowledge::{QueryRequest, Response, ResponseStatus};
use clap::Args;
use std::path::PathBuf;

/// Ask a question about the book
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Answer only from this selected text
    #[arg(long, conflicts_with = "selection_file")]
    pub selection: Option<String>,

    /// Read the selected text from a file
    #[arg(long)]
    pub selection_file: Option<PathBuf>,

    /// Number of passages to retrieve
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Minimum similarity for a passage to be used (0.0-1.0)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let mut rag = config.rag.clone();
        if let Some(top_k) = self.top_k {
            rag.top_k = top_k;
        }
        if let Some(threshold) = self.threshold {
            rag.similarity_threshold = threshold;
        }
        let unavailable_message = rag.unavailable_message.clone();

        let request = match self.selected_text()? {
            Some(text) => QueryRequest::selection(self.question.as_str(), text),
            None => QueryRequest::full_book(self.question.as_str()),
        };

        let pipeline = build_pipeline(config, rag)?;
        match pipeline.answer(request).await {
            Ok(response) => self.print(&response),
            Err(e) if e.is_unavailable() => {
                tracing::debug!("Dependency unavailable: {}", e);
                if self.json {
                    let output = serde_json::json!({
                        "error": "unavailable",
                        "message": unavailable_message,
                    });
                    println!("{}", to_pretty(&output)?);
                } else {
                    println!("{}", unavailable_message);
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn selected_text(&self) -> AppResult<Option<String>> {
        if let Some(ref text) = self.selection {
            return Ok(Some(text.clone()));
        }
        match self.selection_file {
            Some(ref path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("Failed to read selection file {:?}: {}", path, e))
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    fn print(&self, response: &Response) -> AppResult<()> {
        if self.json {
            println!("{}", to_pretty(response)?);
            return Ok(());
        }

        println!("{}", response.answer);

        if response.status == ResponseStatus::Refused {
            if let Some(ref reason) = response.reason {
                tracing::info!("Answer refused: {}", reason);
            }
            return Ok(());
        }

        println!();
        println!("Sources (confidence {:.2}):", response.confidence);
        for source in &response.sources {
            println!("  [{}] {}", source.marker, source.origin.label());
            println!("      {}", source.snippet);
        }
        Ok(())
    }
}

fn to_pretty<T: serde::Serialize + ?Sized>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::Serialization(e.to_string()))
}
