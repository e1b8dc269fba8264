//! bookrag CLI
//!
//! Asks grounded questions about a book stored in a local SQLite corpus.

mod commands;

use bookrag_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{AskCommand, PromptsCommand, StatsCommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// bookrag - grounded question answering over a book
#[derive(Parser, Debug)]
#[command(name = "bookrag")]
#[command(about = "Grounded question answering over a book", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "BOOKRAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "BOOKRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// LLM provider (ollama, openai, openrouter)
    #[arg(short, long, global = true, env = "BOOKRAG_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "BOOKRAG_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about the book, or about a selected passage
    Ask(AskCommand),

    /// Show corpus statistics
    Stats(StatsCommand),

    /// List available answer prompts
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (code, message) = outcome(run(cli).await);
    if let Some(message) = message {
        eprintln!("{}", message);
    }
    ExitCode::from(code)
}

/// Exit code for a finished command, plus the error line to print, if any.
///
/// Outages print nothing here: the ask command already showed the configured
/// unavailable message and the details stay in the debug log.
fn outcome(result: AppResult<()>) -> (u8, Option<String>) {
    match result {
        Ok(()) => (0, None),
        Err(e) if e.is_unavailable() => (2, None),
        Err(e) => (1, Some(format!("Error: {}", e))),
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        None,
        None,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("bookrag starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => match config.validate() {
            Ok(()) => cmd.execute(&config).await,
            Err(e) => Err(e),
        },
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) if e.is_unavailable() => tracing::debug!("Command failed: {}", e),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrag_core::AppError;

    #[test]
    fn test_outage_exits_without_internal_detail() {
        let (code, message) = outcome(Err(AppError::RetrievalUnavailable(
            "query embedding failed after 3 attempts: connection refused".to_string(),
        )));
        assert_eq!(code, 2);
        assert_eq!(message, None);

        let (code, message) = outcome(Err(AppError::GenerationUnavailable("timeout".to_string())));
        assert_eq!(code, 2);
        assert_eq!(message, None);
    }

    #[test]
    fn test_other_errors_print_one_line() {
        let (code, message) = outcome(Err(AppError::Config("rag.top_k must be at least 1".to_string())));
        assert_eq!(code, 1);
        let message = message.unwrap();
        assert!(message.starts_with("Error: "));
        assert!(message.contains("rag.top_k must be at least 1"));
        assert!(!message.contains("Config("));

        assert_eq!(outcome(Ok(())), (0, None));
    }
}
