//! Groundwork
//!
//! Answers questions grounded in a user's own Confluence pages, Gmail
//! messages and Slack conversations. Runs as an HTTP service (`serve`) or
//! answers a single question from the terminal (`ask`).

mod commands;
mod http;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ServeCommand};
use groundwork_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Groundwork - answers grounded in your connected sources
#[derive(Parser, Debug)]
#[command(name = "groundwork")]
#[command(about = "Answers grounded in your connected sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "GROUNDWORK_CONFIG")]
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

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "GROUNDWORK_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "GROUNDWORK_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the chat HTTP service
    Serve(ServeCommand),

    /// Answer one question from the terminal
    Ask(AskCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let bind = match &cli.command {
        Commands::Serve(cmd) => cmd.bind.clone(),
        Commands::Ask(_) => None,
    };

    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(
        bind,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Groundwork {} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Provider: {}", config.llm.provider);
    tracing::debug!("Model: {}", config.llm.model);

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ask(_) => "ask",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = {
        let _guard = span.enter();
        match cli.command {
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Ask(cmd) => cmd.execute(&config).await,
        }
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
