//! docask CLI
//!
//! Asks multi-step questions over an indexed document corpus, runs raw
//! searches and shows how models resolve.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ModelsCommand, SearchCommand};
use docask_core::logging::{self, LogFormat};
use docask_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

/// docask - cited answers from your documents
#[derive(Parser, Debug)]
#[command(name = "docask")]
#[command(about = "Cited answers from an indexed document corpus", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCASK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCASK_CONFIG")]
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

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Default LLM provider (ollama, openai, mock)
    #[arg(short, long, global = true, env = "DOCASK_PROVIDER")]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question from the indexed documents
    Ask(AskCommand),

    /// Search the index directly
    Search(SearchCommand),

    /// Inspect the model catalog and selection
    Models(ModelsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let mut config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    if cli.log_json {
        config.log_json = true;
    }

    let format = if config.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("docask starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Index: {:?}", config.index_path());

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Search(_) => "search",
        Commands::Models(_) => "models",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Models(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
