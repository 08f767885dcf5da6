//! Loopwright CLI: the main entry point.
//!
//! Commands:
//! - `run`     Run one task to completion
//! - `demo`    Run the built-in demo scenarios
//! - `chat`    Interactive session, one run per message
//! - `config`  Show, locate or initialise the configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod session;

#[derive(Parser)]
#[command(
    name = "loopwright",
    about = "Loopwright: a decide, execute, observe agent loop",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single task
    Run {
        /// The task handed to the agent
        #[arg(short, long)]
        task: String,

        /// Iteration budget (defaults to agent.max_iterations)
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,

        /// Decision policy: mock, openai or assistant
        #[arg(short, long)]
        policy: Option<String>,

        /// Write the run's history as JSON to this file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Run the demo scenarios
    Demo {
        /// Iteration budget per scenario
        #[arg(short = 'n', long, default_value_t = 3)]
        max_iterations: u32,

        /// Decision policy: mock, openai or assistant
        #[arg(short, long)]
        policy: Option<String>,
    },

    /// Interactive session
    Chat {
        /// Iteration budget per message
        #[arg(short = 'n', long, default_value_t = 5)]
        max_iterations: u32,

        /// Decision policy: mock, openai or assistant
        #[arg(short, long)]
        policy: Option<String>,

        /// Save the conversation transcript to this file on exit
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            task,
            max_iterations,
            policy,
            export,
        } => commands::run::run(task, max_iterations, policy, export).await?,
        Commands::Demo {
            max_iterations,
            policy,
        } => commands::demo::run(max_iterations, policy).await?,
        Commands::Chat {
            max_iterations,
            policy,
            save,
        } => commands::chat::run(max_iterations, policy, save).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Init { force } => commands::config_cmd::init(force).await?,
        },
    }

    Ok(())
}
