//! Handsfree CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Initialize config and model directory
//! - `run`     — Start the voice + gesture listener
//! - `exec`    — Run a single typed command through the agent
//! - `status`  — Show configuration summary
//! - `doctor`  — Check external dependencies and permissions

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "handsfree",
    about = "Handsfree — voice and gesture control for your Mac",
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
    /// Initialize configuration and model directory
    Onboard,

    /// Start listening for voice commands and gestures
    Run,

    /// Run one typed command through the agent and exit
    Exec {
        /// The command, e.g. "open safari and search for rust"
        command: Vec<String>,
    },

    /// Show configuration summary
    Status,

    /// Check external dependencies and permissions
    Doctor,
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
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Run => commands::run::run().await?,
        Commands::Exec { command } => commands::exec::run(command.join(" ")).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
