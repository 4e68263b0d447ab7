//! Patchsmith CLI entry point.
//!
//! Commands:
//! - `run`: send one request through the agent pipeline (or ask mode)
//! - `doctor`: diagnose the local setup

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "patchsmith",
    about = "LLM-planned, sandboxed file edits",
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
    /// Run one request through the Plan -> Read -> Write pipeline
    Run {
        /// The natural-language request
        request: String,

        /// Answer directly without the pipeline or file access
        #[arg(long)]
        ask: bool,

        /// Stream the response (ask mode only)
        #[arg(long)]
        stream: bool,

        /// Work directory to confine file operations to
        #[arg(short, long)]
        work_dir: Option<std::path::PathBuf>,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,

        /// Override the Ollama base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Drop the work-directory containment check (denylists stay on)
        #[arg(long)]
        relaxed: bool,
    },

    /// Diagnose the local setup (config, server, model)
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

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
            request,
            ask,
            stream,
            work_dir,
            model,
            base_url,
            relaxed,
        } => {
            commands::run::run(commands::run::RunArgs {
                request,
                ask,
                stream,
                work_dir,
                model,
                base_url,
                relaxed,
            })
            .await?
        }
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
