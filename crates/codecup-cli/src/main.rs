use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod app;

#[derive(Parser)]
#[command(name = "codecup")]
#[command(about = "CodeCup - analyze, run and search coding tasks")]
#[command(version)]
struct Cli {
    /// Server base URL (overrides config and CODECUP_SERVER_URL)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the outline and diagnostics of a source file
    Analyze {
        file: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Submit a source file for execution and wait for the verdict
    Run {
        file: PathBuf,
        /// Task to test against; remembered for this file for a day
        #[arg(short, long)]
        task: Option<String>,
    },
    /// Search the task catalog
    Search { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = codecup_core::Settings::load();
    if let Some(server) = cli.server {
        settings.server.base_url = server;
    }

    match cli.command {
        Command::Analyze { file, json } => app::analyze_file(&settings, &file, json)?,
        Command::Run { file, task } => app::run_file(&settings, &file, task.as_deref()).await?,
        Command::Search { query } => app::search(&settings, &query).await?,
    }

    Ok(())
}
