//! Quill binary: the events webhook service and the one-time assistant
//! bootstrap.

mod serve;
mod setup;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "quill", about = "Relay Slack threads into assistant conversations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the events webhook service.
    Serve(serve::ServeArgs),
    /// One-time bootstrap: upload reference files and create the assistant.
    Setup(setup::SetupArgs),
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Command::Serve(args) => serve::run(args).await,
        Command::Setup(args) => setup::run(args).await,
    }
}
