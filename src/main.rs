use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod capability;
mod cli;
mod config;
mod document;
mod engine;
mod error;
mod graph;
mod output;
mod parser;
mod provider;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing - only show logs with --verbose
    let filter = if cli.verbose {
        EnvFilter::new("polygrade=debug")
    } else {
        EnvFilter::new("polygrade=warn")
    };

    // stdout carries the result
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => cli::run::execute(args).await,
        Commands::Schema(args) => cli::schema::execute(args.result),
    }
}
