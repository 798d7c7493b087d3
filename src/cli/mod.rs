pub mod run;
pub mod schema;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "polygrade")]
#[command(
    author,
    version,
    about = "Parallel multi-criteria essay grader for Claude Code, Codex CLI and chat APIs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a document against every enabled criterion
    Run(RunArgs),

    /// Print JSON Schema for config validation
    Schema(SchemaArgs),
}

#[derive(Parser, Clone)]
pub struct SchemaArgs {
    /// Print the schema of the evaluation result instead of the config
    #[arg(long)]
    pub result: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    /// Document to evaluate (.txt, .md or .pdf)
    #[arg(short, long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Inline document text
    #[arg(long)]
    pub text: Option<String>,

    /// Path to config file
    #[arg(short, long, default_value = "polygrade.yaml")]
    pub config: PathBuf,

    /// Result format on stdout
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Override output directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Skip writing report files
    #[arg(long)]
    pub no_report: bool,

    /// Run specific criteria only (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub criteria: Option<Vec<String>>,

    /// Override max parallel criteria
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Exit 1 if the average score is below this threshold (CI mode)
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Show plan without executing
    #[arg(long)]
    pub dry_run: bool,
}
