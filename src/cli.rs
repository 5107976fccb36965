//! CLI interface for pr-atomizer.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod cache;
pub mod split;

/// pr-atomizer: split merged pull requests into atomic diffs.
#[derive(Parser)]
#[command(name = "pr-atomizer")]
#[command(about = "Splits merged pull requests into atomic diffs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The main command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Main command categories.
#[derive(Subcommand)]
pub enum Commands {
    /// Split an NDJSON dump of pull-request records into atomic diffs.
    Split(split::SplitCommand),
    /// Inspect or empty the diff cache.
    Cache(cache::CacheCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Split(cmd) => cmd.execute().await,
            Commands::Cache(cmd) => cmd.execute(),
        }
    }
}
