//! Cache maintenance commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::SplitConfig;
use crate::fetch::DiffCache;
use crate::utils::format_bytes;

/// Cache operations.
#[derive(Parser)]
pub struct CacheCommand {
    /// Cache subcommand to execute.
    #[command(subcommand)]
    pub command: CacheSubcommands,
}

/// Cache subcommands.
#[derive(Subcommand)]
pub enum CacheSubcommands {
    /// Prints entry count and total size of the diff cache.
    Stats(StatsCommand),
    /// Deletes every cached diff.
    Clear(ClearCommand),
}

/// Stats command options.
#[derive(Parser)]
pub struct StatsCommand {
    /// Configuration file (JSON); built-in defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Clear command options.
#[derive(Parser)]
pub struct ClearCommand {
    /// Configuration file (JSON); built-in defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl CacheCommand {
    /// Executes the cache command.
    pub fn execute(self) -> Result<()> {
        match self.command {
            CacheSubcommands::Stats(cmd) => cmd.execute(),
            CacheSubcommands::Clear(cmd) => cmd.execute(),
        }
    }
}

impl StatsCommand {
    /// Executes the stats command.
    pub fn execute(self) -> Result<()> {
        let config = SplitConfig::load(self.config.as_deref())?;
        let cache = DiffCache::open(&config.cache.dir)?;
        let stats = cache.stats()?;
        println!(
            "{} cached diffs, {} ({})",
            stats.entries,
            format_bytes(stats.total_bytes),
            cache.dir().display()
        );
        Ok(())
    }
}

impl ClearCommand {
    /// Executes the clear command.
    pub fn execute(self) -> Result<()> {
        let config = SplitConfig::load(self.config.as_deref())?;
        let cache = DiffCache::open(&config.cache.dir)?;
        let removed = cache.clear()?;
        println!("Removed {removed} cached diffs");
        Ok(())
    }
}
