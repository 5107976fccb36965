//! Split command — NDJSON records in, atomic-diff NDJSON out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::SplitConfig;
use crate::data::ndjson::{self, NdjsonWriter};
use crate::fetch::{DiffCache, DiffFetcher, RateLimiter};
use crate::pipeline::{SkipReason, SplitOutcome, Splitter};
use crate::utils::{settings, shutdown};

/// Split command options.
#[derive(Parser)]
pub struct SplitCommand {
    /// Input NDJSON file with raw PR records.
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output NDJSON file for atomic diffs.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Configuration file (JSON); built-in defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of records fetched concurrently (overrides the config file).
    #[arg(short, long)]
    pub workers: Option<usize>,
}

impl SplitCommand {
    /// Executes the split command.
    pub async fn execute(self) -> Result<()> {
        let mut config = SplitConfig::load(self.config.as_deref())?;
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.validate().context("Invalid configuration")?;

        let records = ndjson::read_records(&self.input)?;
        info!(
            records = records.len(),
            input = %self.input.display(),
            "loaded input records"
        );

        let mut writer = NdjsonWriter::create(&self.output)?;

        let (trigger, stop) = shutdown::channel();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight records");
                trigger.trigger();
            }
        });

        let fetcher = build_fetcher(&config, stop.clone())?;
        let splitter = Arc::new(Splitter::new(fetcher, config.clone()));

        let progress = ProgressBar::new(records.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        // The gate stops admitting records once shutdown is requested;
        // records already in flight run to completion.
        let gate = stop.clone();
        let jobs = records
            .into_iter()
            .take_while(move |_| !gate.is_triggered())
            .map(|record| {
                let splitter = Arc::clone(&splitter);
                async move { splitter.split_record(record).await }
            });
        let mut outcomes = futures::stream::iter(jobs).buffer_unordered(config.workers);

        let mut emitted = 0usize;
        let mut skipped = 0usize;
        while let Some(outcome) = outcomes.next().await {
            progress.inc(1);
            match outcome {
                SplitOutcome::Split(result) => {
                    writer.write(&result)?;
                    emitted += 1;
                }
                SplitOutcome::Skipped(reason) => {
                    skipped += 1;
                    if reason == SkipReason::Cancelled {
                        progress.set_message("cancelled");
                    }
                }
            }
        }
        progress.finish_and_clear();
        writer.flush()?;

        info!(
            emitted,
            skipped,
            output = %self.output.display(),
            "split run complete"
        );
        println!(
            "Processed {} records: {emitted} emitted, {skipped} skipped",
            emitted + skipped
        );
        if stop.is_triggered() {
            println!("Run was interrupted; output contains only completed records.");
        }

        Ok(())
    }
}

/// Assembles the fetcher from configuration: HTTP client, cache, limiter
/// and the optional bearer credential.
fn build_fetcher(config: &SplitConfig, stop: shutdown::Shutdown) -> Result<Arc<DiffFetcher>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(concat!("pr-atomizer/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let cache = if config.cache.enabled {
        Some(DiffCache::open(&config.cache.dir)?)
    } else {
        None
    };

    let limiter = RateLimiter::new(&config.rate_limit);

    let token = settings::get_env_var("GITHUB_TOKEN").ok();
    if token.is_some() {
        info!("using GITHUB_TOKEN credential for diff fetches");
    } else {
        warn!("no GITHUB_TOKEN configured, fetching anonymously");
    }

    Ok(Arc::new(DiffFetcher::new(client, cache, limiter, token, stop)))
}
