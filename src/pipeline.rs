//! Record orchestration: fetch → parse → group → split.
//!
//! The orchestrator is the single point of failure containment for one
//! record. Everything that can go wrong inside a record is converted into
//! a [`SplitOutcome::Skipped`] with a reason; nothing propagates.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::SplitConfig;
use crate::data::{RawRecord, SplitResult};
use crate::fetch::{DiffFetcher, FetchError};
use crate::split::{group_by_directory, parse_diff, split_groups};

/// Why a record produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record carried no fields at all.
    EmptyRecord,
    /// The record has no usable diff location.
    MissingDiffUrl,
    /// The remote diff no longer exists.
    DiffGone,
    /// The fetch failed for a transient reason.
    Fetch(String),
    /// Shutdown was requested while the record was in flight.
    Cancelled,
    /// Splitting produced fewer atomic diffs than the configured minimum.
    TooFewAtomicDiffs {
        /// How many atomic diffs the split produced.
        produced: usize,
        /// The configured `min_diffs` threshold.
        required: usize,
    },
}

/// Outcome of one orchestration call.
///
/// A skipped record is a normal, expected event — the run continues.
#[derive(Debug)]
pub enum SplitOutcome {
    /// The record split successfully.
    Split(SplitResult),
    /// The record was deliberately skipped for the given reason.
    Skipped(SkipReason),
}

/// Composes fetching and splitting for one record at a time.
///
/// Holds no per-record state: one instance is shared by all workers, and
/// stages within a single record always run strictly in sequence.
pub struct Splitter {
    fetcher: Arc<DiffFetcher>,
    config: SplitConfig,
}

impl Splitter {
    /// Builds a splitter over a fetcher and configuration.
    pub fn new(fetcher: Arc<DiffFetcher>, config: SplitConfig) -> Self {
        Self { fetcher, config }
    }

    /// Splits one raw record into atomic diffs.
    ///
    /// Infallible by contract: every per-record failure is contained here
    /// and reported as a skip, so one bad record can never abort the
    /// surrounding run.
    pub async fn split_record(&self, record: RawRecord) -> SplitOutcome {
        if record.is_empty() {
            warn!("skipping empty input record");
            return SplitOutcome::Skipped(SkipReason::EmptyRecord);
        }

        let pr = record.display_id();
        let Some(diff_url) = record.diff_url.as_deref().filter(|u| !u.is_empty()) else {
            warn!(pr_id = %pr, "record has no diff_url, skipping");
            return SplitOutcome::Skipped(SkipReason::MissingDiffUrl);
        };

        let diff_text = match self.fetcher.fetch(diff_url).await {
            Ok(text) => text,
            Err(FetchError::NotFound) => {
                info!(pr_id = %pr, "diff vanished (repository deleted or private), skipping");
                return SplitOutcome::Skipped(SkipReason::DiffGone);
            }
            Err(FetchError::Cancelled) => {
                info!(pr_id = %pr, "fetch cancelled by shutdown");
                return SplitOutcome::Skipped(SkipReason::Cancelled);
            }
            Err(err) => {
                error!(pr_id = %pr, url = diff_url, %err, "fetch failed, skipping record");
                return SplitOutcome::Skipped(SkipReason::Fetch(err.to_string()));
            }
        };

        let files = parse_diff(&diff_text);
        debug!(pr_id = %pr, files = files.len(), "parsed diff");

        let groups = group_by_directory(files);
        debug!(pr_id = %pr, groups = groups.len(), "grouped by top-level directory");

        let atomic_diffs = split_groups(&groups, &self.config);

        if atomic_diffs.len() < self.config.min_diffs {
            info!(
                pr_id = %pr,
                produced = atomic_diffs.len(),
                required = self.config.min_diffs,
                "too few atomic diffs, dropping record"
            );
            return SplitOutcome::Skipped(SkipReason::TooFewAtomicDiffs {
                produced: atomic_diffs.len(),
                required: self.config.min_diffs,
            });
        }

        SplitOutcome::Split(SplitResult {
            pr_id: record.pr_id,
            repo: record.repo,
            original_diff: diff_text,
            atomic_diffs,
        })
    }
}
