//! Configuration loading and validation.
//!
//! Configuration comes from an optional JSON file; every field has a
//! default, and an invalid value is the one error class that aborts a run
//! before any record is processed.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

/// Default added-line threshold above which a directory group explodes.
const DEFAULT_MAX_LOC: usize = 500;

/// Default directory count at which every group explodes.
const DEFAULT_MAX_DIRS: usize = 3;

/// Default minimum number of atomic diffs for a PR to be kept.
const DEFAULT_MIN_DIFFS: usize = 2;

/// Default number of records fetched concurrently.
const DEFAULT_WORKERS: usize = 4;

/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default directory for cached diffs.
const DEFAULT_CACHE_DIR: &str = ".cache/diffs";

/// Default spacing between requests to one host, in seconds.
const DEFAULT_SECONDS_BETWEEN_REQUESTS: f64 = 1.0;

/// Splitting and fetching configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Added-line threshold per directory group.
    pub max_loc: usize,
    /// Group-count threshold forcing per-file explosion.
    pub max_dirs: usize,
    /// Minimum atomic diffs required to keep a PR.
    pub min_diffs: usize,
    /// Records fetched concurrently.
    pub workers: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Diff cache settings.
    pub cache: CacheConfig,
    /// Request pacing settings.
    pub rate_limit: RateLimitConfig,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_loc: DEFAULT_MAX_LOC,
            max_dirs: DEFAULT_MAX_DIRS,
            min_diffs: DEFAULT_MIN_DIFFS,
            workers: DEFAULT_WORKERS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Diff cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether fetched diffs are cached on disk.
    pub enabled: bool,
    /// Directory holding cache entries.
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: DEFAULT_CACHE_DIR.to_string(),
        }
    }
}

/// Request pacing settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether per-host pacing is applied at all.
    pub enabled: bool,
    /// Minimum spacing between requests to one host, in seconds.
    pub seconds_between_requests: f64,
    /// Per-host overrides of the spacing, in seconds.
    pub host_overrides: HashMap<String, f64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // The diff host throttles harder than the API host, hence the
        // larger default spacing there (~37 requests/min).
        let mut host_overrides = HashMap::new();
        host_overrides.insert("api.github.com".to_string(), 1.0);
        host_overrides.insert("patch-diff.githubusercontent.com".to_string(), 1.6);
        Self {
            enabled: true,
            seconds_between_requests: DEFAULT_SECONDS_BETWEEN_REQUESTS,
            host_overrides,
        }
    }
}

impl SplitConfig {
    /// Loads configuration: defaults when `path` is `None`, otherwise the
    /// given JSON file merged over defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::load_from_path(p)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a specific JSON file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Rejects unusable threshold and pacing values.
    ///
    /// This is the only error class that aborts a whole run.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_loc >= 1, "max_loc must be at least 1");
        ensure!(self.max_dirs >= 1, "max_dirs must be at least 1");
        ensure!(self.min_diffs >= 1, "min_diffs must be at least 1");
        ensure!(self.workers >= 1, "workers must be at least 1");
        ensure!(
            self.request_timeout_secs >= 1,
            "request_timeout_secs must be at least 1"
        );
        ensure!(
            self.rate_limit.seconds_between_requests.is_finite()
                && self.rate_limit.seconds_between_requests >= 0.0,
            "rate_limit.seconds_between_requests must be a non-negative number"
        );
        for (host, seconds) in &self.rate_limit.host_overrides {
            ensure!(
                seconds.is_finite() && *seconds >= 0.0,
                "rate_limit.host_overrides[{host}] must be a non-negative number"
            );
        }
        ensure!(
            !self.cache.enabled || !self.cache.dir.trim().is_empty(),
            "cache.dir must not be empty when caching is enabled"
        );
        Ok(())
    }
}
