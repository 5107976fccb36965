//! Per-host request pacing and provider quota tracking.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

/// Quota floor below which fetching pauses until the provider reset.
const CRITICAL_REMAINING: u64 = 100;

/// Longest proactive pause taken when quota is critically low.
const MAX_QUOTA_PAUSE: Duration = Duration::from_secs(60);

/// Provider quota ledger fed from rate-limit response headers.
///
/// The defaults match GitHub's authenticated core quota so the limiter
/// stays out of the way until the first real header arrives.
#[derive(Debug, Clone, Copy)]
struct QuotaLedger {
    remaining: u64,
    /// Unix timestamp at which the quota resets.
    reset: u64,
}

impl Default for QuotaLedger {
    fn default() -> Self {
        Self {
            remaining: 5000,
            reset: 0,
        }
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    last_hit: HashMap<String, Instant>,
    quota: QuotaLedger,
}

/// Shared throttle for all outbound fetches.
///
/// Tracks per-host last-request instants and the provider quota ledger
/// behind one mutex. [`RateLimiter::acquire`] must be awaited before every
/// network request; consecutive requests to one host are then never issued
/// closer together than the configured interval.
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    default_interval: Duration,
    host_intervals: HashMap<String, Duration>,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Builds a limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        let host_intervals = config
            .host_overrides
            .iter()
            .map(|(host, seconds)| (host.clone(), Duration::from_secs_f64(*seconds)))
            .collect();
        Self {
            enabled: config.enabled,
            default_interval: Duration::from_secs_f64(config.seconds_between_requests),
            host_intervals,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Waits until a request to `host` may be issued, then claims the slot.
    ///
    /// The pacing delay is computed under the lock and slept outside it,
    /// so a slow host never blocks pacing decisions for other hosts.
    pub async fn acquire(&self, host: &str) {
        if !self.enabled {
            return;
        }

        if let Some(pause) = self.quota_pause().await {
            warn!(
                pause_secs = pause.as_secs(),
                "provider quota critically low, pausing before request"
            );
            tokio::time::sleep(pause).await;
        }

        let interval = self.interval_for(host);
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                match state.last_hit.get(host) {
                    Some(last) if now.duration_since(*last) < interval => {
                        Some(interval - now.duration_since(*last))
                    }
                    _ => {
                        state.last_hit.insert(host.to_string(), now);
                        None
                    }
                }
            };
            match wait {
                None => return,
                Some(delay) => tokio::time::sleep(delay).await,
            }
        }
    }

    /// Feeds `x-ratelimit-remaining` / `x-ratelimit-reset` values into the
    /// ledger. Responses without the headers leave the ledger untouched.
    pub async fn record_response(&self, remaining: Option<u64>, reset: Option<u64>) {
        let Some(remaining) = remaining else {
            return;
        };
        let mut state = self.state.lock().await;
        state.quota.remaining = remaining;
        if let Some(reset) = reset {
            state.quota.reset = reset;
        }
        debug!(remaining, "updated provider quota ledger");
    }

    /// Pacing interval applied to `host`.
    fn interval_for(&self, host: &str) -> Duration {
        self.host_intervals
            .get(host)
            .copied()
            .unwrap_or(self.default_interval)
    }

    /// How long to pause before the next request when quota is critical.
    async fn quota_pause(&self) -> Option<Duration> {
        let quota = self.state.lock().await.quota;
        if quota.remaining >= CRITICAL_REMAINING {
            return None;
        }

        if let Some(reset_at) = chrono::DateTime::from_timestamp(quota.reset as i64, 0) {
            warn!(remaining = quota.remaining, reset_at = %reset_at, "provider quota low");
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let until_reset = Duration::from_secs(quota.reset.saturating_sub(now));
        Some(until_reset.clamp(Duration::from_secs(1), MAX_QUOTA_PAUSE))
    }
}
