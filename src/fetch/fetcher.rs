//! Diff retrieval with caching, pacing and bounded retry.

use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::utils::Shutdown;

use super::cache::DiffCache;
use super::error::FetchError;
use super::rate_limit::RateLimiter;

/// Media type requesting the raw diff rendering of a pull request.
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

/// Wait applied to a 429 response carrying no `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Retrieves diff text for pull-request records.
///
/// Lookup order: cache first (bypassing the network and the limiter on a
/// hit), then a paced HTTP request with at most one internal retry on a
/// quota response. All state is owned by the instance; two fetchers in one
/// process are fully independent.
pub struct DiffFetcher {
    client: Client,
    cache: Option<DiffCache>,
    limiter: RateLimiter,
    token: Option<String>,
    shutdown: Shutdown,
}

impl DiffFetcher {
    /// Builds a fetcher from its collaborators.
    pub fn new(
        client: Client,
        cache: Option<DiffCache>,
        limiter: RateLimiter,
        token: Option<String>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            client,
            cache,
            limiter,
            token,
            shutdown,
        }
    }

    /// Fetches the diff text behind `url`.
    ///
    /// The cache is keyed by the URL as it appears in the record, before
    /// any rewriting, so replays hit regardless of endpoint migrations.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(cache) = &self.cache {
            if let Some(text) = cache.lookup(url) {
                return Ok(text);
            }
        }

        let fetch_url = rewrite_github_diff_url(url);
        if fetch_url != url {
            debug!(url, fetch_url = %fetch_url, "rewrote web diff URL to API endpoint");
        }

        let host = Url::parse(&fetch_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .ok_or_else(|| FetchError::InvalidUrl {
                url: fetch_url.clone(),
            })?;

        self.limiter.acquire(&host).await;
        let mut response = self.send(&fetch_url).await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            self.record_quota(&response).await;
            let wait = retry_after(&response).unwrap_or(DEFAULT_RETRY_AFTER);
            warn!(
                host = %host,
                wait_secs = wait.as_secs(),
                "quota response received, retrying once after wait"
            );
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = self.shutdown.triggered() => return Err(FetchError::Cancelled),
            }
            self.limiter.acquire(&host).await;
            response = self.send(&fetch_url).await?;
        }

        self.record_quota(&response).await;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if let Some(cache) = &self.cache {
            // A failed cache write must not fail the fetch.
            if let Err(err) = cache.store(url, &text) {
                warn!(url, %err, "failed to write diff cache entry");
            }
        }

        Ok(text)
    }

    /// Issues one GET for the diff representation.
    async fn send(&self, url: &str) -> Result<Response, FetchError> {
        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, DIFF_MEDIA_TYPE);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }

    /// Forwards rate-limit response headers into the limiter's ledger.
    async fn record_quota(&self, response: &Response) {
        let remaining = header_value(response, "x-ratelimit-remaining");
        let reset = header_value(response, "x-ratelimit-reset");
        self.limiter.record_response(remaining, reset).await;
    }
}

/// Parses a numeric response header, if present.
fn header_value(response: &Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Parses the `Retry-After` header as a delay in seconds.
fn retry_after(response: &Response) -> Option<Duration> {
    header_value(response, "retry-after").map(Duration::from_secs)
}

/// Rewrites `https://github.com/{owner}/{repo}/pull/{n}.diff` to the API
/// endpoint `https://api.github.com/repos/{owner}/{repo}/pulls/{n}`.
///
/// The API endpoint honors bearer credentials and reports quota headers;
/// the web URL serves from a stricter anonymous pool. Any URL that does
/// not match the web diff shape passes through untouched.
pub(crate) fn rewrite_github_diff_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if parsed.host_str() != Some("github.com") {
        return url.to_string();
    }
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(Iterator::collect)
        .unwrap_or_default();

    if let [owner, repo, "pull", last] = segments.as_slice() {
        if let Some(number) = last.strip_suffix(".diff") {
            if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
                return format!("https://api.github.com/repos/{owner}/{repo}/pulls/{number}");
            }
        }
    }
    url.to_string()
}
