//! Fetch-specific error handling.

use thiserror::Error;

/// Errors surfaced by [`crate::fetch::DiffFetcher::fetch`].
///
/// `NotFound` means the record should be skipped quietly; everything else
/// is a transient failure the caller records and moves past. No variant is
/// ever fatal to the surrounding run.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The remote diff no longer exists (repository deleted or made private).
    #[error("diff vanished (repository deleted or made private)")]
    NotFound,

    /// Non-success HTTP status outside the handled 404/429 cases, or a 429
    /// that persisted past the single bounded retry.
    #[error("unexpected HTTP status {status}")]
    Status {
        /// Status code returned by the server.
        status: u16,
    },

    /// Transport-level failure: DNS, connect, timeout, body read.
    #[error("network error: {0}")]
    Network(String),

    /// The fetch URL has no parseable host.
    #[error("invalid fetch URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },

    /// Shutdown was requested while the fetch waited to retry.
    #[error("fetch cancelled by shutdown")]
    Cancelled,
}
