//! Diff retrieval: disk caching, request pacing and HTTP fetching.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod rate_limit;

pub use cache::{CacheStats, DiffCache};
pub use error::FetchError;
pub use fetcher::DiffFetcher;
pub use rate_limit::RateLimiter;
