//! Content-addressed disk cache for fetched diffs.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Persistent URL → diff-text store.
///
/// Each entry's filename is the hex-encoded SHA-256 of the fetch URL and
/// its content is the raw diff text. Entries are immutable fetch results
/// and are never evicted; the operator owns the directory and
/// `pr-atomizer cache clear` empties it.
#[derive(Debug, Clone)]
pub struct DiffCache {
    dir: PathBuf,
}

/// Aggregate figures over the cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached diffs.
    pub entries: usize,
    /// Sum of entry sizes in bytes.
    pub total_bytes: u64,
}

impl DiffCache {
    /// Opens a cache rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Returns the cached diff for `url`, if present.
    pub fn lookup(&self, url: &str) -> Option<String> {
        let path = self.entry_path(url);
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!(url, "diff cache hit");
                Some(text)
            }
            Err(_) => None,
        }
    }

    /// Stores the diff for `url`, replacing any existing entry.
    ///
    /// The text is written to a temp file in the cache directory and
    /// renamed into place, so a concurrent reader can never observe
    /// partial content.
    pub fn store(&self, url: &str, text: &str) -> Result<()> {
        let path = self.entry_path(url);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create cache temp file")?;
        tmp.write_all(text.as_bytes())
            .context("Failed to write cache temp file")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to persist cache entry: {}", path.display()))?;
        debug!(url, bytes = text.len(), "stored diff in cache");
        Ok(())
    }

    /// Entry count and total size of the cache.
    pub fn stats(&self) -> Result<CacheStats> {
        let mut entries = 0;
        let mut total_bytes = 0;
        for entry in self.read_entries()? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                entries += 1;
                total_bytes += entry.metadata()?.len();
            }
        }
        Ok(CacheStats {
            entries,
            total_bytes,
        })
    }

    /// Removes every cached diff, returning how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in self.read_entries()? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path()).with_context(|| {
                    format!("Failed to remove cache entry: {}", entry.path().display())
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// The directory this cache stores entries in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_entries(&self) -> Result<fs::ReadDir> {
        fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read cache directory: {}", self.dir.display()))
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(cache_key(url))
    }
}

/// Hex-encoded SHA-256 of the fetch URL.
fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
