//! Line-delimited JSON reading and writing.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use super::{RawRecord, SplitResult};

/// Reads raw records from a line-delimited JSON file.
///
/// Blank lines are skipped. A line that fails to decode is logged and
/// skipped, so one corrupt row cannot abort the run; I/O errors on the
/// file itself still fail.
pub fn read_records(path: &Path) -> Result<Vec<RawRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("Failed to read line from {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawRecord>(&line) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(line = index + 1, %err, "skipping undecodable input line");
            }
        }
    }

    Ok(records)
}

/// Streaming writer emitting one [`SplitResult`] JSON object per line.
pub struct NdjsonWriter {
    inner: BufWriter<File>,
}

impl NdjsonWriter {
    /// Creates (truncating) the output file, creating parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Self {
            inner: BufWriter::new(file),
        })
    }

    /// Appends one result as a JSON line.
    pub fn write(&mut self, result: &SplitResult) -> Result<()> {
        serde_json::to_writer(&mut self.inner, result).context("Failed to serialize result")?;
        self.inner
            .write_all(b"\n")
            .context("Failed to write output line")?;
        Ok(())
    }

    /// Flushes buffered output to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().context("Failed to flush output file")
    }
}
