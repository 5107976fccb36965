//! Record types exchanged with the ingest and training stages.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod ndjson;

/// Pull-request identifier as it appears in warehouse exports.
///
/// JSON extraction in the warehouse quotes numeric columns, so ids arrive
/// either as integers or as strings. Both are accepted and round-tripped
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrId {
    /// Numeric id.
    Int(i64),
    /// Quoted id, kept verbatim.
    Str(String),
}

impl fmt::Display for PrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrId::Int(n) => write!(f, "{n}"),
            PrId::Str(s) => write!(f, "{s}"),
        }
    }
}

/// One raw pull-request record from the ingest stage.
///
/// All fields are optional at the decode level; the orchestrator decides
/// whether a record is processable (it needs a non-empty `diff_url`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    /// Pull request number.
    #[serde(default)]
    pub pr_id: Option<PrId>,
    /// Repository in `owner/name` form.
    #[serde(default)]
    pub repo: Option<String>,
    /// Location of the diff representation of the change.
    #[serde(default)]
    pub diff_url: Option<String>,
    /// Pull request description, when the ingest captured one.
    #[serde(default)]
    pub body: Option<String>,
}

impl RawRecord {
    /// Whether the record carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.pr_id.is_none() && self.repo.is_none() && self.diff_url.is_none() && self.body.is_none()
    }

    /// Identifier used in log lines; `?` when the record has none.
    pub fn display_id(&self) -> String {
        self.pr_id
            .as_ref()
            .map_or_else(|| "?".to_string(), ToString::to_string)
    }
}

/// A minimal, self-contained subset of a PR's changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicDiff {
    /// Human-readable label: the file path or directory this diff covers.
    pub title: String,
    /// Unified-diff text of the covered changes.
    pub patch: String,
}

/// Output record: one successfully split pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitResult {
    /// Pull request number, carried through from the input record.
    pub pr_id: Option<PrId>,
    /// Repository in `owner/name` form, carried through.
    pub repo: Option<String>,
    /// The full fetched diff, unmodified.
    pub original_diff: String,
    /// The atomic slices of the change, in group order.
    pub atomic_diffs: Vec<AtomicDiff>,
}
