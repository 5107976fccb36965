//! Unified-diff parsing into per-file change records.

/// Marker that begins a per-file section in unified diff output.
const FILE_DIFF_MARKER: &str = "diff --git ";

/// One modified file's slice of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path of the file (extracted from the `b/` side of `diff --git a/... b/...`).
    pub path: String,
    /// Raw patch text: the header line plus every hunk for this file.
    pub patch: String,
}

/// Parses a unified diff into an ordered list of per-file changes.
///
/// Total function: malformed input yields a best-effort partial result,
/// never an error. Lines before the first `diff --git` header are ignored,
/// and input with no header lines yields an empty `Vec`.
pub fn parse_diff(diff_text: &str) -> Vec<FileChange> {
    let mut files = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in diff_text.lines() {
        if line.starts_with(FILE_DIFF_MARKER) {
            if let Some((path, lines)) = current.take() {
                files.push(FileChange {
                    path,
                    patch: lines.join("\n"),
                });
            }
            current = Some((extract_path_from_diff_header(line), vec![line]));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some((path, lines)) = current.take() {
        files.push(FileChange {
            path,
            patch: lines.join("\n"),
        });
    }

    files
}

/// Extracts the file path from the `b/` side of a `diff --git` header line.
fn extract_path_from_diff_header(header_line: &str) -> String {
    // Format: "diff --git a/old_path b/new_path"
    // Find the last " b/" to handle paths that may contain spaces.
    if let Some(b_pos) = header_line.rfind(" b/") {
        header_line[b_pos + 3..].to_string()
    } else {
        // Fallback: take whatever follows the marker.
        header_line
            .strip_prefix(FILE_DIFF_MARKER)
            .unwrap_or(header_line)
            .to_string()
    }
}
