//! Directory grouping of parsed file changes.

use std::collections::HashMap;

use super::parser::FileChange;

/// File changes sharing one top-level directory.
#[derive(Debug, Clone)]
pub struct DirectoryGroup {
    /// First path segment shared by every member.
    pub key: String,
    /// Member changes in original diff order.
    pub members: Vec<FileChange>,
}

/// Groups file changes by their top-level directory.
///
/// Groups are returned in first-occurrence order. A path with no directory
/// component (single segment) joins no group and therefore drops out of
/// the split entirely.
pub fn group_by_directory(changes: Vec<FileChange>) -> Vec<DirectoryGroup> {
    let mut groups: Vec<DirectoryGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for change in changes {
        let Some((top, rest)) = change.path.split_once('/') else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }

        match index.get(top) {
            Some(&i) => groups[i].members.push(change),
            None => {
                index.insert(top.to_string(), groups.len());
                groups.push(DirectoryGroup {
                    key: top.to_string(),
                    members: vec![change],
                });
            }
        }
    }

    groups
}
