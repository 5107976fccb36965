//! The keep-or-explode decision turning directory groups into atomic diffs.

use crate::config::SplitConfig;
use crate::data::AtomicDiff;

use super::group::DirectoryGroup;

/// Counts hunk-body addition lines in a patch.
///
/// A line counts when it starts with `+` but is not a `+++` file marker.
pub fn count_added_lines(patch: &str) -> usize {
    patch
        .lines()
        .filter(|line| line.starts_with('+') && !line.starts_with("+++"))
        .count()
}

/// Applies the per-group splitting decision to every directory group.
///
/// A group explodes into one [`AtomicDiff`] per member when its added-line
/// count exceeds `max_loc`, or when the total group count reaches
/// `max_dirs`. The `max_dirs` comparison uses the pre-computed total, so it
/// resolves identically for every group in the PR. A group that explodes
/// neither loses nor duplicates members; a kept group concatenates its
/// members' patches in original order.
///
/// The minimum-output quality filter is applied by the orchestrator after
/// all groups are processed.
pub fn split_groups(groups: &[DirectoryGroup], config: &SplitConfig) -> Vec<AtomicDiff> {
    let group_count = groups.len();
    let mut atomic_diffs = Vec::new();

    for group in groups {
        let added: usize = group
            .members
            .iter()
            .map(|member| count_added_lines(&member.patch))
            .sum();

        if added > config.max_loc || group_count >= config.max_dirs {
            for member in &group.members {
                atomic_diffs.push(AtomicDiff {
                    title: format!("Update {}", member.path),
                    patch: member.patch.clone(),
                });
            }
        } else {
            let patch = group
                .members
                .iter()
                .map(|member| member.patch.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            atomic_diffs.push(AtomicDiff {
                title: format!("Update {} directory", group.key),
                patch,
            });
        }
    }

    atomic_diffs
}
