//! Diff splitting: parsing, directory grouping and the atomic decision.

pub mod atomic;
pub mod group;
pub mod parser;

pub use atomic::{count_added_lines, split_groups};
pub use group::{group_by_directory, DirectoryGroup};
pub use parser::{parse_diff, FileChange};
