//! Path-to-directory tree and statistics.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::BuildWarning;
use crate::node::{Directory, File};
use crate::path;

/// Summary statistics for a built tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Number of directories, including the root.
    pub total_dirs: u64,
    /// Number of files.
    pub total_files: u64,
    /// Total bytes across all files.
    pub total_size: u64,
    /// Number of directory-marker objects seen.
    pub dir_markers: u64,
    /// Number of objects skipped because they could not be enumerated.
    pub skipped: u64,
}

impl TreeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Complete mapping from canonical path to directory.
///
/// A tree is built in full and never mutated once published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    /// Every directory keyed by canonical path.
    pub dirs: HashMap<CompactString, Directory>,

    /// When this tree was built.
    pub built_at: DateTime<Utc>,

    /// How long the build took.
    pub build_duration: Duration,

    /// Summary statistics.
    pub stats: TreeStats,

    /// Warnings encountered during the build.
    pub warnings: Vec<BuildWarning>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::empty()
    }
}

impl Tree {
    /// A tree holding only the empty root directory.
    pub fn empty() -> Self {
        let mut dirs = HashMap::new();
        dirs.insert(CompactString::from(path::ROOT), Directory::root());
        Self {
            dirs,
            built_at: Utc::now(),
            build_duration: Duration::ZERO,
            stats: TreeStats {
                total_dirs: 1,
                ..Default::default()
            },
            warnings: Vec::new(),
        }
    }

    /// The root directory.
    pub fn root(&self) -> Option<&Directory> {
        self.dirs.get(path::ROOT)
    }

    /// Look up a directory; `path` is normalized first.
    pub fn dir(&self, path: &str) -> Option<&Directory> {
        self.dirs.get(path::normalize(path).as_str())
    }

    /// Look up a file by its full path.
    pub fn file(&self, path: &str) -> Option<&File> {
        let (dir, name) = path::split(path);
        if name.is_empty() {
            return None;
        }
        self.dirs.get(dir.as_str())?.file(name)
    }

    /// Number of directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// A tree always holds at least the root.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Check if there were any warnings during the build.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// All directory paths in lexicographic order.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.dirs.keys().map(|k| k.as_str()).collect();
        paths.sort_unstable();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree_has_root() {
        let tree = Tree::empty();
        assert_eq!(tree.len(), 1);
        assert!(tree.root().is_some());
        assert!(tree.dir("").is_some());
        assert!(tree.dir("//").is_some());
        assert_eq!(tree.stats.total_dirs, 1);
    }

    #[test]
    fn test_file_lookup_requires_name() {
        let mut tree = Tree::empty();
        let mut dir = Directory::new("/a");
        dir.files.insert("x".into(), File::new(3, Utc::now()));
        tree.dirs.insert("/a".into(), dir);

        assert_eq!(tree.file("/a/x").map(|f| f.size), Some(3));
        assert!(tree.file("a/x").is_some());
        assert!(tree.file("/a/").is_none());
        assert!(tree.file("/a/y").is_none());
    }
}
