//! Object, file and directory types.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::customization::Customization;
use crate::path;

/// A single object as enumerated from the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Full `/`-separated key, no leading slash.
    pub key: CompactString,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

impl ObjectRecord {
    /// Create a new object record.
    pub fn new(key: impl Into<CompactString>, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            size,
            modified,
        }
    }

    /// Whether this object only marks a directory (`key` ends with `/`).
    pub fn is_dir_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// A file within a directory. Its name is the key in [`Directory::files`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

impl File {
    /// Create a new file entry.
    pub fn new(size: u64, modified: DateTime<Utc>) -> Self {
        Self { size, modified }
    }

    /// Size as a human-readable IEC string (base 1024).
    pub fn human_size(&self) -> String {
        humansize::format_size(self.size, humansize::BINARY)
    }

    /// Modification time rendered with a `strftime`-style format.
    pub fn human_modified(&self, format: &str) -> String {
        self.modified.format(format).to_string()
    }

    /// Link to this file given its parent directory and name.
    pub fn url(&self, parent: &Directory, name: &str) -> CompactString {
        path::join(&parent.path, name)
    }
}

/// One element of a directory's breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crumb {
    /// Absolute link target.
    pub link: CompactString,
    /// Display name.
    pub name: CompactString,
}

/// A directory reconstructed from object key prefixes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Directory {
    /// Canonical path (see [`crate::path`]).
    pub path: CompactString,

    /// Names of immediate subfolders, in build insertion order.
    pub subfolders: Vec<CompactString>,

    /// Files directly inside this directory, in insertion order.
    pub files: IndexMap<CompactString, File>,

    /// Decoration rules loaded from the directory's customization document.
    #[serde(skip)]
    pub customization: Option<Arc<Customization>>,
}

impl Directory {
    /// Create an empty directory at a canonical path.
    pub fn new(path: impl Into<CompactString>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create the root directory.
    pub fn root() -> Self {
        Self::new(path::ROOT)
    }

    /// Check if this is the root directory.
    pub fn is_root(&self) -> bool {
        self.path == path::ROOT
    }

    /// Final path segment.
    pub fn name(&self) -> &str {
        path::base_name(&self.path)
    }

    /// Look up a file by name.
    pub fn file(&self, name: &str) -> Option<&File> {
        self.files.get(name)
    }

    /// Whether `name` is listed as an immediate subfolder.
    pub fn has_subfolder(&self, name: &str) -> bool {
        self.subfolders.iter().any(|s| s == name)
    }

    /// Link to an immediate subfolder.
    pub fn subfolder_url(&self, name: &str) -> CompactString {
        path::join(&self.path, name)
    }

    /// Breadcrumb trail from `Home` down to this directory.
    pub fn breadcrumbs(&self) -> Vec<Crumb> {
        let mut crumbs = vec![Crumb {
            link: path::ROOT.into(),
            name: "Home".into(),
        }];

        for (_, name, link) in path::ancestors(&self.path) {
            crumbs.push(Crumb {
                link,
                name: name.into(),
            });
        }

        crumbs
    }

    /// Total bytes of the files directly inside this directory.
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|f| f.size).sum()
    }
}
