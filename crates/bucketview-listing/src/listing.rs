//! Sorted, decorated directory listings for renderers.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::Serialize;

use bucketview_core::{Crumb, Customization, CustomizationEntry, Directory};

use crate::sorter::Sorter;

/// Icon used for folders without a customization.
pub const DEFAULT_FOLDER_ICON: &str = "folder";

/// Icon used for files without a customization.
pub const DEFAULT_FILE_ICON: &str = "file";

/// A decorated subfolder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderEntry {
    pub name: CompactString,
    pub url: CompactString,
    pub icon: String,
    pub description: String,
    /// First folder matched by its customization pattern in this listing.
    pub latest: bool,
}

/// A decorated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: CompactString,
    pub url: CompactString,
    pub icon: String,
    pub description: String,
    pub size: u64,
    pub human_size: String,
    pub modified: DateTime<Utc>,
}

/// Everything a renderer needs for one directory.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub path: CompactString,
    pub name: CompactString,
    pub breadcrumbs: Vec<Crumb>,
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
}

impl Listing {
    /// Check if the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Folder names in listing order.
    pub fn folder_names(&self) -> Vec<&str> {
        self.folders.iter().map(|f| f.name.as_str()).collect()
    }

    /// File names in listing order.
    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Decorate a directory using the customization attached to it.
pub fn decorate(dir: &Directory, sorter: &Sorter) -> Listing {
    decorate_with(dir, sorter, dir.customization.as_deref())
}

/// Decorate a directory with an explicit set of rules.
///
/// Folders are ordered by `sorter` before rules are applied, so "latest"
/// means first in listing order. Files are ordered by raw name.
pub fn decorate_with(
    dir: &Directory,
    sorter: &Sorter,
    customization: Option<&Customization>,
) -> Listing {
    let default_folder = customization
        .and_then(Customization::folder_default)
        .cloned()
        .unwrap_or_else(|| CustomizationEntry::new(DEFAULT_FOLDER_ICON, ""));
    let default_file = customization
        .and_then(Customization::file_default)
        .cloned()
        .unwrap_or_else(|| CustomizationEntry::new(DEFAULT_FILE_ICON, ""));

    let mut names = dir.subfolders.clone();
    sorter.sort(&mut names);

    // Rule indices already used as "latest" in this pass.
    let mut seen = vec![false; customization.map_or(0, |c| c.rules.len())];

    let folders: Vec<FolderEntry> = names
        .into_iter()
        .map(|name| {
            let mut entry = FolderEntry {
                url: dir.subfolder_url(&name),
                icon: default_folder.icon.clone(),
                description: default_folder.description.clone(),
                latest: false,
                name,
            };

            if let Some((idx, rule)) = customization.and_then(|c| c.first_match(&entry.name)) {
                let mut applied = &rule.entry;
                if !seen[idx] {
                    seen[idx] = true;
                    entry.latest = true;
                    if let Some(latest) = &rule.latest {
                        applied = latest;
                    }
                }
                entry.icon = applied.icon.clone();
                entry.description = rule.describe(&entry.name, &applied.description);
            }

            entry
        })
        .collect();

    let mut files: Vec<FileEntry> = dir
        .files
        .iter()
        .map(|(name, file)| FileEntry {
            name: name.clone(),
            url: file.url(dir, name),
            icon: default_file.icon.clone(),
            description: default_file.description.clone(),
            size: file.size,
            human_size: file.human_size(),
            modified: file.modified,
        })
        .collect();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    Listing {
        path: dir.path.clone(),
        name: dir.name().into(),
        breadcrumbs: dir.breadcrumbs(),
        folders,
        files,
    }
}
