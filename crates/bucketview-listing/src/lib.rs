//! Ordering and decoration of directory listings.
//!
//! The cache stores folders in the order they were discovered. This crate
//! turns a [`Directory`] into a [`Listing`] ready for an HTML or JSON
//! renderer:
//!
//! - **Sorting** - a [`Sorter`] fixed at startup orders folder names
//!   (`none`, `plain`, `case-insensitive` or `semver`)
//! - **Decoration** - icons and descriptions from the directory's
//!   customization rules, including the per-pattern "latest" entry
//!
//! # Example
//!
//! ```rust
//! use bucketview_listing::{Sorter, decorate};
//! use bucketview_core::{Directory, SortAlgorithm};
//!
//! let mut dir = Directory::new("/releases");
//! dir.subfolders = vec!["1.0".into(), "latest".into(), "v2.0.0".into()];
//!
//! let sorter = Sorter::new(SortAlgorithm::Semver, false).unwrap();
//! let listing = decorate(&dir, &sorter);
//!
//! assert_eq!(listing.folder_names(), vec!["v2.0.0", "1.0", "latest"]);
//! ```
//!
//! # Semantic versions
//!
//! With `semver`, names that parse as versions come first, newest first,
//! and `reverse` flips only that part. When two names have the same
//! precedence the one with the shorter numeric literal comes first, so `1.2`
//! lists before `1.2.0`. Pre-releases follow SemVer precedence and list
//! after their release (`1.12.0-rc1` after `1.12`); this is a known
//! limitation of the ordering.

mod listing;
pub mod semver;
mod sorter;

pub use listing::{
    DEFAULT_FILE_ICON, DEFAULT_FOLDER_ICON, FileEntry, FolderEntry, Listing, decorate,
    decorate_with,
};
pub use sorter::Sorter;

// Re-export core types
pub use bucketview_core::{Directory, SortAlgorithm};
