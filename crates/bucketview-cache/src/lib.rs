//! Refreshable directory-tree cache over an object store.
//!
//! Object stores have no directories, only keys like `a/b/file.txt`. This
//! crate reconstructs the directory tree from a full listing and keeps it
//! fresh:
//!
//! - [`TreeBuilder`] turns one listing into a complete [`Tree`]
//! - [`FsCache`] publishes trees and serves `get_dir`/`get_file` lookups
//!   without ever blocking on a rebuild
//! - [`RefreshScheduler`] rebuilds on a timer and on request, one refresh
//!   at a time
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bucketview_cache::FsCache;
//! use bucketview_core::BrowseConfig;
//! use bucketview_source::MemoryObjectSource;
//!
//! let source = Arc::new(MemoryObjectSource::default());
//! source.put("a/b/file1.txt", "hello");
//!
//! let cache = FsCache::new(source, &BrowseConfig::default());
//! cache.refresh().unwrap();
//!
//! let dir = cache.get_dir("/a").unwrap();
//! assert_eq!(dir.subfolders, vec!["b"]);
//! assert_eq!(cache.get_file("/a/b/file1.txt").unwrap().size, 5);
//! ```

mod builder;
mod cache;
mod refresh;

pub use builder::TreeBuilder;
pub use cache::{FsCache, RefreshSummary};
pub use refresh::{
    REFRESH_CHANNEL_SIZE, RefreshEvent, RefreshHandle, RefreshScheduler, RefreshTrigger,
};

// Re-export core types for convenience
pub use bucketview_core::{Directory, File, Tree, TreeStats};
