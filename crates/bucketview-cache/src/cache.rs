//! The published tree and its point lookups.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use bucketview_core::{BrowseConfig, Directory, File, ObjectSource, SourceError, Tree, TreeStats};

use crate::builder::TreeBuilder;

/// Outcome of a successful [`FsCache::refresh`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Generation of the tree that was published.
    pub generation: u64,
    /// Statistics of the new tree.
    pub stats: TreeStats,
    /// Number of warnings recorded during the build.
    pub warnings: usize,
    /// When the new tree finished building.
    pub built_at: DateTime<Utc>,
    /// How long the build took.
    pub duration: Duration,
}

/// In-memory directory tree of a bucket, rebuilt in full on refresh.
///
/// Readers clone the current `Arc<Tree>` under a read lock and never wait
/// on a rebuild. [`refresh`](Self::refresh) builds the next tree without
/// holding any lock and takes the write lock only to swap it in, so a
/// reader sees either the old tree or the new one.
///
/// Refreshes are expected to be serialized by the caller; the
/// [`RefreshScheduler`](crate::RefreshScheduler) does this, and its
/// shutdown waits for a refresh in progress, so no tree is published once
/// [`RefreshHandle::shutdown`](crate::RefreshHandle::shutdown) returns.
pub struct FsCache {
    source: Arc<dyn ObjectSource>,
    builder: TreeBuilder,
    current: RwLock<Arc<Tree>>,
    generation: AtomicU64,
    debug: bool,
}

impl FsCache {
    /// Create a cache holding only the root directory.
    pub fn new(source: Arc<dyn ObjectSource>, config: &BrowseConfig) -> Self {
        Self {
            source,
            builder: TreeBuilder::new().with_customization(config.customize),
            current: RwLock::new(Arc::new(Tree::empty())),
            generation: AtomicU64::new(0),
            debug: config.debug,
        }
    }

    /// The source the cache is built from.
    pub fn source(&self) -> &Arc<dyn ObjectSource> {
        &self.source
    }

    /// The currently published tree.
    pub fn snapshot(&self) -> Arc<Tree> {
        self.current.read().clone()
    }

    /// Look up a directory; `path` is normalized first.
    pub fn get_dir(&self, path: &str) -> Option<Directory> {
        self.snapshot().dir(path).cloned()
    }

    /// Look up a file by its full path.
    pub fn get_file(&self, path: &str) -> Option<File> {
        self.snapshot().file(path).copied()
    }

    /// Number of trees published by successful refreshes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Rebuild the tree from a full listing and publish it.
    ///
    /// On error the previously published tree stays in place.
    pub fn refresh(&self) -> Result<RefreshSummary, SourceError> {
        let tree = match self.builder.build(self.source.as_ref()) {
            Ok(tree) => tree,
            Err(err) => {
                tracing::warn!(source = self.source.name(), error = %err, "refresh failed, keeping previous tree");
                return Err(err);
            }
        };

        if self.debug {
            for warning in &tree.warnings {
                tracing::info!(key = %warning.key, kind = ?warning.kind, "{}", warning.message);
            }
        }

        let summary_stats = tree.stats.clone();
        let warnings = tree.warnings.len();
        let built_at = tree.built_at;
        let duration = tree.build_duration;
        let tree = Arc::new(tree);

        let generation = {
            let mut current = self.current.write();
            *current = tree;
            self.generation.fetch_add(1, Ordering::AcqRel) + 1
        };

        tracing::info!(
            source = self.source.name(),
            generation,
            dirs = summary_stats.total_dirs,
            files = summary_stats.total_files,
            warnings,
            duration_ms = duration.as_millis() as u64,
            "published tree"
        );

        Ok(RefreshSummary {
            generation,
            stats: summary_stats,
            warnings,
            built_at,
            duration,
        })
    }
}

impl std::fmt::Debug for FsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsCache")
            .field("source", &self.source.name())
            .field("builder", &self.builder)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
