//! Object listing to directory tree.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use compact_str::CompactString;

use bucketview_core::{
    BuildWarning, CUSTOMIZATION_FILE, Customization, CustomizationError, Directory, File,
    MAX_CUSTOMIZATION_SIZE, ObjectRecord, ObjectSource, SourceError, Tree, TreeStats, path,
};

const TARGET: &str = "bucketview::build";

/// Builds a complete [`Tree`] from an object listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBuilder {
    customize: bool,
}

impl TreeBuilder {
    /// Create a builder with customization loading disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load per-directory customization documents while building.
    pub fn with_customization(mut self, enabled: bool) -> Self {
        self.customize = enabled;
        self
    }

    /// Whether customization documents are loaded.
    pub fn customizes(&self) -> bool {
        self.customize
    }

    /// Enumerate `source` once and build a fresh tree.
    ///
    /// Fails only if the listing itself fails. Objects the source reports
    /// as unreadable are skipped and recorded as warnings.
    pub fn build(&self, source: &dyn ObjectSource) -> Result<Tree, SourceError> {
        let start = Instant::now();
        let mut assembly = Assembly::new(self.customize);

        source.for_each_object(&mut |object| assembly.visit(object))?;

        if self.customize {
            assembly.load_customizations(source);
        }

        Ok(assembly.finish(start))
    }

    /// Build a tree from records already in hand.
    ///
    /// Customization documents are listed as ordinary files because there
    /// is no source to fetch them from.
    pub fn build_from_records<I>(&self, records: I) -> Tree
    where
        I: IntoIterator<Item = Result<ObjectRecord, SourceError>>,
    {
        let start = Instant::now();
        let mut assembly = Assembly::new(false);
        for record in records {
            assembly.visit(record);
        }
        assembly.finish(start)
    }
}

/// A tree under construction. Never visible to readers.
struct Assembly {
    dirs: HashMap<CompactString, Directory>,
    stats: TreeStats,
    warnings: Vec<BuildWarning>,
    customize: bool,
    /// Directory path and listed record of each customization document seen.
    customizations: Vec<(CompactString, ObjectRecord)>,
}

impl Assembly {
    fn new(customize: bool) -> Self {
        let mut dirs = HashMap::new();
        dirs.insert(CompactString::from(path::ROOT), Directory::root());
        Self {
            dirs,
            stats: TreeStats::new(),
            warnings: Vec::new(),
            customize,
            customizations: Vec::new(),
        }
    }

    fn visit(&mut self, object: Result<ObjectRecord, SourceError>) {
        match object {
            Ok(record) => self.insert(record),
            Err(err) => {
                tracing::warn!(target: TARGET, error = %err, "skipping object");
                self.stats.skipped += 1;
                self.warnings.push(BuildWarning::from_source(&err));
            }
        }
    }

    fn insert(&mut self, record: ObjectRecord) {
        let (dir_path, name) = path::split(&record.key);
        self.ensure_dir(&dir_path);

        if name.is_empty() {
            self.stats.dir_markers += 1;
            return;
        }

        if self.customize && name == CUSTOMIZATION_FILE {
            self.customizations.push((dir_path, record));
            return;
        }

        let Some(dir) = self.dirs.get_mut(dir_path.as_str()) else {
            return;
        };

        let file = File::new(record.size, record.modified);
        match dir.files.insert(name.into(), file) {
            // Same key listed twice: last one wins, position is kept.
            Some(previous) => {
                self.stats.total_size = self.stats.total_size - previous.size + file.size;
            }
            None => {
                self.stats.total_files += 1;
                self.stats.total_size += file.size;
            }
        }
        tracing::debug!(target: TARGET, dir = %dir_path, file = name, size = record.size, "added file");
    }

    /// Create `dir_path` and any missing ancestors, linking each into its
    /// parent's subfolder list exactly once.
    fn ensure_dir(&mut self, dir_path: &str) {
        if self.dirs.contains_key(dir_path) {
            return;
        }

        for (parent, name, child) in path::ancestors(dir_path) {
            if self.dirs.contains_key(child.as_str()) {
                continue;
            }

            let parent_dir = self
                .dirs
                .entry(parent)
                .or_insert_with_key(|p| Directory::new(p.clone()));
            if !parent_dir.has_subfolder(name) {
                parent_dir.subfolders.push(name.into());
            }

            tracing::debug!(target: TARGET, dir = %child, "added directory");
            self.dirs.insert(child.clone(), Directory::new(child));
        }
    }

    fn load_customizations(&mut self, source: &dyn ObjectSource) {
        for (dir_path, record) in std::mem::take(&mut self.customizations) {
            let key = record.key;
            match fetch_customization(source, &key, record.size) {
                Ok(customization) => {
                    if let Some(dir) = self.dirs.get_mut(dir_path.as_str()) {
                        tracing::debug!(target: TARGET, dir = %dir_path, rules = customization.rules.len(), "loaded customization");
                        dir.customization = Some(Arc::new(customization));
                    }
                }
                Err(err) => {
                    tracing::warn!(target: TARGET, key = %key, error = %err, "ignoring customization");
                    self.warnings.push(BuildWarning::customization(key, &err));
                }
            }
        }
    }

    fn finish(self, start: Instant) -> Tree {
        let mut stats = self.stats;
        stats.total_dirs = self.dirs.len() as u64;

        Tree {
            dirs: self.dirs,
            built_at: Utc::now(),
            build_duration: start.elapsed(),
            stats,
            warnings: self.warnings,
        }
    }
}

/// Fetch and parse one customization document.
///
/// The listed size is checked first so an oversized document is never
/// fetched; the fetched size is checked again in case the object grew.
fn fetch_customization(
    source: &dyn ObjectSource,
    key: &str,
    listed_size: u64,
) -> Result<Customization, CustomizationError> {
    let too_large = |size| CustomizationError::TooLarge {
        key: key.into(),
        size,
        limit: MAX_CUSTOMIZATION_SIZE,
    };
    if listed_size > MAX_CUSTOMIZATION_SIZE {
        return Err(too_large(listed_size));
    }

    let fetch_error = |source: SourceError| CustomizationError::Fetch {
        key: key.into(),
        source,
    };

    let body = source.get_object(key, Some("0-")).map_err(fetch_error)?;
    if body.record.size > MAX_CUSTOMIZATION_SIZE {
        return Err(too_large(body.record.size));
    }

    let expected = body.content_length;
    let mut buf = Vec::with_capacity(expected as usize);
    body.reader
        .take(expected)
        .read_to_end(&mut buf)
        .map_err(|e| fetch_error(SourceError::io(key, e)))?;

    if (buf.len() as u64) < expected {
        return Err(CustomizationError::ShortRead {
            key: key.into(),
            read: buf.len() as u64,
            expected,
        });
    }

    Customization::from_json(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, size: u64) -> Result<ObjectRecord, SourceError> {
        Ok(ObjectRecord::new(key, size, Utc::now()))
    }

    #[test]
    fn test_builds_ancestors() {
        let tree = TreeBuilder::new().build_from_records(vec![
            record("a/b/file1.txt", 10),
            record("a/file2.txt", 20),
        ]);

        assert_eq!(tree.paths(), vec!["/", "/a", "/a/b"]);
        assert_eq!(tree.root().unwrap().subfolders, vec!["a"]);
        assert_eq!(tree.dir("/a").unwrap().subfolders, vec!["b"]);
        assert_eq!(tree.stats.total_files, 2);
        assert_eq!(tree.stats.total_size, 30);
        assert_eq!(tree.stats.total_dirs, 3);
    }

    #[test]
    fn test_dir_marker_creates_empty_dir() {
        let tree = TreeBuilder::new().build_from_records(vec![record("d/", 0)]);
        let dir = tree.dir("/d").unwrap();
        assert!(dir.files.is_empty());
        assert!(dir.subfolders.is_empty());
        assert_eq!(tree.stats.dir_markers, 1);
        assert_eq!(tree.stats.total_files, 0);
    }

    #[test]
    fn test_duplicate_key_overwrites() {
        let tree = TreeBuilder::new().build_from_records(vec![
            record("x.txt", 1),
            record("y.txt", 2),
            record("x.txt", 5),
        ]);
        let root = tree.root().unwrap();
        let names: Vec<_> = root.files.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["x.txt", "y.txt"]);
        assert_eq!(root.file("x.txt").unwrap().size, 5);
        assert_eq!(tree.stats.total_files, 2);
        assert_eq!(tree.stats.total_size, 7);
    }

    #[test]
    fn test_per_object_errors_are_skipped() {
        let tree = TreeBuilder::new().build_from_records(vec![
            record("ok.txt", 1),
            Err(SourceError::invalid_object("bad", "unreadable")),
        ]);
        assert_eq!(tree.stats.skipped, 1);
        assert_eq!(tree.warnings.len(), 1);
        assert_eq!(tree.warnings[0].key, "bad");
        assert!(tree.file("/ok.txt").is_some());
    }

    #[test]
    fn test_empty_listing_has_root() {
        let tree = TreeBuilder::new().build_from_records(Vec::new());
        assert_eq!(tree.paths(), vec!["/"]);
    }
}
