//! A directory on disk presented as a bucket.

use std::fs::{File, Metadata};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use jwalk::{Parallelism, WalkDir};

use bucketview_core::{ByteRange, ObjectBody, ObjectRecord, ObjectSource, SourceError};

/// Serves the files under a root directory as objects.
///
/// Each regular file becomes an object keyed by its `/`-separated path
/// relative to the root. Empty directories become directory markers
/// (`"dir/"`) so they still show up in the tree. Symbolic links are skipped.
#[derive(Debug, Clone)]
pub struct LocalObjectSource {
    root: PathBuf,
    name: String,
    threads: usize,
    include_hidden: bool,
}

impl LocalObjectSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = format!("local:{}", root.display());
        Self {
            root,
            name,
            threads: 0,
            include_hidden: true,
        }
    }

    /// Number of threads used for enumeration (0 = auto-detect).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Whether entries starting with `.` are listed.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Root directory backing the bucket.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_root(&self) -> Result<(), SourceError> {
        match std::fs::metadata(&self.root) {
            Ok(m) if m.is_dir() => Ok(()),
            Ok(_) => Err(SourceError::NotADirectory {
                root: self.root.clone(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(SourceError::RootNotFound {
                root: self.root.clone(),
            }),
            Err(err) => Err(SourceError::ListFailed {
                message: format!("{}: {err}", self.root.display()),
            }),
        }
    }

    /// Map a key to a path under the root, rejecting anything that could
    /// escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, SourceError> {
        let invalid = || SourceError::InvalidKey { key: key.into() };
        if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
            return Err(invalid());
        }

        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(invalid());
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// Object key for a path under the root.
    fn key_for(&self, path: &Path) -> Option<CompactString> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut key = CompactString::default();
        for component in relative.components() {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(component.as_os_str().to_str()?);
        }
        (!key.is_empty()).then_some(key)
    }
}

impl ObjectSource for LocalObjectSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn for_each_object(
        &self,
        visit: &mut dyn FnMut(Result<ObjectRecord, SourceError>),
    ) -> Result<(), SourceError> {
        self.check_root()?;

        let parallelism = match self.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: std::time::Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(&self.root)
            .parallelism(parallelism)
            .skip_hidden(!self.include_hidden)
            .follow_links(false)
            .sort(true)
            .min_depth(1);

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let key = err
                        .path()
                        .and_then(|p| self.key_for(p))
                        .unwrap_or_default();
                    visit(Err(SourceError::invalid_object(key, err.to_string())));
                    continue;
                }
            };

            let path = entry.path();
            let Some(key) = self.key_for(&path) else {
                visit(Err(SourceError::invalid_object(
                    path.to_string_lossy().as_ref(),
                    "path is not valid UTF-8",
                )));
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                tracing::debug!(key = %key, "skipping symlink");
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    visit(Err(SourceError::invalid_object(key, err.to_string())));
                    continue;
                }
            };

            if file_type.is_dir() {
                match is_empty_dir(&path) {
                    Ok(true) => {
                        let mut marker = key;
                        marker.push('/');
                        visit(Ok(ObjectRecord::new(marker, 0, modified(&metadata))));
                    }
                    Ok(false) => {}
                    Err(err) => visit(Err(SourceError::invalid_object(key, err.to_string()))),
                }
            } else if file_type.is_file() {
                visit(Ok(ObjectRecord::new(key, metadata.len(), modified(&metadata))));
            }
        }

        Ok(())
    }

    fn get_object(&self, key: &str, range: Option<&str>) -> Result<ObjectBody, SourceError> {
        let path = self.resolve(key)?;
        let mut file = File::open(&path).map_err(|e| SourceError::io(key, e))?;
        let metadata = file.metadata().map_err(|e| SourceError::io(key, e))?;
        if !metadata.is_file() {
            return Err(SourceError::NotFound { key: key.into() });
        }

        let record = ObjectRecord::new(key, metadata.len(), modified(&metadata));

        match range {
            None => Ok(ObjectBody::full(Box::new(BufReader::new(file)), record)),
            Some(expr) => {
                let resolved = ByteRange::parse(expr)?.resolve(record.size)?;
                file.seek(SeekFrom::Start(resolved.start))
                    .map_err(|e| SourceError::io(key, e))?;
                let reader = BufReader::new(file).take(resolved.len);
                Ok(ObjectBody::ranged(Box::new(reader), record, resolved))
            }
        }
    }
}

fn is_empty_dir(path: &Path) -> std::io::Result<bool> {
    Ok(std::fs::read_dir(path)?.next().is_none())
}

fn modified(metadata: &Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
