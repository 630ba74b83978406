//! In-memory bucket.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use parking_lot::RwLock;

use bucketview_core::{ByteRange, ObjectBody, ObjectRecord, ObjectSource, SourceError};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Arc<[u8]>,
    modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<CompactString, StoredObject>,
    broken: Vec<CompactString>,
    listing_failure: Option<String>,
    delay: Duration,
}

/// A bucket held in memory.
///
/// Objects are listed in key order, like an S3 listing. The bucket can be
/// changed while shared, and can be told to fail listing or to report
/// individual objects as unreadable.
#[derive(Debug)]
pub struct MemoryObjectSource {
    name: String,
    state: RwLock<MemoryState>,
    listings: AtomicU64,
    fetches: AtomicU64,
}

impl MemoryObjectSource {
    /// Create an empty bucket.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(MemoryState::default()),
            listings: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Store an object modified now.
    pub fn put(&self, key: impl Into<CompactString>, data: impl Into<Vec<u8>>) {
        self.put_at(key, data, Utc::now());
    }

    /// Store an object with an explicit modification time.
    pub fn put_at(&self, key: impl Into<CompactString>, data: impl Into<Vec<u8>>, modified: DateTime<Utc>) {
        let data: Vec<u8> = data.into();
        let object = StoredObject {
            data: Arc::from(data),
            modified,
        };
        self.state.write().objects.insert(key.into(), object);
    }

    /// Remove an object; returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.state.write().objects.remove(key).is_some()
    }

    /// Report `key` as unreadable on every listing.
    pub fn add_broken(&self, key: impl Into<CompactString>) {
        self.state.write().broken.push(key.into());
    }

    /// Make listing fail with `message`, or succeed again with `None`.
    pub fn set_listing_failure(&self, message: Option<&str>) {
        self.state.write().listing_failure = message.map(str::to_string);
    }

    /// Sleep this long before visiting each object.
    pub fn set_delay(&self, delay: Duration) {
        self.state.write().delay = delay;
    }

    /// Number of objects stored.
    pub fn len(&self) -> usize {
        self.state.read().objects.len()
    }

    /// Check if the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().objects.is_empty()
    }

    /// Number of listings started so far.
    pub fn listing_count(&self) -> u64 {
        self.listings.load(Ordering::Relaxed)
    }

    /// Number of `get_object` calls so far, found or not.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl Default for MemoryObjectSource {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl ObjectSource for MemoryObjectSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn for_each_object(
        &self,
        visit: &mut dyn FnMut(Result<ObjectRecord, SourceError>),
    ) -> Result<(), SourceError> {
        self.listings.fetch_add(1, Ordering::Relaxed);

        // Snapshot so the bucket can change while a slow listing runs.
        let (records, broken, delay) = {
            let state = self.state.read();
            if let Some(message) = &state.listing_failure {
                return Err(SourceError::ListFailed {
                    message: message.clone(),
                });
            }
            let records: Vec<ObjectRecord> = state
                .objects
                .iter()
                .map(|(key, obj)| ObjectRecord::new(key.clone(), obj.data.len() as u64, obj.modified))
                .collect();
            (records, state.broken.clone(), state.delay)
        };

        for key in broken {
            visit(Err(SourceError::invalid_object(key, "object is unreadable")));
        }

        for record in records {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            visit(Ok(record));
        }

        Ok(())
    }

    fn get_object(&self, key: &str, range: Option<&str>) -> Result<ObjectBody, SourceError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let object = self
            .state
            .read()
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound { key: key.into() })?;

        let record = ObjectRecord::new(key, object.data.len() as u64, object.modified);

        match range {
            None => Ok(ObjectBody::full(
                Box::new(Cursor::new(object.data.to_vec())),
                record,
            )),
            Some(expr) => {
                let resolved = ByteRange::parse(expr)?.resolve(record.size)?;
                let start = resolved.start as usize;
                let end = start + resolved.len as usize;
                let slice = object.data[start..end].to_vec();
                Ok(ObjectBody::ranged(Box::new(Cursor::new(slice)), record, resolved))
            }
        }
    }
}
