//! The object store capability consumed by the cache.

use std::io::Read;

use crate::error::SourceError;
use crate::node::ObjectRecord;
use crate::range::ResolvedRange;

/// Bytes of an object, as returned by [`ObjectSource::get_object`].
pub struct ObjectBody {
    /// Stream over the requested bytes.
    pub reader: Box<dyn Read + Send>,
    /// Metadata of the whole object.
    pub record: ObjectRecord,
    /// Number of bytes `reader` yields.
    pub content_length: u64,
    /// `Content-Range` header value when a range was requested.
    pub content_range: Option<String>,
    /// MIME type if the source knows it.
    pub content_type: Option<String>,
}

impl ObjectBody {
    /// Create a body over a full object.
    pub fn full(reader: Box<dyn Read + Send>, record: ObjectRecord) -> Self {
        Self {
            reader,
            content_length: record.size,
            record,
            content_range: None,
            content_type: None,
        }
    }

    /// Create a body over a resolved range of an object.
    pub fn ranged(reader: Box<dyn Read + Send>, record: ObjectRecord, range: ResolvedRange) -> Self {
        Self {
            reader,
            record,
            content_length: range.len,
            content_range: Some(range.content_range()),
            content_type: None,
        }
    }

    /// Read the whole body into memory.
    pub fn into_bytes(mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.content_length as usize);
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("record", &self.record)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Enumerates and fetches objects from a bucket.
///
/// Implementations must be shareable across threads: the cache enumerates
/// on a blocking worker while the serving layer fetches objects.
pub trait ObjectSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Visit every object in the bucket exactly once.
    ///
    /// Objects that cannot be enumerated individually are passed to `visit`
    /// as `Err` and enumeration continues. An `Err` return means the bucket
    /// could not be listed.
    fn for_each_object(
        &self,
        visit: &mut dyn FnMut(Result<ObjectRecord, SourceError>),
    ) -> Result<(), SourceError>;

    /// Fetch an object's bytes, optionally restricted to a byte range
    /// (`bytes=0-99`, `0-`, `-10`).
    fn get_object(&self, key: &str, range: Option<&str>) -> Result<ObjectBody, SourceError>;
}
