//! Object sources for bucketview.
//!
//! The cache only needs the [`ObjectSource`] capability: enumerate every
//! object once, and fetch an object's bytes by key and optional range. This
//! crate provides two implementations:
//!
//! - [`LocalObjectSource`] - a directory on disk served as a bucket, walked
//!   in parallel with jwalk
//! - [`MemoryObjectSource`] - an in-memory bucket that can be changed while
//!   shared and told to fail, for tests and demos
//!
//! # Example
//!
//! ```rust,no_run
//! use bucketview_source::{LocalObjectSource, ObjectSource};
//!
//! let source = LocalObjectSource::new("/srv/bucket");
//! source
//!     .for_each_object(&mut |object| match object {
//!         Ok(record) => println!("{} ({} bytes)", record.key, record.size),
//!         Err(err) => eprintln!("skipped: {err}"),
//!     })
//!     .unwrap();
//! ```

mod local;
mod memory;

pub use local::LocalObjectSource;
pub use memory::MemoryObjectSource;

// Re-export core types for convenience
pub use bucketview_core::{ByteRange, ObjectBody, ObjectRecord, ObjectSource, SourceError};
