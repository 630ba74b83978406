//! Core types and traits for bucketview.
//!
//! This crate provides the data model shared by the rest of the workspace:
//! object records, the directory tree reconstructed from object keys, path
//! normalization, byte ranges, the [`ObjectSource`] capability and the
//! resolved [`BrowseConfig`].

mod config;
mod customization;
mod error;
mod node;
pub mod path;
mod range;
mod source;
mod tree;

pub use config::{BrowseConfig, BrowseConfigBuilder, DEFAULT_REFRESH_INTERVAL, SortAlgorithm};
pub use customization::{
    CUSTOMIZATION_FILE, Customization, CustomizationEntry, CustomizationRule,
    MAX_CUSTOMIZATION_SIZE, RuleTarget,
};
pub use error::{BuildWarning, ConfigError, CustomizationError, SourceError, WarningKind};
pub use node::{Crumb, Directory, File, ObjectRecord};
pub use range::{ByteRange, ResolvedRange};
pub use source::{ObjectBody, ObjectSource};
pub use tree::{Tree, TreeStats};
