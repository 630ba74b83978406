//! Error types for object sources, configuration and customization.

use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by an [`ObjectSource`](crate::ObjectSource).
///
/// Enumeration errors returned from `for_each_object` are fatal for a
/// refresh. Errors handed to the visitor are scoped to a single object.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The bucket could not be listed at all.
    #[error("Listing failed: {message}")]
    ListFailed { message: String },

    /// The root backing the bucket does not exist.
    #[error("Bucket root not found: {root}")]
    RootNotFound { root: PathBuf },

    /// The root backing the bucket is not a directory.
    #[error("Bucket root is not a directory: {root}")]
    NotADirectory { root: PathBuf },

    /// A single object could not be enumerated.
    #[error("Invalid object {key}: {message}")]
    InvalidObject { key: CompactString, message: String },

    /// Object not found.
    #[error("Object not found: {key}")]
    NotFound { key: CompactString },

    /// Permission denied for an object.
    #[error("Permission denied: {key}")]
    PermissionDenied { key: CompactString },

    /// Key cannot address an object.
    #[error("Invalid key: {key}")]
    InvalidKey { key: CompactString },

    /// Malformed byte-range expression.
    #[error("Invalid range: {range}")]
    InvalidRange { range: String },

    /// The range starts beyond the end of the object.
    #[error("Range {range} not satisfiable for object of {length} bytes")]
    RangeNotSatisfiable { range: String, length: u64 },

    /// Generic I/O error.
    #[error("I/O error at {key}: {source}")]
    Io {
        key: CompactString,
        #[source]
        source: std::io::Error,
    },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl SourceError {
    /// Create an I/O error with key context.
    pub fn io(key: impl Into<CompactString>, source: std::io::Error) -> Self {
        let key = key.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { key },
            std::io::ErrorKind::NotFound => Self::NotFound { key },
            _ => Self::Io { key, source },
        }
    }

    /// Create a per-object enumeration error.
    pub fn invalid_object(key: impl Into<CompactString>, message: impl Into<String>) -> Self {
        Self::InvalidObject {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Sort algorithm name is not recognised.
    #[error("Unknown sort algorithm: {name}")]
    UnknownSortAlgorithm { name: String },

    /// `reverse` was requested together with algorithm `none`.
    #[error("Sort algorithm 'none' cannot be reversed")]
    ReverseWithoutSorting,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Problems with a per-directory customization document.
///
/// These never fail a refresh; the directory is left undecorated.
#[derive(Debug, Error)]
pub enum CustomizationError {
    /// Document exceeds the permitted size.
    #[error("Customization {key} is {size} bytes, limit is {limit}")]
    TooLarge {
        key: CompactString,
        size: u64,
        limit: u64,
    },

    /// Document could not be fetched.
    #[error("Could not fetch customization {key}: {source}")]
    Fetch {
        key: CompactString,
        #[source]
        source: SourceError,
    },

    /// Fewer bytes were read than the object advertised.
    #[error("Customization {key}: read {read} bytes, expected {expected}")]
    ShortRead {
        key: CompactString,
        read: u64,
        expected: u64,
    },

    /// Document is not valid JSON.
    #[error("Could not parse customization: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}

/// Kind of build warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// An object could not be enumerated.
    InvalidObject,
    /// A customization document was unusable.
    Customization,
}

/// Non-fatal warning encountered while building a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildWarning {
    /// Key (or best-known key) the warning is about.
    pub key: CompactString,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl BuildWarning {
    /// Create a new build warning.
    pub fn new(key: impl Into<CompactString>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning from a per-object source error.
    pub fn from_source(error: &SourceError) -> Self {
        let key = match error {
            SourceError::InvalidObject { key, .. }
            | SourceError::NotFound { key }
            | SourceError::PermissionDenied { key }
            | SourceError::InvalidKey { key }
            | SourceError::Io { key, .. } => key.clone(),
            _ => CompactString::default(),
        };
        Self {
            key,
            message: error.to_string(),
            kind: WarningKind::InvalidObject,
        }
    }

    /// Create a warning for an unusable customization document.
    pub fn customization(key: impl Into<CompactString>, error: &CustomizationError) -> Self {
        Self::new(key, error.to_string(), WarningKind::Customization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_io() {
        let err = SourceError::io(
            "a/b.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());

        let err = SourceError::io(
            "a/b.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SourceError::PermissionDenied { .. }));
    }

    #[test]
    fn test_warning_from_source() {
        let err = SourceError::invalid_object("broken.bin", "bad metadata");
        let warning = BuildWarning::from_source(&err);
        assert_eq!(warning.kind, WarningKind::InvalidObject);
        assert_eq!(warning.key.as_str(), "broken.bin");
        assert!(warning.message.contains("bad metadata"));
    }
}
