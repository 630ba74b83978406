//! Folder name ordering.

use std::cmp::Ordering;

use bucketview_core::{BrowseConfig, ConfigError, SortAlgorithm};

use crate::semver::Version;

/// Orders names with an algorithm fixed at construction.
///
/// Every algorithm except [`SortAlgorithm::None`] is a total order ending in
/// a comparison of the raw names, so sorting is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sorter {
    algorithm: SortAlgorithm,
    reverse: bool,
}

impl Sorter {
    /// Create a sorter. Reversing [`SortAlgorithm::None`] is rejected.
    pub fn new(algorithm: SortAlgorithm, reverse: bool) -> Result<Self, ConfigError> {
        if reverse && algorithm == SortAlgorithm::None {
            return Err(ConfigError::ReverseWithoutSorting);
        }
        Ok(Self { algorithm, reverse })
    }

    /// Create a sorter from an algorithm name such as `"semver"`.
    pub fn from_name(name: &str, reverse: bool) -> Result<Self, ConfigError> {
        Self::new(SortAlgorithm::parse(name)?, reverse)
    }

    /// Create the sorter described by a config.
    pub fn from_config(config: &BrowseConfig) -> Result<Self, ConfigError> {
        Self::new(config.sort, config.reverse)
    }

    /// The configured algorithm.
    pub fn algorithm(&self) -> SortAlgorithm {
        self.algorithm
    }

    /// Whether the order is reversed.
    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    /// Compare two names.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }

    /// Sort names in place.
    pub fn sort<T: AsRef<str>>(&self, names: &mut [T]) {
        if self.algorithm == SortAlgorithm::None {
            return;
        }
        names.sort_by_cached_key(|name| self.key(name.as_ref()));
    }

    /// Sort an owned list of names.
    pub fn sorted(&self, mut names: Vec<String>) -> Vec<String> {
        self.sort(&mut names);
        names
    }

    fn key(&self, name: &str) -> NameKey {
        NameKey {
            algorithm: self.algorithm,
            reverse: self.reverse,
            lower: match self.algorithm {
                SortAlgorithm::CaseInsensitive | SortAlgorithm::Semver => name.to_lowercase(),
                _ => String::new(),
            },
            version: match self.algorithm {
                SortAlgorithm::Semver => Version::parse(name),
                _ => None,
            },
            raw: name.to_string(),
        }
    }
}

impl Default for Sorter {
    fn default() -> Self {
        Self {
            algorithm: SortAlgorithm::None,
            reverse: false,
        }
    }
}

/// Precomputed comparison key for one name.
#[derive(Debug)]
struct NameKey {
    algorithm: SortAlgorithm,
    reverse: bool,
    lower: String,
    version: Option<Version>,
    raw: String,
}

impl NameKey {
    fn directed(&self, ord: Ordering) -> Ordering {
        if self.reverse { ord.reverse() } else { ord }
    }

    fn case_insensitive(&self, other: &Self) -> Ordering {
        self.lower
            .cmp(&other.lower)
            .then_with(|| self.raw.cmp(&other.raw))
    }

    /// Versions first, newest first; equal versions put the shorter literal
    /// first regardless of direction. Other names follow, case-insensitive
    /// and never reversed.
    fn semver(&self, other: &Self) -> Ordering {
        match (&self.version, &other.version) {
            (Some(a), Some(b)) => self
                .directed(b.precedence(a))
                .then_with(|| a.literal_len.cmp(&b.literal_len))
                .then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.case_insensitive(other),
        }
    }
}

impl Ord for NameKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.algorithm {
            SortAlgorithm::None => Ordering::Equal,
            SortAlgorithm::Plain => self.directed(self.raw.cmp(&other.raw)),
            SortAlgorithm::CaseInsensitive => self.directed(self.case_insensitive(other)),
            SortAlgorithm::Semver => self.semver(other),
        }
    }
}

impl PartialOrd for NameKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NameKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NameKey {}
