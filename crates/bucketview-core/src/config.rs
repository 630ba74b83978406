//! Resolved browse configuration.

use std::str::FromStr;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

use crate::error::ConfigError;

/// Default interval between timer-driven refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Ordering applied to folder names at render time.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    VariantNames,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SortAlgorithm {
    /// Keep build insertion order.
    #[default]
    None,
    /// Lexicographic by raw name.
    Plain,
    /// Lexicographic by lower-cased name.
    CaseInsensitive,
    /// Semantic versions first (newest first), then other names.
    Semver,
}

impl SortAlgorithm {
    /// Parse an algorithm name, mapping failures to a configuration error.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        Self::from_str(name).map_err(|_| ConfigError::UnknownSortAlgorithm {
            name: name.to_string(),
        })
    }
}

/// Configuration for the cache, scheduler and listing.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct BrowseConfig {
    /// Interval between timer-driven refreshes.
    #[builder(default = "DEFAULT_REFRESH_INTERVAL")]
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: Duration,

    /// Folder ordering.
    #[builder(default)]
    #[serde(default)]
    pub sort: SortAlgorithm,

    /// Reverse the folder ordering.
    #[builder(default = "false")]
    #[serde(default)]
    pub reverse: bool,

    /// Load per-directory customization documents during refresh.
    #[builder(default = "false")]
    #[serde(default)]
    pub customize: bool,

    /// Verbose build logging.
    #[builder(default = "false")]
    #[serde(default)]
    pub debug: bool,
}

fn default_refresh_interval() -> Duration {
    DEFAULT_REFRESH_INTERVAL
}

impl BrowseConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.reverse == Some(true) && matches!(self.sort, None | Some(SortAlgorithm::None)) {
            return Err(ConfigError::ReverseWithoutSorting.to_string());
        }
        if self.refresh_interval == Some(Duration::ZERO) {
            return Err("Refresh interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl BrowseConfig {
    /// Create a new config builder.
    pub fn builder() -> BrowseConfigBuilder {
        BrowseConfigBuilder::default()
    }

    /// Check a config that was deserialized rather than built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reverse && self.sort == SortAlgorithm::None {
            return Err(ConfigError::ReverseWithoutSorting);
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::Invalid {
                message: "refresh interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            sort: SortAlgorithm::None,
            reverse: false,
            customize: false,
            debug: false,
        }
    }
}
