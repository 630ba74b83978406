//! Per-directory icon and description rules.
//!
//! A directory may carry a `.s3-customize.json` document:
//!
//! ```json
//! {
//!   "folder": { "icon": "folder", "description": "" },
//!   "^v?(\\d+)\\.(\\d+)": {
//!     "icon": "tag",
//!     "description": "Release $1.$2",
//!     "latest": { "icon": "star", "description": "Latest release $1.$2" }
//!   }
//! }
//! ```
//!
//! Keys `folder` and `file` set the defaults for each kind of entry; every
//! other key is a regular expression matched against folder names.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CustomizationError;

/// Name of the per-directory customization document.
pub const CUSTOMIZATION_FILE: &str = ".s3-customize.json";

/// Largest customization document that will be fetched.
pub const MAX_CUSTOMIZATION_SIZE: u64 = 65536;

/// Icon and description for an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomizationEntry {
    #[serde(default, alias = "Icon")]
    pub icon: String,
    #[serde(default, alias = "Description")]
    pub description: String,
}

impl CustomizationEntry {
    /// Create a new entry.
    pub fn new(icon: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            icon: icon.into(),
            description: description.into(),
        }
    }
}

/// What a rule applies to.
#[derive(Debug, Clone)]
pub enum RuleTarget {
    /// Default for every folder.
    DefaultFolder,
    /// Default for every file.
    DefaultFile,
    /// Folders whose name matches the pattern.
    Pattern(Regex),
}

/// A single customization rule.
#[derive(Debug, Clone)]
pub struct CustomizationRule {
    /// What the rule applies to.
    pub target: RuleTarget,
    /// Entry applied to matches.
    pub entry: CustomizationEntry,
    /// Entry applied to the first match of a pattern in a listing.
    pub latest: Option<CustomizationEntry>,
}

impl CustomizationRule {
    /// Check if this is a pattern rule matching `name`.
    pub fn matches(&self, name: &str) -> bool {
        match &self.target {
            RuleTarget::Pattern(re) => re.is_match(name),
            _ => false,
        }
    }

    /// Expand a description template against the pattern match on `name`.
    ///
    /// Non-pattern rules return the template unchanged.
    pub fn describe(&self, name: &str, template: &str) -> String {
        match &self.target {
            RuleTarget::Pattern(re) => re.replace_all(name, template).into_owned(),
            _ => template.to_string(),
        }
    }
}

/// One rule as written. The entry is either nested under `default` or
/// given as flat `icon`/`description` fields; the nested form wins.
#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default, rename = "default", alias = "Default")]
    nested: Option<CustomizationEntry>,
    #[serde(flatten)]
    entry: CustomizationEntry,
    #[serde(default, alias = "Latest")]
    latest: Option<CustomizationEntry>,
}

/// Ordered set of rules for one directory.
#[derive(Debug, Clone, Default)]
pub struct Customization {
    pub rules: Vec<CustomizationRule>,
}

impl Customization {
    /// Create from a list of rules.
    pub fn new(rules: Vec<CustomizationRule>) -> Self {
        Self { rules }
    }

    /// Parse a customization document.
    ///
    /// Pattern keys that are not valid regular expressions are skipped with
    /// a warning; document order is rule order.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CustomizationError> {
        let parsed: indexmap::IndexMap<String, RawRule> = serde_json::from_slice(bytes)
            .map_err(|source| CustomizationError::Parse { source })?;

        let mut rules = Vec::with_capacity(parsed.len());
        for (key, raw) in parsed {
            let target = match key.as_str() {
                "folder" => RuleTarget::DefaultFolder,
                "file" => RuleTarget::DefaultFile,
                pattern => match Regex::new(pattern) {
                    Ok(re) => RuleTarget::Pattern(re),
                    Err(err) => {
                        tracing::warn!(pattern, error = %err, "skipping invalid customization pattern");
                        continue;
                    }
                },
            };
            rules.push(CustomizationRule {
                target,
                entry: raw.nested.unwrap_or(raw.entry),
                latest: raw.latest,
            });
        }

        Ok(Self { rules })
    }

    /// Check if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Default entry for folders, if overridden.
    pub fn folder_default(&self) -> Option<&CustomizationEntry> {
        self.rules
            .iter()
            .rev()
            .find(|r| matches!(r.target, RuleTarget::DefaultFolder))
            .map(|r| &r.entry)
    }

    /// Default entry for files, if overridden.
    pub fn file_default(&self) -> Option<&CustomizationEntry> {
        self.rules
            .iter()
            .rev()
            .find(|r| matches!(r.target, RuleTarget::DefaultFile))
            .map(|r| &r.entry)
    }

    /// Index and rule of the first pattern rule matching `name`.
    pub fn first_match(&self, name: &str) -> Option<(usize, &CustomizationRule)> {
        self.rules.iter().enumerate().find(|(_, r)| r.matches(name))
    }
}
