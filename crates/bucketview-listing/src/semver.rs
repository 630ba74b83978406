//! Lenient semantic-version parsing for folder names.
//!
//! Accepts `v?MAJOR[.MINOR[.PATCH]][-PRERELEASE][+BUILD]`. Missing
//! components are zero, so `1.2` and `1.2.0` have equal precedence; the
//! length of the numeric literal is kept to tell them apart.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?([0-9]+)(?:\.([0-9]+))?(?:\.([0-9]+))?(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("version pattern is valid")
});

/// One dot-separated pre-release identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreRelease {
    Numeric(u64),
    AlphaNumeric(String),
}

impl PartialOrd for PreRelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PreRelease {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Numeric(_), Self::AlphaNumeric(_)) => Ordering::Less,
            (Self::AlphaNumeric(_), Self::Numeric(_)) => Ordering::Greater,
            (Self::AlphaNumeric(a), Self::AlphaNumeric(b)) => a.cmp(b),
        }
    }
}

/// A parsed, possibly partial, semantic version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<PreRelease>,
    /// Length of the `v?MAJOR[.MINOR[.PATCH]]` prefix as written.
    pub literal_len: usize,
}

impl Version {
    /// Parse a name; `None` if it is not a version.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = VERSION.captures(name)?;
        let number = |i: usize| -> Option<u64> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };

        let literal_len = caps
            .get(3)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(1))
            .map(|m| m.end())?;

        let pre = caps
            .get(4)
            .map(|m| {
                m.as_str()
                    .split('.')
                    .map(|id| match id.parse::<u64>() {
                        Ok(n) if id.bytes().all(|b| b.is_ascii_digit()) => PreRelease::Numeric(n),
                        _ => PreRelease::AlphaNumeric(id.to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre,
            literal_len,
        })
    }

    /// Check if this is a pre-release.
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// SemVer precedence. Build metadata and the literal form are ignored.
    pub fn precedence(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}
