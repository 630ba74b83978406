//! HTTP-style byte-range expressions.

use std::str::FromStr;

use crate::error::SourceError;

/// A single byte range as sent in a `Range` header.
///
/// Both `bytes=0-99` and the bare `0-99` forms are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `START-END`, both inclusive.
    Bounded { start: u64, end: u64 },
    /// `START-`, through the end of the object.
    From { start: u64 },
    /// `-LEN`, the final `LEN` bytes.
    Suffix { len: u64 },
}

/// A range resolved against a concrete object length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    /// First byte offset.
    pub start: u64,
    /// Number of bytes to read.
    pub len: u64,
    /// Total object length.
    pub total: u64,
}

impl ResolvedRange {
    /// Value for a `Content-Range` response header.
    pub fn content_range(&self) -> String {
        if self.len == 0 {
            format!("bytes */{}", self.total)
        } else {
            format!("bytes {}-{}/{}", self.start, self.start + self.len - 1, self.total)
        }
    }
}

impl ByteRange {
    /// Parse a range expression.
    pub fn parse(expr: &str) -> Result<Self, SourceError> {
        let invalid = || SourceError::InvalidRange {
            range: expr.to_string(),
        };

        let spec = expr.trim();
        let spec = spec.strip_prefix("bytes=").unwrap_or(spec).trim();
        if spec.contains(',') {
            return Err(invalid());
        }

        let (start, end) = spec.split_once('-').ok_or_else(invalid)?;
        let parse = |s: &str| s.trim().parse::<u64>().map_err(|_| invalid());

        match (start.trim().is_empty(), end.trim().is_empty()) {
            (true, true) => Err(invalid()),
            (true, false) => Ok(Self::Suffix { len: parse(end)? }),
            (false, true) => Ok(Self::From {
                start: parse(start)?,
            }),
            (false, false) => {
                let start = parse(start)?;
                let end = parse(end)?;
                if end < start {
                    return Err(invalid());
                }
                Ok(Self::Bounded { start, end })
            }
        }
    }

    /// Resolve this range against an object of `total` bytes.
    pub fn resolve(&self, total: u64) -> Result<ResolvedRange, SourceError> {
        let not_satisfiable = || SourceError::RangeNotSatisfiable {
            range: self.to_string(),
            length: total,
        };

        let (start, end_exclusive) = match *self {
            Self::Bounded { start, end } => (start, end.saturating_add(1).min(total)),
            Self::From { start } => (start, total),
            Self::Suffix { len } => (total.saturating_sub(len), total),
        };

        if start >= total {
            // An open range over an empty object is an empty body.
            if total == 0 && !matches!(self, Self::Bounded { .. }) {
                return Ok(ResolvedRange {
                    start: 0,
                    len: 0,
                    total,
                });
            }
            return Err(not_satisfiable());
        }

        Ok(ResolvedRange {
            start,
            len: end_exclusive - start,
            total,
        })
    }
}

impl FromStr for ByteRange {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bounded { start, end } => write!(f, "bytes={start}-{end}"),
            Self::From { start } => write!(f, "bytes={start}-"),
            Self::Suffix { len } => write!(f, "bytes=-{len}"),
        }
    }
}
