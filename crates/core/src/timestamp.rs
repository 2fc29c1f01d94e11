//! Backup session timestamps (`YYYY-MM-DDThh:mm:ss±hh:mm`)

use chrono::{DateTime, FixedOffset};
use std::cmp::Ordering;
use std::fmt;

/// A session timestamp as it appears in archive file names
///
/// Ordering compares the instant, so sessions recorded under different UTC
/// offsets still sort chronologically. The original spelling is kept for
/// rebuilding file names.
#[derive(Clone)]
pub struct Timestamp {
    raw: String,
    at: DateTime<FixedOffset>,
}

impl Timestamp {
    /// Parse a timestamp; returns `None` for anything that is not one
    pub fn parse(raw: &str) -> Option<Self> {
        // Cheap shape check first: increment suffixes are probed a lot
        let bytes = raw.as_bytes();
        if bytes.len() < 20 || bytes[4] != b'-' || bytes[10] != b'T' {
            return None;
        }
        let at = DateTime::parse_from_rfc3339(raw).ok()?;
        Some(Self {
            raw: raw.to_string(),
            at,
        })
    }

    /// Original spelling
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed instant
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.at
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.raw)
    }
}
