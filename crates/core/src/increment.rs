//! Increment file naming: `<name>.<timestamp>.<type>[.gz]`

use crate::name::ArchiveName;
use crate::timestamp::Timestamp;
use std::fmt;

/// Suffix appended to compressed archive files
pub const GZ_SUFFIX: &[u8] = b".gz";

/// Type of a recorded increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncrementKind {
    /// Full copy of the previous version
    Snapshot,
    /// Reverse delta against the next version
    Diff,
    /// Directory attribute marker
    Dir,
    /// Path did not exist at this time
    Missing,
}

impl IncrementKind {
    /// Parse the type suffix
    pub fn from_suffix(suffix: &[u8]) -> Option<Self> {
        match suffix {
            b"snapshot" => Some(IncrementKind::Snapshot),
            b"diff" => Some(IncrementKind::Diff),
            b"dir" => Some(IncrementKind::Dir),
            b"missing" => Some(IncrementKind::Missing),
            _ => None,
        }
    }

    /// Suffix spelling
    pub fn as_str(self) -> &'static str {
        match self {
            IncrementKind::Snapshot => "snapshot",
            IncrementKind::Diff => "diff",
            IncrementKind::Dir => "dir",
            IncrementKind::Missing => "missing",
        }
    }

    /// Whether the record proves the name was a non-directory at that time
    pub fn is_non_directory(self) -> bool {
        matches!(self, IncrementKind::Snapshot | IncrementKind::Diff)
    }
}

impl fmt::Display for IncrementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded increment file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementRecord {
    /// Name of the path this increment describes
    pub name: ArchiveName,
    /// Session the increment belongs to
    pub timestamp: Timestamp,
    /// Increment type
    pub kind: IncrementKind,
    /// Whether the file carries a `.gz` suffix
    pub compressed: bool,
}

impl IncrementRecord {
    /// Decode a path relative to the increments directory
    ///
    /// Returns `None` when the trailing suffixes are not a valid
    /// timestamp + type (+ optional compression) sequence.
    pub fn decode(rel: &ArchiveName) -> Option<Self> {
        let mut bytes = rel.as_bytes();
        let compressed = bytes.ends_with(GZ_SUFFIX);
        if compressed {
            bytes = &bytes[..bytes.len() - GZ_SUFFIX.len()];
        }

        let kind_dot = bytes.iter().rposition(|&b| b == b'.')?;
        let kind = IncrementKind::from_suffix(&bytes[kind_dot + 1..])?;
        let rest = &bytes[..kind_dot];

        // Timestamps never contain '.', so the previous dot ends the name
        let ts_dot = rest.iter().rposition(|&b| b == b'.')?;
        let ts = std::str::from_utf8(&rest[ts_dot + 1..]).ok()?;
        let timestamp = Timestamp::parse(ts)?;

        let name = &rest[..ts_dot];
        if name.is_empty() || name.ends_with(b"/") {
            return None;
        }

        Some(Self {
            name: ArchiveName::from_bytes(name.to_vec()),
            timestamp,
            kind,
            compressed,
        })
    }

    /// Rebuild the path relative to the increments directory
    pub fn encode(&self) -> ArchiveName {
        let mut bytes = self.name.as_bytes().to_vec();
        bytes.push(b'.');
        bytes.extend_from_slice(self.timestamp.as_str().as_bytes());
        bytes.push(b'.');
        bytes.extend_from_slice(self.kind.as_str().as_bytes());
        if self.compressed {
            bytes.extend_from_slice(GZ_SUFFIX);
        }
        ArchiveName::from_bytes(bytes)
    }
}
