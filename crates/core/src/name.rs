//! Canonical archive-relative names

use crate::escape;
use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Path relative to the archive root, identical across mirror and increments
///
/// Stored as raw bytes so names with newlines, backslashes or non-UTF-8
/// sequences round-trip exactly. Components are separated by `/` and the
/// name never starts or ends with one.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveName(Vec<u8>);

impl ArchiveName {
    /// Wrap raw bytes. Leading and trailing separators are stripped.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let mut bytes = bytes.into();
        while bytes.last() == Some(&b'/') {
            bytes.pop();
        }
        let leading = bytes.iter().take_while(|&&b| b == b'/').count();
        bytes.drain(..leading);
        Self(bytes)
    }

    /// Build from a relative filesystem path
    pub fn from_path(path: &Path) -> Self {
        Self::from_bytes(path.as_os_str().as_bytes().to_vec())
    }

    /// Decode a metadata-quoted name (`\\`, `\n`)
    pub fn from_quoted(quoted: &[u8]) -> Option<Self> {
        escape::unquote_path(quoted).map(Self::from_bytes)
    }

    /// Raw bytes of the name
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The archive root itself
    pub fn is_root(&self) -> bool {
        self.0.is_empty() || self.0 == b"."
    }

    /// Filesystem path relative to some base
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(OsStr::from_bytes(&self.0))
    }

    /// Absolute path under `base`
    pub fn under(&self, base: &Path) -> PathBuf {
        if self.is_root() {
            base.to_path_buf()
        } else {
            base.join(self.to_path())
        }
    }

    /// Append a child component
    pub fn join(&self, child: &[u8]) -> Self {
        if self.is_root() {
            return Self::from_bytes(child.to_vec());
        }
        let mut bytes = self.0.clone();
        bytes.push(b'/');
        bytes.extend_from_slice(child);
        Self::from_bytes(bytes)
    }

    /// Number of components
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.iter().filter(|&&b| b == b'/').count() + 1
        }
    }

    /// Proper ancestors, nearest first (the root is not included)
    pub fn ancestors(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.0
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, &b)| b == b'/')
            .map(move |(i, _)| &self.0[..i])
    }

    /// Whether `self` lies strictly below `dir`
    pub fn is_descendant_of(&self, dir: &ArchiveName) -> bool {
        if dir.is_root() {
            return !self.is_root();
        }
        self.0.len() > dir.0.len()
            && self.0.starts_with(&dir.0)
            && self.0[dir.0.len()] == b'/'
    }

    /// Metadata-quoted form
    pub fn quoted(&self) -> Vec<u8> {
        escape::quote_path(&self.0)
    }

    /// Octal-escaped form, as written in ACL / extended attribute markers
    pub fn octal_escaped(&self) -> Vec<u8> {
        escape::octal_escape(&self.0)
    }

    /// Lossy UTF-8 view, used for glob matching
    pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", escape::display_quoted(&self.0))
    }
}

impl fmt::Debug for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchiveName({})", self)
    }
}

impl From<&str> for ArchiveName {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes().to_vec())
    }
}

/// Encode names as a NUL-terminated list
pub fn encode_nul_list<'a>(names: impl IntoIterator<Item = &'a ArchiveName>) -> Vec<u8> {
    let mut out = Vec::new();
    for name in names {
        out.extend_from_slice(name.as_bytes());
        out.push(0);
    }
    out
}
