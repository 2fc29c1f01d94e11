//! Compilation of user path patterns
//!
//! Patterns are absolute glob strings (`/home/*/cache`). They are validated
//! before any I/O happens and compiled into a [`PathMatcher`] that works on
//! mirror names as well as on increment file names.

use crate::error::{PruneError, Result};
use crate::name::ArchiveName;
use glob::{MatchOptions, Pattern};
use smallvec::SmallVec;

const WILDCARDS: &[char] = &['*', '?', '['];

/// How far a pattern may reach into the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecursionMode {
    /// Literal structure only; directories are never deleted
    #[default]
    None,
    /// Wildcards may span separators; matched directories go with their subtree
    Full,
    /// Wildcards only in the last segment; matched directories go with their subtree
    Limited,
}

impl RecursionMode {
    /// Pick the mode from the `-R` / `-r` flags
    pub fn from_flags(full: bool, limited: bool) -> Result<Self> {
        match (full, limited) {
            (true, true) => Err(PruneError::ConflictingModes("-R", "-r")),
            (true, false) => Ok(RecursionMode::Full),
            (false, true) => Ok(RecursionMode::Limited),
            (false, false) => Ok(RecursionMode::None),
        }
    }

    /// Whether matched directories are deleted with their contents
    pub fn is_recursive(self) -> bool {
        !matches!(self, RecursionMode::None)
    }

    fn match_options(self) -> MatchOptions {
        MatchOptions {
            case_sensitive: true,
            require_literal_separator: !matches!(self, RecursionMode::Full),
            require_literal_leading_dot: false,
        }
    }
}

/// A validated, compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    relative: String,
    glob: Pattern,
}

impl PathPattern {
    /// Validate and compile a single pattern
    pub fn parse(raw: &str, mode: RecursionMode) -> Result<Self> {
        let relative = raw
            .strip_prefix('/')
            .ok_or_else(|| PruneError::malformed_pattern(raw, "must be an absolute path"))?;

        if relative.is_empty() {
            return Err(PruneError::malformed_pattern(raw, "refusing to match the archive root"));
        }

        let segments: SmallVec<[&str; 8]> = relative.split('/').collect();
        for segment in &segments {
            match *segment {
                "" => return Err(PruneError::malformed_pattern(raw, "repeated or trailing separator")),
                "." | ".." => return Err(PruneError::malformed_pattern(raw, "'.' and '..' segments are not allowed")),
                _ => {}
            }
        }

        if mode == RecursionMode::Limited {
            let parents = &segments[..segments.len() - 1];
            if parents.iter().any(|s| s.contains(WILDCARDS)) {
                return Err(PruneError::malformed_pattern(
                    raw,
                    "wildcards are only allowed in the last segment with -r",
                ));
            }
        }

        let glob = Pattern::new(relative)
            .map_err(|e| PruneError::malformed_pattern(raw, e.msg))?;

        Ok(Self {
            raw: raw.to_string(),
            relative: relative.to_string(),
            glob,
        })
    }

    /// Pattern as typed by the user
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Leading parent segments that contain no wildcard
    fn literal_parents(&self) -> SmallVec<[&str; 8]> {
        let segments: SmallVec<[&str; 8]> = self.relative.split('/').collect();
        segments[..segments.len() - 1]
            .iter()
            .take_while(|s| !s.contains(WILDCARDS))
            .copied()
            .collect()
    }
}

/// Set of compiled patterns sharing one recursion mode
#[derive(Debug, Clone)]
pub struct PathMatcher {
    patterns: Vec<PathPattern>,
    mode: RecursionMode,
}

impl PathMatcher {
    /// Validate and compile all patterns; fails on the first bad one
    pub fn compile<S: AsRef<str>>(raw: &[S], mode: RecursionMode) -> Result<Self> {
        if raw.is_empty() {
            return Err(PruneError::malformed_pattern("", "at least one pattern is required"));
        }
        let patterns = raw
            .iter()
            .map(|p| PathPattern::parse(p.as_ref(), mode))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns, mode })
    }

    /// Recursion mode the patterns were compiled for
    pub fn mode(&self) -> RecursionMode {
        self.mode
    }

    /// Compiled patterns
    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    /// Match an exact name (mirror entry or decoded increment name)
    pub fn matches(&self, name: &ArchiveName) -> bool {
        if name.is_root() {
            return false;
        }
        let text = name.to_string_lossy();
        let options = self.mode.match_options();
        self.patterns
            .iter()
            .any(|p| p.glob.matches_with(&text, options))
    }

    /// Longest literal directory prefix shared by every pattern
    ///
    /// Scanning can start here instead of at the archive root. Returns the
    /// root name when the patterns share nothing.
    pub fn scan_prefix(&self) -> ArchiveName {
        let mut common: Option<SmallVec<[&str; 8]>> = None;
        for pattern in &self.patterns {
            let parents = pattern.literal_parents();
            common = Some(match common {
                None => parents,
                Some(prev) => prev
                    .iter()
                    .zip(parents.iter())
                    .take_while(|(a, b)| a == b)
                    .map(|(a, _)| *a)
                    .collect(),
            });
        }
        let joined = common.map(|segs| segs.join("/")).unwrap_or_default();
        ArchiveName::from_bytes(joined.into_bytes())
    }
}
