//! Record file rewriting
//!
//! This crate provides:
//! - Mirror metadata rewriting with hard-link checksum forwarding
//! - ACL and extended attribute block filtering
//! - File statistics line filtering
//!
//! Every rewriter works on one fully decompressed file and shares nothing
//! but read access to the [`DeletionSet`], so files can be processed in
//! parallel.

pub mod acl;
pub mod metadata;
pub mod stats;

// Re-exports
pub use acl::AclRewriter;
pub use metadata::{InodeChecksumTable, MetadataRewriter};
pub use stats::StatsRewriter;

use prune_core::{Compressor, DeletionSet, MetadataFile, MetadataKind, PruneError};

/// Result of rewriting one record file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// At least one record was dropped
    Changed { content: Vec<u8>, removed: usize },
    /// Nothing matched; the file does not need reinstalling
    Unchanged,
}

impl RewriteOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, RewriteOutcome::Changed { .. })
    }
}

/// A record file that did not parse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    /// 1-based line (or record) number
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }

    /// Attach the offending file
    pub fn in_file(self, file: &MetadataFile) -> PruneError {
        PruneError::MalformedStream {
            file: file.path.clone(),
            line: self.line,
            reason: self.reason,
        }
    }
}

/// One grammar's rewriter
pub trait RecordRewriter {
    /// Drop every record whose path is covered by the deletion set
    fn rewrite(&self, input: &[u8]) -> Result<RewriteOutcome, ParseError>;
}

/// Pick the rewriter for a kind of record file
pub fn rewriter_for(kind: MetadataKind, set: &DeletionSet) -> Box<dyn RecordRewriter + '_> {
    match kind {
        MetadataKind::MirrorMetadata => Box::new(MetadataRewriter::new(set)),
        MetadataKind::AccessControlLists | MetadataKind::ExtendedAttributes => Box::new(AclRewriter::new(set)),
        MetadataKind::FileStatistics => Box::new(StatsRewriter::new(set)),
    }
}

/// Rewrite decompressed content of the given kind
pub fn rewrite(kind: MetadataKind, input: &[u8], set: &DeletionSet) -> Result<RewriteOutcome, ParseError> {
    rewriter_for(kind, set).rewrite(input)
}

/// Read, decompress and rewrite one metadata file
pub fn rewrite_file(
    file: &MetadataFile,
    codec: &dyn Compressor,
    set: &DeletionSet,
) -> prune_core::Result<RewriteOutcome> {
    let content = file.read(codec)?;
    let outcome = rewrite(file.kind, &content, set).map_err(|e| e.in_file(file))?;
    if let RewriteOutcome::Changed { removed, .. } = &outcome {
        tracing::debug!("{}: {} records removed", file.file_name(), removed);
    }
    Ok(outcome)
}

/// Split into lines, keeping each line's terminator
pub(crate) fn lines_with_terminator(input: &[u8], sep: u8) -> impl Iterator<Item = &[u8]> {
    input.split_inclusive(move |&b| b == sep)
}

/// Strip one trailing separator
pub(crate) fn trim_terminator(line: &[u8], sep: u8) -> &[u8] {
    line.strip_suffix(&[sep]).unwrap_or(line)
}
