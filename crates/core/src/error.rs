//! Error taxonomy shared by every stage of a prune run

use std::path::PathBuf;

/// Result type for prune operations
pub type Result<T> = std::result::Result<T, PruneError>;

/// Broad class of a failure, which decides how far a run may have progressed
/// and which exit code the binary reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad invocation: rejected before any scan
    Usage,
    /// Archive is in a shape this tool refuses to touch
    Precondition,
    /// A metadata stream did not parse
    Parse,
    /// Confirmed plan changed before commit
    Integrity,
    /// Not enough room for backup copies
    Resource,
    /// Swapping a rewritten metadata file into place failed
    Install,
    /// Deleting a mirror or increment entry failed
    Removal,
    /// Any other I/O failure
    Io,
}

impl ErrorClass {
    /// Process exit code for this class
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorClass::Install => 2,
            ErrorClass::Removal => 3,
            _ => 1,
        }
    }
}

/// Errors raised while pruning an archive
#[derive(Debug, thiserror::Error)]
pub enum PruneError {
    #[error("malformed pattern '{pattern}': {reason}")]
    MalformedPattern { pattern: String, reason: String },

    #[error("options {0} and {1} are mutually exclusive")]
    ConflictingModes(&'static str, &'static str),

    #[error("not a backup archive (missing {}): {}", crate::archive::DATA_DIR_NAME, .0.display())]
    NotAnArchive(PathBuf),

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed stream {} at line {line}: {reason}", .file.display())]
    MalformedStream {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("plan was modified after confirmation (confirmed {expected}, found {actual})")]
    PlanTampered { expected: String, actual: String },

    #[error("insufficient space for backups: need {needed} bytes, {available} available")]
    InsufficientSpace { needed: u64, available: u64 },

    #[error("failed to install {}", .dest.display())]
    InstallFailed {
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {}", .path.display())]
    RemovalFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PruneError {
    /// Wrap an I/O error with a description of what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PruneError::Io {
            context: context.into(),
            source,
        }
    }

    /// Shorthand for a pattern rejection
    pub fn malformed_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        PruneError::MalformedPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            PruneError::MalformedPattern { .. } | PruneError::ConflictingModes(..) => ErrorClass::Usage,
            PruneError::NotAnArchive(_) | PruneError::UnsupportedFormat(_) => ErrorClass::Precondition,
            PruneError::MalformedStream { .. } => ErrorClass::Parse,
            PruneError::PlanTampered { .. } => ErrorClass::Integrity,
            PruneError::InsufficientSpace { .. } => ErrorClass::Resource,
            PruneError::InstallFailed { .. } => ErrorClass::Install,
            PruneError::RemovalFailed { .. } => ErrorClass::Removal,
            PruneError::Io { .. } => ErrorClass::Io,
        }
    }
}
