//! Per-invocation workspace and phase tracking
//!
//! A [`Session`] owns the temporary directory holding the plan file, the
//! review listing and every rewritten metadata file. Phases only move
//! forward, and the destructive ones are unreachable until the session has
//! crossed the point of no return with a [`VerifiedPlan`].

use crate::commit::VerifiedPlan;
use anyhow::{Context, Result};
use prune_core::MetadataFile;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

const REWRITTEN_DIR: &str = "rewritten";

/// Named stages of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Validate,
    Scan,
    Plan,
    Rewrite,
    Review,
    Verify,
    Install,
    Remove,
    Cleanup,
}

impl Phase {
    /// Phases that modify the archive
    pub fn is_destructive(self) -> bool {
        matches!(self, Phase::Install | Phase::Remove)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validate => "validate",
            Phase::Scan => "scan",
            Phase::Plan => "plan",
            Phase::Rewrite => "rewrite",
            Phase::Review => "review",
            Phase::Verify => "verify",
            Phase::Install => "install",
            Phase::Remove => "remove",
            Phase::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Illegal phase transitions
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot go back from {from} to {to}")]
    Backwards { from: Phase, to: Phase },

    #[error("{0} requires crossing the point of no return first")]
    NotCommitted(Phase),
}

/// Workspace and state of one run
pub struct Session {
    dir: TempDir,
    phase: Phase,
    committed: bool,
    keep: bool,
}

impl Session {
    /// Create the workspace. With `keep` the directory survives the run.
    pub fn create(keep: bool) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("rdiff-prune-")
            .keep(keep)
            .tempdir()
            .context("Failed to create session workspace")?;
        std::fs::create_dir(dir.path().join(REWRITTEN_DIR)).context("Failed to create session workspace")?;
        tracing::debug!("Session workspace at {}", dir.path().display());
        Ok(Self {
            dir,
            phase: Phase::Validate,
            committed: false,
            keep,
        })
    }

    /// Workspace root
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the rewritten copy of `file` is staged
    pub fn rewritten_path(&self, file: &MetadataFile) -> PathBuf {
        self.dir.path().join(REWRITTEN_DIR).join(file.file_name())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Move to `phase`
    pub fn enter(&mut self, phase: Phase) -> Result<(), SessionError> {
        if phase < self.phase {
            return Err(SessionError::Backwards { from: self.phase, to: phase });
        }
        if phase.is_destructive() && !self.committed {
            return Err(SessionError::NotCommitted(phase));
        }
        info!("Phase: {}", phase);
        self.phase = phase;
        Ok(())
    }

    /// The single irreversible transition. Only a verified plan opens it.
    pub fn cross_point_of_no_return(&mut self, verified: &VerifiedPlan) {
        info!("Crossing point of no return (plan {})", verified.hash().short());
        self.committed = true;
    }

    /// Drop the workspace, or report where it was kept
    pub fn finish(self) -> Option<PathBuf> {
        if self.keep {
            Some(self.dir.path().to_path_buf())
        } else {
            None
        }
    }
}
