//! The deletion plan as confirmed by the user
//!
//! The plan file holds the deletion set in its NUL-separated form. Its
//! BLAKE3 hash is taken when the plan is written and checked again right
//! before anything destructive happens.

use crate::session::Session;
use anyhow::{Context, Result};
use prune_core::hash::hash_bytes;
use prune_core::{DeletionSet, PlanHash};
use std::fs;
use std::path::{Path, PathBuf};

const PLAN_FILE: &str = "plan";

/// Finalized deletion set plus the hash it was confirmed under
#[derive(Debug)]
pub struct RewritePlan {
    set: DeletionSet,
    path: PathBuf,
    hash: PlanHash,
}

impl RewritePlan {
    /// Persist `set` into the session workspace and hash it
    pub fn write(session: &Session, set: DeletionSet) -> Result<Self> {
        let path = session.path().join(PLAN_FILE);
        let bytes = set.to_plan_bytes();
        fs::write(&path, &bytes).with_context(|| format!("Failed to write plan to {}", path.display()))?;
        let hash = hash_bytes(&bytes);
        tracing::debug!("Plan {} with {} names", hash.short(), set.len());
        Ok(Self { set, path, hash })
    }

    pub fn set(&self) -> &DeletionSet {
        &self.set
    }

    /// Backing file in the session workspace
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash recorded at confirmation time
    pub fn hash(&self) -> &PlanHash {
        &self.hash
    }

    /// Human-readable names, one per line; subtree roots end in `/`
    pub fn listing(&self) -> Vec<String> {
        let roots: Vec<_> = self.set.subtree_roots().collect();
        self.set
            .iter()
            .map(|name| {
                if roots.contains(&name) {
                    format!("{}/", name)
                } else {
                    name.to_string()
                }
            })
            .collect()
    }
}
