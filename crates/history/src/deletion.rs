//! Merging scan results into one canonical deletion set

use crate::scan::ScanReport;
use prune_core::{ArchiveName, DeletionSet, RecursionMode};
use std::collections::BTreeSet;
use tracing::warn;

/// Entries to delete physically, in removal order
///
/// Names are relative to the archive root (mirror) or to the increments
/// directory (increments). Directory lists are deepest first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemovalList {
    pub mirror_files: Vec<ArchiveName>,
    pub mirror_dirs: Vec<ArchiveName>,
    pub increment_files: Vec<ArchiveName>,
    pub increment_dirs: Vec<ArchiveName>,
}

impl RemovalList {
    /// Total number of entries
    pub fn len(&self) -> usize {
        self.mirror_files.len() + self.mirror_dirs.len() + self.increment_files.len() + self.increment_dirs.len()
    }

    /// Whether there is nothing to remove
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of building the deletion set
#[derive(Debug, Default, Clone)]
pub struct BuildOutcome {
    /// Names to excise from every record file
    pub set: DeletionSet,
    /// Physical entries to remove once metadata is installed
    pub removals: RemovalList,
    /// Directory names left alone because the mode is not recursive
    pub skipped_directories: Vec<ArchiveName>,
    /// Names used both as directory and non-directory across history
    pub collisions: Vec<ArchiveName>,
}

/// Turns a [`ScanReport`] into a [`BuildOutcome`]
#[derive(Debug, Clone, Copy)]
pub struct DeletionSetBuilder {
    mode: RecursionMode,
}

impl DeletionSetBuilder {
    /// Create a builder for the given mode
    pub fn new(mode: RecursionMode) -> Self {
        Self { mode }
    }

    /// Build the deletion set and removal list
    pub fn build(&self, report: &ScanReport) -> BuildOutcome {
        if self.mode.is_recursive() {
            self.build_recursive(report)
        } else {
            self.build_flat(report)
        }
    }

    fn build_recursive(&self, report: &ScanReport) -> BuildOutcome {
        let mut set = DeletionSet::new();
        for name in &report.mirror_files {
            set.insert(name.clone());
        }
        for name in report.mirror_dirs.iter().chain(report.increment_dirs.iter()) {
            set.insert_subtree(name.clone());
        }
        for hit in &report.increment_files {
            if hit.record.kind == prune_core::IncrementKind::Dir {
                set.insert_subtree(hit.record.name.clone());
            } else {
                set.insert(hit.record.name.clone());
            }
        }

        BuildOutcome {
            set,
            removals: RemovalList {
                mirror_files: report.mirror_files.clone(),
                mirror_dirs: report.mirror_dirs.clone(),
                increment_files: report
                    .increment_files
                    .iter()
                    .map(|h| h.path.clone())
                    .chain(report.stray_increment_files.iter().cloned())
                    .collect(),
                increment_dirs: report.increment_dirs.clone(),
            },
            skipped_directories: Vec::new(),
            collisions: Vec::new(),
        }
    }

    fn build_flat(&self, report: &ScanReport) -> BuildOutcome {
        let mut dir_evidence: BTreeSet<&ArchiveName> = BTreeSet::new();
        let mut file_evidence: BTreeSet<&ArchiveName> = BTreeSet::new();
        let mut candidates: BTreeSet<&ArchiveName> = BTreeSet::new();

        for name in report.mirror_dirs.iter().chain(report.increment_dirs.iter()) {
            dir_evidence.insert(name);
            candidates.insert(name);
        }
        for name in &report.mirror_files {
            file_evidence.insert(name);
            candidates.insert(name);
        }
        for hit in &report.increment_files {
            let name = &hit.record.name;
            candidates.insert(name);
            if hit.record.kind == prune_core::IncrementKind::Dir {
                dir_evidence.insert(name);
            } else if hit.record.kind.is_non_directory() {
                file_evidence.insert(name);
            }
        }

        let mut outcome = BuildOutcome::default();
        for name in candidates {
            if !dir_evidence.contains(name) {
                outcome.set.insert(name.clone());
            } else if file_evidence.contains(name) {
                warn!("{} was both a directory and a file; use -R or -r to delete it", name);
                outcome.collisions.push(name.clone());
            } else {
                outcome.skipped_directories.push(name.clone());
            }
        }

        outcome.removals.mirror_files = report
            .mirror_files
            .iter()
            .filter(|n| outcome.set.contains(n))
            .cloned()
            .collect();
        outcome.removals.increment_files = report
            .increment_files
            .iter()
            .filter(|h| outcome.set.contains(&h.record.name))
            .map(|h| h.path.clone())
            .collect();
        outcome
    }
}
