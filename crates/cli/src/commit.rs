//! Committing a confirmed plan to the archive
//!
//! Nothing here runs without a [`VerifiedPlan`], which only
//! [`PlanCommitter::verify`] hands out after re-hashing the plan file.
//!
//! Each rewritten file is installed by staging it next to its destination,
//! copying the original to a versioned backup and renaming the staged copy
//! over the destination. A failed swap restores the original from the
//! backup and stops the run; files installed earlier stay installed.

use crate::plan::RewritePlan;
use history::RemovalList;
use prune_core::archive::{sibling_temp_path, sync_dir, write_synced};
use prune_core::hash::hash_file;
use prune_core::{ArchiveLayout, ArchiveName, PlanHash, PruneError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default headroom on top of the backup sizes
pub const DEFAULT_SPACE_MARGIN: u64 = 10 * 1024 * 1024;

/// Proof that the plan file still hashes to the confirmed value
#[derive(Debug)]
pub struct VerifiedPlan {
    hash: PlanHash,
}

impl VerifiedPlan {
    pub fn hash(&self) -> &PlanHash {
        &self.hash
    }
}

/// A rewritten file waiting to replace its original
#[derive(Debug, Clone)]
pub struct InstallJob {
    /// Final bytes (already recompressed if needed) in the session workspace
    pub temp: PathBuf,
    /// Metadata file to replace
    pub dest: PathBuf,
    /// Leave the `.~N~` backup in place afterwards
    pub keep_backup: bool,
}

/// Free space lookup for a directory
pub trait SpaceProbe {
    fn available(&self, dir: &Path) -> io::Result<u64>;
}

/// `statvfs(3)` on the metadata volume
pub struct StatvfsProbe;

impl SpaceProbe for StatvfsProbe {
    fn available(&self, dir: &Path) -> io::Result<u64> {
        let stat = nix::sys::statvfs::statvfs(dir).map_err(io::Error::from)?;
        Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64)
    }
}

/// Applies a verified plan
pub struct PlanCommitter<'a> {
    layout: &'a ArchiveLayout,
    keep_backups: bool,
    space_margin: u64,
}

impl<'a> PlanCommitter<'a> {
    pub fn new(layout: &'a ArchiveLayout, keep_backups: bool) -> Self {
        Self {
            layout,
            keep_backups,
            space_margin: DEFAULT_SPACE_MARGIN,
        }
    }

    /// Headroom required on top of the backup sizes
    pub fn with_space_margin(mut self, bytes: u64) -> Self {
        self.space_margin = bytes;
        self
    }

    /// Re-hash the plan file and compare with the confirmed hash
    pub fn verify(&self, plan: &RewritePlan) -> Result<VerifiedPlan> {
        let actual = hash_file(plan.path())?;
        if actual != *plan.hash() {
            return Err(PruneError::PlanTampered {
                expected: plan.hash().to_hex(),
                actual: actual.to_hex(),
            });
        }
        debug!("Plan {} verified", actual.short());
        Ok(VerifiedPlan { hash: actual })
    }

    /// Make sure retained backups fit on the metadata volume
    ///
    /// Only relevant when backups are kept; otherwise each backup is
    /// removed right after its swap.
    pub fn check_space(&self, jobs: &[InstallJob], probe: &dyn SpaceProbe) -> Result<()> {
        if !self.keep_backups || jobs.is_empty() {
            return Ok(());
        }
        let mut needed = self.space_margin;
        for job in jobs {
            let meta = fs::metadata(&job.dest)
                .map_err(|e| PruneError::io(format!("failed to stat {}", job.dest.display()), e))?;
            needed += meta.len();
        }
        let data_dir = self.layout.data_dir();
        let available = probe
            .available(data_dir)
            .map_err(|e| PruneError::io(format!("failed to query free space on {}", data_dir.display()), e))?;
        if needed > available {
            return Err(PruneError::InsufficientSpace { needed, available });
        }
        debug!("Backups need {} bytes, {} available", needed, available);
        Ok(())
    }

    /// Install every job in order, stopping at the first failure
    pub fn install(&self, _proof: &VerifiedPlan, jobs: &[InstallJob]) -> Result<usize> {
        for job in jobs {
            install_job_with(job, |from, to| fs::rename(from, to))?;
            info!("Installed {}", job.dest.display());
        }
        Ok(jobs.len())
    }

    /// Delete mirror and increment entries, children before parents
    ///
    /// Entries that are already gone are skipped, so re-running after an
    /// interrupted removal is safe.
    pub fn remove(&self, _proof: &VerifiedPlan, removals: &RemovalList) -> Result<usize> {
        let root = self.layout.root();
        let increments = self.layout.increments_dir();
        let mut removed = 0;
        removed += remove_all(root, &removals.mirror_files, |p| fs::remove_file(p))?;
        removed += remove_all(root, &removals.mirror_dirs, |p| fs::remove_dir(p))?;
        removed += remove_all(increments, &removals.increment_files, |p| fs::remove_file(p))?;
        removed += remove_all(increments, &removals.increment_dirs, |p| fs::remove_dir(p))?;
        Ok(removed)
    }
}

fn remove_all(base: &Path, names: &[ArchiveName], remove: fn(&Path) -> io::Result<()>) -> Result<usize> {
    let mut removed = 0;
    for name in names {
        let path = name.under(base);
        if !parents_are_directories(base, name, &path)? {
            debug!("Already gone: {}", path.display());
            continue;
        }
        match remove(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Already gone: {}", path.display());
            }
            Err(source) => return Err(PruneError::RemovalFailed { path, source }),
        }
    }
    Ok(removed)
}

/// Check that no parent of `name` below `base` is a symlink
///
/// Returns `false` when a parent no longer exists.
fn parents_are_directories(base: &Path, name: &ArchiveName, path: &Path) -> Result<bool> {
    for ancestor in name.ancestors() {
        let dir = ArchiveName::from_bytes(ancestor.to_vec()).under(base);
        match fs::symlink_metadata(&dir) {
            Ok(meta) if meta.file_type().is_dir() => {}
            Ok(_) => {
                return Err(PruneError::RemovalFailed {
                    path: path.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::Other,
                        format!("{} is not a directory inside the archive", dir.display()),
                    ),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(PruneError::RemovalFailed { path: path.to_path_buf(), source }),
        }
    }
    Ok(true)
}

/// First `<dest>.~N~` that does not exist yet
pub fn next_backup_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut n = 1;
    loop {
        let candidate = dest.with_file_name(format!("{}.~{}~", name, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Install one job, using `swap` to move the staged copy into place
pub(crate) fn install_job_with<F>(job: &InstallJob, swap: F) -> Result<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let failed = |source: io::Error| PruneError::InstallFailed {
        dest: job.dest.clone(),
        source,
    };

    let staged = sibling_temp_path(&job.dest);
    let content = fs::read(&job.temp).map_err(failed)?;
    if let Err(e) = write_synced(&staged, &content) {
        let _ = fs::remove_file(&staged);
        return Err(failed(e));
    }

    let backup = next_backup_path(&job.dest);
    if let Err(e) = fs::copy(&job.dest, &backup) {
        let _ = fs::remove_file(&staged);
        let _ = fs::remove_file(&backup);
        return Err(failed(e));
    }

    if let Err(e) = swap(&staged, &job.dest) {
        let _ = fs::remove_file(&staged);
        warn!("Swap failed for {}, restoring original", job.dest.display());
        restore(&backup, &job.dest, job.keep_backup).map_err(failed)?;
        return Err(failed(e));
    }

    if let Some(parent) = job.dest.parent() {
        sync_dir(parent).map_err(failed)?;
    }

    if job.keep_backup {
        info!("Kept backup {}", backup.display());
    } else {
        fs::remove_file(&backup).map_err(failed)?;
    }
    Ok(())
}

fn restore(backup: &Path, dest: &Path, keep_backup: bool) -> io::Result<()> {
    if keep_backup {
        let staged = sibling_temp_path(dest);
        fs::copy(backup, &staged)?;
        fs::rename(&staged, dest)?;
    } else {
        fs::rename(backup, dest)?;
    }
    if let Some(parent) = dest.parent() {
        sync_dir(parent)?;
    }
    Ok(())
}
