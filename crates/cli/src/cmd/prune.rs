//! Prune paths from an archive

use crate::commit::{InstallJob, PlanCommitter, StatvfsProbe};
use crate::config::PruneConfig;
use crate::plan::RewritePlan;
use crate::review::{self, Decision, ReviewRequest, Reviewer};
use crate::session::{Phase, Session};
use crate::util;
use anyhow::{Context, Result};
use history::{Cutoff, DeletionSetBuilder, TreeScanner};
use owo_colors::OwoColorize;
use prune_core::{
    ArchiveLayout, ArchiveName, Compressor, DeletionSet, GzipCompressor, MetadataFile, PathMatcher, RecursionMode,
    TreeWalker,
};
use rayon::prelude::*;
use rewrite::RewriteOutcome;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Options from the command line
#[derive(Debug, Clone, Default)]
pub struct PruneOptions {
    pub archive_root: PathBuf,
    pub patterns: Vec<String>,
    pub mode: RecursionMode,
    pub dry_run: bool,
    pub keep_temp: bool,
    pub keep_backups: bool,
    pub quiet: bool,
}

/// How far a run got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing matched
    NothingToDo,
    /// Stopped after rewriting into the workspace
    DryRun,
    /// The user declined the plan
    Declined,
    /// Metadata installed and entries removed
    Completed,
}

/// What a run did, or would do
#[derive(Debug, Clone)]
pub struct PruneSummary {
    pub outcome: RunOutcome,
    pub names: usize,
    pub cutoff: Option<Cutoff>,
    /// Metadata files that changed (or would change)
    pub rewritten: Vec<String>,
    /// Bytes of rewritten metadata as installed
    pub rewritten_bytes: u64,
    pub unchanged: usize,
    pub skipped_by_cutoff: usize,
    /// Entries physically removed (or to be removed)
    pub removed: usize,
    pub collisions: Vec<ArchiveName>,
    pub skipped_directories: Vec<ArchiveName>,
    /// Workspace left behind with `-D`
    pub kept_workspace: Option<PathBuf>,
}

impl PruneSummary {
    fn new(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            names: 0,
            cutoff: None,
            rewritten: Vec::new(),
            rewritten_bytes: 0,
            unchanged: 0,
            skipped_by_cutoff: 0,
            removed: 0,
            collisions: Vec::new(),
            skipped_directories: Vec::new(),
            kept_workspace: None,
        }
    }
}

/// Result of the rewrite phase
struct Rewritten {
    jobs: Vec<InstallJob>,
    names: Vec<String>,
    bytes: u64,
    unchanged: usize,
    skipped_by_cutoff: usize,
}

/// Run a prune end to end
pub fn run(
    opts: &PruneOptions,
    config: &PruneConfig,
    walker: &dyn TreeWalker,
    reviewer: &mut dyn Reviewer,
) -> Result<PruneSummary> {
    // 1. Validate
    let matcher = PathMatcher::compile(&opts.patterns, opts.mode)?;
    let layout = ArchiveLayout::open(&opts.archive_root)?;
    let mut session = Session::create(opts.keep_temp)?;

    // 2. Scan
    session.enter(Phase::Scan)?;
    let report = TreeScanner::new(&layout, &matcher, walker).scan()?;

    // 3. Plan
    session.enter(Phase::Plan)?;
    let built = DeletionSetBuilder::new(opts.mode).build(&report);
    report_exclusions(&built.collisions, &built.skipped_directories);

    let mut summary = PruneSummary::new(RunOutcome::NothingToDo);
    summary.collisions = built.collisions;
    summary.skipped_directories = built.skipped_directories;

    if built.set.is_empty() {
        info!("Nothing to delete");
        summary.kept_workspace = session.finish();
        return Ok(summary);
    }

    let cutoff = report.history.cutoff_for(&built.set);
    info!("Metadata cutoff: {}", cutoff);
    let plan = RewritePlan::write(&session, built.set)?;
    let removals = built.removals;
    summary.names = plan.set().len();
    summary.removed = removals.len();

    // 4. Rewrite
    session.enter(Phase::Rewrite)?;
    let rewritten = rewrite_metadata(&session, &layout, plan.set(), &cutoff, config, opts)?;
    summary.cutoff = Some(cutoff);
    summary.rewritten = rewritten.names.clone();
    summary.rewritten_bytes = rewritten.bytes;
    summary.unchanged = rewritten.unchanged;
    summary.skipped_by_cutoff = rewritten.skipped_by_cutoff;

    let listing = review::render_listing(&plan, &removals, &rewritten.names, config.review.show_removals);
    let listing_path = review::write_listing(session.path(), &listing)?;

    if opts.dry_run {
        if !opts.quiet {
            review::print_listing(&listing);
        }
        summary.outcome = RunOutcome::DryRun;
        summary.kept_workspace = session.finish();
        return Ok(summary);
    }

    // 5. Review
    session.enter(Phase::Review)?;
    let request = ReviewRequest {
        plan: &plan,
        removals: &removals,
        changed_files: &rewritten.names,
        listing_path: &listing_path,
    };
    if reviewer.review(&request)? == Decision::Decline {
        summary.outcome = RunOutcome::Declined;
        summary.kept_workspace = session.finish();
        return Ok(summary);
    }

    // 6. Verify
    session.enter(Phase::Verify)?;
    let committer =
        PlanCommitter::new(&layout, opts.keep_backups).with_space_margin(config.install.space_margin_bytes);
    let verified = committer.verify(&plan)?;
    committer.check_space(&rewritten.jobs, &StatvfsProbe)?;
    session.cross_point_of_no_return(&verified);

    // 7. Install
    session.enter(Phase::Install)?;
    committer.install(&verified, &rewritten.jobs)?;

    // 8. Remove
    session.enter(Phase::Remove)?;
    summary.removed = committer.remove(&verified, &removals)?;

    // 9. Cleanup
    session.enter(Phase::Cleanup)?;
    summary.outcome = RunOutcome::Completed;
    summary.kept_workspace = session.finish();
    Ok(summary)
}

fn report_exclusions(collisions: &[ArchiveName], skipped: &[ArchiveName]) {
    for name in collisions {
        eprintln!(
            "{} {} was both a directory and a non-directory; not deleted (use -R or -r)",
            "warning:".yellow().bold(),
            name
        );
    }
    for name in skipped {
        eprintln!("{} {} is a directory; skipped (use -R or -r)", "warning:".yellow().bold(), name);
    }
}

/// Rewrite every metadata file at or after the cutoff into the workspace
fn rewrite_metadata(
    session: &Session,
    layout: &ArchiveLayout,
    set: &DeletionSet,
    cutoff: &Cutoff,
    config: &PruneConfig,
    opts: &PruneOptions,
) -> Result<Rewritten> {
    let (files, skipped): (Vec<MetadataFile>, Vec<MetadataFile>) = layout
        .metadata_files()?
        .into_iter()
        .partition(|f| cutoff.includes(&f.timestamp));
    info!("{} metadata files to scan, {} before cutoff", files.len(), skipped.len());

    let codec = GzipCompressor::new(config.install.compression_level);
    let progress = util::rewrite_progress(files.len() as u64, opts.quiet);

    let process = |file: &MetadataFile| -> Result<Option<(InstallJob, String, u64)>> {
        progress.set_message(file.file_name());
        let outcome = rewrite::rewrite_file(file, &codec, set)?;
        progress.inc(1);
        let RewriteOutcome::Changed { content, .. } = outcome else {
            return Ok(None);
        };
        let bytes = if file.compressed {
            codec.compress(&content)?
        } else {
            content
        };
        let temp = session.rewritten_path(file);
        fs::write(&temp, &bytes).with_context(|| format!("Failed to stage {}", temp.display()))?;
        let job = InstallJob {
            temp,
            dest: file.path.clone(),
            keep_backup: opts.keep_backups,
        };
        Ok(Some((job, file.file_name(), bytes.len() as u64)))
    };

    let results: Vec<Option<(InstallJob, String, u64)>> = if config.install.parallel_rewrite {
        files.par_iter().map(process).collect::<Result<_>>()?
    } else {
        files.iter().map(process).collect::<Result<_>>()?
    };
    progress.finish_and_clear();

    let mut rewritten = Rewritten {
        jobs: Vec::new(),
        names: Vec::new(),
        bytes: 0,
        unchanged: 0,
        skipped_by_cutoff: skipped.len(),
    };
    for result in results {
        match result {
            Some((job, name, bytes)) => {
                rewritten.jobs.push(job);
                rewritten.names.push(name);
                rewritten.bytes += bytes;
            }
            None => rewritten.unchanged += 1,
        }
    }
    if rewritten.jobs.is_empty() {
        warn!("No metadata file mentions the names being deleted");
    }
    Ok(rewritten)
}

/// Print the end-of-run summary
pub fn print_summary(summary: &PruneSummary) {
    println!();
    let heading = match summary.outcome {
        RunOutcome::NothingToDo => "Nothing to delete".dimmed().to_string(),
        RunOutcome::DryRun => "Dry run, archive not modified".yellow().bold().to_string(),
        RunOutcome::Declined => "Prune cancelled".yellow().to_string(),
        RunOutcome::Completed => "Prune complete".green().bold().to_string(),
    };
    println!("{}", heading);
    if summary.outcome == RunOutcome::NothingToDo {
        print_exclusion_counts(summary);
        return;
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let removed_label = if summary.outcome == RunOutcome::Completed {
        "Entries removed:"
    } else {
        "Entries to remove:"
    };
    println!("Names deleted:        {}", summary.names.to_string().yellow());
    if let Some(cutoff) = &summary.cutoff {
        println!("Metadata cutoff:      {}", cutoff);
    }
    println!(
        "Metadata rewritten:   {} ({})",
        summary.rewritten.len().to_string().yellow(),
        util::format_size(summary.rewritten_bytes)
    );
    println!("Metadata unchanged:   {}", summary.unchanged);
    println!("Skipped by cutoff:    {}", summary.skipped_by_cutoff);
    println!("{:<22}{}", removed_label, summary.removed.to_string().yellow());
    print_exclusion_counts(summary);

    if let Some(path) = &summary.kept_workspace {
        println!("Workspace kept at:    {}", path.display().dimmed());
    }
}

fn print_exclusion_counts(summary: &PruneSummary) {
    if !summary.collisions.is_empty() {
        println!("Collisions excluded:  {}", summary.collisions.len().to_string().red());
    }
    if !summary.skipped_directories.is_empty() {
        println!("Directories skipped:  {}", summary.skipped_directories.len());
    }
}
