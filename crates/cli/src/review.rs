//! Plan review and confirmation

use crate::plan::RewritePlan;
use anyhow::{Context, Result};
use history::RemovalList;
use owo_colors::OwoColorize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

const LISTING_FILE: &str = "plan.txt";

/// Outcome of the review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Decline,
}

/// Everything shown to the user before the point of no return
pub struct ReviewRequest<'a> {
    pub plan: &'a RewritePlan,
    pub removals: &'a RemovalList,
    /// Metadata files that will be replaced
    pub changed_files: &'a [String],
    /// Listing rendered into the session workspace
    pub listing_path: &'a Path,
}

/// Confirms or declines a plan
pub trait Reviewer {
    fn review(&mut self, request: &ReviewRequest<'_>) -> Result<Decision>;
}

/// Plain-text listing of the plan
pub fn render_listing(
    plan: &RewritePlan,
    removals: &RemovalList,
    changed_files: &[String],
    show_removals: bool,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Names to delete ({})\n", plan.set().len()));
    for line in plan.listing() {
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str(&format!("\n# Metadata files to rewrite ({})\n", changed_files.len()));
    for name in changed_files {
        out.push_str(name);
        out.push('\n');
    }

    if show_removals {
        out.push_str(&format!("\n# Entries to remove ({})\n", removals.len()));
        let sections: [(&str, &[prune_core::ArchiveName]); 4] = [
            ("mirror", removals.mirror_files.as_slice()),
            ("mirror dir", removals.mirror_dirs.as_slice()),
            ("increment", removals.increment_files.as_slice()),
            ("increment dir", removals.increment_dirs.as_slice()),
        ];
        for (label, names) in sections {
            for name in names {
                out.push_str(&format!("{}: {}\n", label, name));
            }
        }
    }
    out
}

/// Write the listing next to the plan file
pub fn write_listing(session_dir: &Path, listing: &str) -> Result<PathBuf> {
    let path = session_dir.join(LISTING_FILE);
    fs::write(&path, listing).with_context(|| format!("Failed to write plan listing to {}", path.display()))?;
    Ok(path)
}

/// Print a listing to stdout, headers highlighted
pub fn print_listing(listing: &str) {
    for line in listing.lines() {
        if line.starts_with('#') {
            println!("{}", line.bold());
        } else {
            println!("{}", line);
        }
    }
}

/// Shows the listing (through a pager if one is set) and asks `[y/N]`
pub struct PromptReviewer<R> {
    pager: Option<String>,
    input: R,
}

impl PromptReviewer<io::StdinLock<'static>> {
    /// Prompt on the process's stdin
    pub fn stdin(pager: Option<String>) -> Self {
        Self::new(pager, io::stdin().lock())
    }
}

impl<R: BufRead> PromptReviewer<R> {
    pub fn new(pager: Option<String>, input: R) -> Self {
        Self { pager, input }
    }

    fn show(&self, listing_path: &Path) -> Result<()> {
        if let Some(pager) = &self.pager {
            // The pager gets the listing file as its first argument
            let status = Command::new("sh")
                .arg("-c")
                .arg(format!("{} \"$1\"", pager))
                .arg("rdiff-prune")
                .arg(listing_path)
                .status();
            match status {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => tracing::warn!("Pager '{}' exited with {}", pager, status),
                Err(e) => tracing::warn!("Failed to run pager '{}': {}", pager, e),
            }
        }
        let listing = fs::read_to_string(listing_path)
            .with_context(|| format!("Failed to read plan listing {}", listing_path.display()))?;
        print_listing(&listing);
        Ok(())
    }
}

impl<R: BufRead> Reviewer for PromptReviewer<R> {
    fn review(&mut self, request: &ReviewRequest<'_>) -> Result<Decision> {
        self.show(request.listing_path)?;
        println!();
        print!(
            "Delete {} names from the archive (plan {})? [y/N] ",
            request.plan.set().len(),
            request.plan.hash().short()
        );
        io::stdout().flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        let answer = answer.trim();
        if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
            Ok(Decision::Proceed)
        } else {
            Ok(Decision::Decline)
        }
    }
}

/// Accepts every plan (`--yes`); the listing is still printed unless quiet
pub struct AssumeYes {
    pub quiet: bool,
}

impl Reviewer for AssumeYes {
    fn review(&mut self, request: &ReviewRequest<'_>) -> Result<Decision> {
        if !self.quiet {
            let listing = fs::read_to_string(request.listing_path)
                .with_context(|| format!("Failed to read plan listing {}", request.listing_path.display()))?;
            print_listing(&listing);
        }
        Ok(Decision::Proceed)
    }
}
