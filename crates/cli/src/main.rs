//! rdiff-prune - remove paths from an rdiff-backup archive

use anyhow::Result;
use clap::{ArgAction, Parser};
use cli_lib::cmd::prune::{self, PruneOptions, RunOutcome};
use cli_lib::config;
use cli_lib::review::{AssumeYes, PromptReviewer, Reviewer};
use owo_colors::OwoColorize;
use prune_core::{FsWalker, PruneError, RecursionMode};
use std::path::PathBuf;
use std::process::ExitCode;

/// rdiff-prune - Delete paths from a backup archive's mirror, history and metadata
#[derive(Parser)]
#[command(name = "rdiff-prune")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Keep the temporary workspace
    #[arg(short = 'D', long)]
    keep_temp: bool,

    /// Keep versioned backups (.~N~) of replaced metadata files
    #[arg(short = 'k', long)]
    keep_backups: bool,

    /// Delete matched directories with everything below them; wildcards may span '/'
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Like -R, but wildcards are only allowed in the last path segment
    #[arg(short = 'r', long)]
    limited: bool,

    /// Show what would be deleted without touching the archive
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Root of the archive (the directory holding rdiff-backup-data)
    archive_root: PathBuf,

    /// Absolute paths or globs inside the archive, e.g. /home/user/*.iso
    #[arg(required = true)]
    patterns: Vec<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    cli_lib::util::init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mode = RecursionMode::from_flags(cli.recursive, cli.limited)?;
    let config = config::load()?;

    let opts = PruneOptions {
        archive_root: cli.archive_root,
        patterns: cli.patterns,
        mode,
        dry_run: cli.dry_run,
        keep_temp: cli.keep_temp,
        keep_backups: cli.keep_backups,
        quiet: cli.quiet,
    };

    let mut reviewer: Box<dyn Reviewer> = if cli.yes {
        Box::new(AssumeYes { quiet: cli.quiet })
    } else {
        Box::new(PromptReviewer::stdin(config.pager()))
    };

    let summary = prune::run(&opts, &config, &FsWalker, reviewer.as_mut())?;
    if !cli.quiet || summary.outcome == RunOutcome::Declined {
        prune::print_summary(&summary);
    }
    Ok(())
}

/// Exit status for a failed run, from the first classified error in the chain
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PruneError>())
        .map(|e| e.class().exit_code() as u8)
        .unwrap_or(1)
}
