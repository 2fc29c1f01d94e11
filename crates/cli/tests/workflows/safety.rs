//! Runs that must leave the archive untouched

use crate::common::{ArchiveFixture, T1};
use anyhow::Result;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

fn sample_archive() -> Result<ArchiveFixture> {
    let fx = ArchiveFixture::new()?;
    fx.mirror_file("home/user/big.iso", "iso")?
        .mirror_file("home/user/notes.txt", "notes")?
        .increment("home/user/big.iso", T1, "snapshot", true)?
        .metadata(
            &format!("mirror_metadata.{T1}.snapshot.gz"),
            "File home/user/big.iso\n  Type reg\nFile home/user/notes.txt\n  Type reg\n",
        )?;
    Ok(fx)
}

#[test]
fn test_dry_run_changes_nothing() -> Result<()> {
    let fx = sample_archive()?;
    let before = fx.snapshot()?;

    let result = crate::prune!("-n", fx.arg(), "/home/user/big.iso").assert_success()?;
    assert!(result.contains_stdout("Dry run, archive not modified"));
    assert!(result.contains_stdout("# Names to delete (1)"));
    assert!(result.contains_stdout(&format!("mirror_metadata.{T1}.snapshot.gz")));
    assert!(result.contains_stdout("mirror: home/user/big.iso"));
    assert_eq!(fx.snapshot()?, before);
    Ok(())
}

#[test]
fn test_declined_prompt_changes_nothing() -> Result<()> {
    let fx = sample_archive()?;
    let before = fx.snapshot()?;

    let result = crate::prune!(fx.arg(), "/home/user/big.iso").stdin("n\n").assert_success()?;
    assert!(result.contains_stdout("[y/N]"));
    assert!(result.contains_stdout("Prune cancelled"));
    assert_eq!(fx.snapshot()?, before);

    // End of input is a refusal too
    crate::prune!(fx.arg(), "/home/user/big.iso").assert_success()?;
    assert_eq!(fx.snapshot()?, before);
    Ok(())
}

#[test]
fn test_confirmed_prompt_proceeds() -> Result<()> {
    let fx = sample_archive()?;
    let result = crate::prune!(fx.arg(), "/home/user/big.iso").stdin("yes\n").assert_success()?;
    assert!(result.contains_stdout("Prune complete"));
    assert!(!fx.exists("home/user/big.iso"));
    assert!(fx.exists("home/user/notes.txt"));
    Ok(())
}

#[test]
fn test_plan_changed_during_review_is_refused() -> Result<()> {
    let fx = sample_archive()?;
    let before = fx.snapshot()?;

    // A "pager" that edits the plan sitting next to the listing it is shown
    let tools = tempfile::tempdir()?;
    let pager = tools.path().join("tamper.sh");
    fs::write(&pager, "#!/bin/sh\necho home/user/notes.txt >> \"$(dirname \"$1\")/plan\"\n")?;
    fs::set_permissions(&pager, fs::Permissions::from_mode(0o755))?;

    let result = crate::prune!(fx.arg(), "/home/user/big.iso")
        .env("RDIFF_PRUNE_PAGER", &pager.display().to_string())
        .stdin("y\n")
        .assert_exit(1)?;
    assert!(result.contains_stderr("plan was modified"));
    assert_eq!(fx.snapshot()?, before);
    Ok(())
}

#[test]
fn test_usage_errors_exit_one() -> Result<()> {
    let fx = sample_archive()?;
    let before = fx.snapshot()?;

    let relative = crate::prune!("-y", fx.arg(), "home/user/big.iso").assert_exit(1)?;
    assert!(relative.contains_stderr("must be an absolute path"));

    let both_modes = crate::prune!("-y", "-R", "-r", fx.arg(), "/home").assert_exit(1)?;
    assert!(both_modes.contains_stderr("mutually exclusive"));

    let dotdot = crate::prune!("-y", fx.arg(), "/home/../etc").assert_exit(1)?;
    assert!(dotdot.contains_stderr("malformed pattern"));

    crate::prune!(fx.arg()).assert_exit(1)?;
    crate::prune!("--no-such-flag", fx.arg(), "/x").assert_exit(1)?;

    assert_eq!(fx.snapshot()?, before);
    Ok(())
}

#[test]
fn test_help_and_version_succeed() -> Result<()> {
    let help = crate::prune!("--help").assert_success()?;
    assert!(help.contains_stdout("Usage"));
    assert!(help.contains_stdout("--dry-run"));

    let version = crate::prune!("--version").assert_success()?;
    assert!(version.contains_stdout("rdiff-prune"));
    Ok(())
}

#[test]
fn test_not_an_archive() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().display().to_string();
    let result = crate::prune!("-y", &root, "/a").assert_exit(1)?;
    assert!(result.contains_stderr("not a backup archive"));
    Ok(())
}

#[test]
fn test_long_filename_storage_is_refused() -> Result<()> {
    let fx = sample_archive()?;
    fx.metadata("long_filename_data/1", "a very long name\n")?;
    let before = fx.snapshot()?;

    let result = crate::prune!("-y", fx.arg(), "/home/user/big.iso").assert_exit(1)?;
    assert!(result.contains_stderr("long filename storage"));
    assert_eq!(fx.snapshot()?, before);
    Ok(())
}

#[test]
fn test_mirror_symlink_is_never_followed() -> Result<()> {
    let fx = sample_archive()?;
    let outside = tempfile::tempdir()?;
    fs::write(outside.path().join("victim"), "not part of the archive")?;
    fs::create_dir_all(outside.path().join("nested"))?;
    fs::write(outside.path().join("nested/victim"), "not part of the archive")?;
    fx.mirror_symlink("link", outside.path())?;
    let before = fx.snapshot()?;

    let result = crate::prune!("-y", fx.arg(), "/link/victim").assert_success()?;
    assert!(result.contains_stdout("Nothing to delete"));

    crate::prune!("-y", "-R", fx.arg(), "/link/nested/*").assert_success()?;

    assert!(outside.path().join("victim").exists());
    assert!(outside.path().join("nested/victim").exists());
    assert_eq!(fx.snapshot()?, before);
    Ok(())
}

#[test]
fn test_keep_temp_leaves_workspace() -> Result<()> {
    let fx = sample_archive()?;
    let result = crate::prune!("-n", "-D", fx.arg(), "/home/user/big.iso").assert_success()?;

    let line = result
        .stdout
        .lines()
        .find(|l| l.starts_with("Workspace kept at:"))
        .ok_or_else(|| anyhow::anyhow!("no workspace line in:\n{}", result.stdout))?;
    // The path is dimmed; strip the escape codes around it
    let raw = line.trim_start_matches("Workspace kept at:").trim();
    let path: String = strip_ansi(raw);
    let workspace = PathBuf::from(path);

    assert!(workspace.join("plan").is_file());
    assert!(workspace.join("plan.txt").is_file());
    assert_eq!(fs::read(workspace.join("plan"))?, b"home/user/big.iso\0");
    fs::remove_dir_all(&workspace)?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
