//! Full prune runs against small archives

use crate::common::{ArchiveFixture, T1, T2, T3};
use anyhow::Result;

fn mirror_meta(names: &[&str]) -> String {
    let mut out = String::from("File .\n  Type dir\n");
    for name in names {
        if name.ends_with('/') {
            out.push_str(&format!("File {}\n  Type dir\n", name.trim_end_matches('/')));
        } else {
            out.push_str(&format!("File {}\n  Type reg\n  Size 3\n", name));
        }
    }
    out
}

/// `a/b` changed between T1 and T2; `a/keep` stays
fn sample_archive() -> Result<ArchiveFixture> {
    let fx = ArchiveFixture::new()?;
    fx.mirror_file("a/b", "new")?
        .mirror_file("a/keep", "kept")?
        .increment("a/b", T1, "snapshot", true)?
        .increment("a/b", T2, "diff", true)?
        .increment("a/keep", T1, "snapshot", true)?
        .metadata(
            &format!("mirror_metadata.{T1}.snapshot.gz"),
            &mirror_meta(&["a/", "a/b", "a/keep"]),
        )?
        .metadata(&format!("mirror_metadata.{T2}.diff.gz"), &mirror_meta(&["a/b"]))?
        .metadata(
            &format!("access_control_lists.{T2}"),
            "# file: a/b\nuser::rw-\ngroup::r--\n\n# file: a/keep\nuser::rw-\n\n",
        )?
        .metadata(
            &format!("extended_attributes.{T2}.gz"),
            "# file: a/b\nuser.origin=\"scan\"\n\n# file: a/keep\nuser.origin=\"mail\"\n\n",
        )?
        .metadata(
            &format!("file_statistics.{T2}.data.gz"),
            "# Filename Changed SourceSize MirrorSize IncrementSize\n. 0 4096 4096 NA\na 0 4096 4096 NA\na/b 1 3 3 12\na/keep 0 4 4 NA\n",
        )?
        .metadata(&format!("current_mirror.{T2}.data"), "PID 1234\n")?;
    Ok(fx)
}

#[test]
fn test_prune_single_file() -> Result<()> {
    let fx = sample_archive()?;

    let result = crate::prune!("-y", fx.arg(), "/a/b").assert_success()?;
    assert!(result.contains_stdout("Prune complete"));
    assert!(result.contains_stdout("# Names to delete (1)"));

    // Mirror and history
    assert!(!fx.exists("a/b"));
    assert!(fx.exists("a/keep"));
    assert!(!fx.exists(&format!("rdiff-backup-data/increments/a/b.{T1}.snapshot.gz")));
    assert!(!fx.exists(&format!("rdiff-backup-data/increments/a/b.{T2}.diff.gz")));
    assert!(fx.exists(&format!("rdiff-backup-data/increments/a/keep.{T1}.snapshot.gz")));

    // Metadata
    let snapshot = fx.read_metadata(&format!("mirror_metadata.{T1}.snapshot.gz"))?;
    assert_eq!(snapshot, mirror_meta(&["a/", "a/keep"]));
    let diff = fx.read_metadata(&format!("mirror_metadata.{T2}.diff.gz"))?;
    assert_eq!(diff, mirror_meta(&[]));

    let acl = fx.read_metadata(&format!("access_control_lists.{T2}"))?;
    assert_eq!(acl, "# file: a/keep\nuser::rw-\n\n");
    let xattr = fx.read_metadata(&format!("extended_attributes.{T2}.gz"))?;
    assert_eq!(xattr, "# file: a/keep\nuser.origin=\"mail\"\n\n");

    let stats = fx.read_metadata(&format!("file_statistics.{T2}.data.gz"))?;
    assert!(!stats.contains("a/b "));
    assert!(stats.contains("a/keep 0 4 4 NA\n"));
    assert!(stats.starts_with("# Filename"));

    // Files the tool does not know about are left alone
    assert_eq!(fx.read_metadata(&format!("current_mirror.{T2}.data"))?, "PID 1234\n");

    // No staging or backup files left behind
    let leftovers: Vec<_> = std::fs::read_dir(fx.data_dir())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with('.') || n.ends_with('~'))
        .collect();
    assert!(leftovers.is_empty(), "leftover files: {:?}", leftovers);
    Ok(())
}

#[test]
fn test_second_run_is_a_no_op() -> Result<()> {
    let fx = sample_archive()?;
    crate::prune!("-y", fx.arg(), "/a/b").assert_success()?;
    let after_first = fx.snapshot()?;

    let result = crate::prune!("-y", fx.arg(), "/a/b").assert_success()?;
    assert!(result.contains_stdout("Nothing to delete"));
    assert_eq!(fx.snapshot()?, after_first);
    Ok(())
}

#[test]
fn test_cutoff_skips_older_metadata() -> Result<()> {
    // `old/gone` vanished at T2, so nothing before T2 can mention it. The T1
    // file is unreadable on purpose: touching it would fail the run.
    let fx = ArchiveFixture::new()?;
    fx.mirror_file("old/other", "x")?
        .increment("old/gone", T2, "missing", false)?
        .metadata(&format!("mirror_metadata.{T1}.snapshot"), "  Type reg\nnot metadata\n")?
        .metadata(
            &format!("mirror_metadata.{T3}.snapshot.gz"),
            &mirror_meta(&["old/", "old/other"]),
        )?;

    let result = crate::prune!("-y", fx.arg(), "/old/gone").assert_success()?;
    assert_eq!(result.summary_value("Skipped by cutoff:").as_deref(), Some("1"));
    assert_eq!(result.summary_value("Metadata unchanged:").as_deref(), Some("1"));
    assert!(!fx.exists(&format!("rdiff-backup-data/increments/old/gone.{T2}.missing")));
    assert_eq!(
        fx.read_metadata(&format!("mirror_metadata.{T1}.snapshot"))?,
        "  Type reg\nnot metadata\n"
    );
    Ok(())
}

#[test]
fn test_hard_link_keeps_checksum() -> Result<()> {
    let fx = ArchiveFixture::new()?;
    fx.mirror_file("docs/report", "pdf")?
        .mirror_file("docs/report-link", "pdf")?
        .increment("docs/report", T1, "snapshot", true)?
        .metadata(
            &format!("mirror_metadata.{T1}.snapshot.gz"),
            "File docs/report\n  Type reg\n  NumHardLinks 2\n  Inode 42\n  DeviceLoc 2049\n  SHA1Digest 0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33\n\
File docs/report-link\n  Type reg\n  NumHardLinks 2\n  Inode 42\n  DeviceLoc 2049\n  Perms 420\n",
        )?;

    crate::prune!("-y", fx.arg(), "/docs/report").assert_success()?;

    let meta = fx.read_metadata(&format!("mirror_metadata.{T1}.snapshot.gz"))?;
    assert_eq!(
        meta,
        "File docs/report-link\n  Type reg\n  NumHardLinks 2\n  Inode 42\n  DeviceLoc 2049\n  SHA1Digest 0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33\n  Perms 420\n"
    );
    assert!(fx.exists("docs/report-link"));
    Ok(())
}

#[test]
fn test_keep_backups() -> Result<()> {
    let fx = sample_archive()?;
    let name = format!("mirror_metadata.{T1}.snapshot.gz");
    let original = fx.read_metadata(&name)?;

    crate::prune!("-y", "-k", fx.arg(), "/a/b").assert_success()?;

    assert_eq!(fx.read_metadata(&format!("{name}.~1~"))?, original);
    assert_ne!(fx.read_metadata(&name)?, original);
    // Unchanged files get no backup
    assert!(!fx.exists(&format!("rdiff-backup-data/current_mirror.{T2}.data.~1~")));
    Ok(())
}

#[test]
fn test_malformed_metadata_aborts_untouched() -> Result<()> {
    let fx = sample_archive()?;
    fx.metadata(
        &format!("mirror_metadata.{T3}.snapshot"),
        "File a/keep\n  Type reg\ngarbage line\n",
    )?;
    let before = fx.snapshot()?;

    let result = crate::prune!("-y", fx.arg(), "/a/b").assert_exit(1)?;
    assert!(result.contains_stderr("malformed stream"));
    assert!(result.contains_stderr(&format!("mirror_metadata.{T3}.snapshot")));
    assert_eq!(fx.snapshot()?, before);
    Ok(())
}

#[test]
fn test_glob_deletes_every_match() -> Result<()> {
    let fx = sample_archive()?;
    fx.mirror_file("a/c.iso", "iso")?
        .mirror_file("a/d.iso", "iso")?
        .increment("a/c.iso", T2, "snapshot", true)?;

    let result = crate::prune!("-y", fx.arg(), "/a/*.iso", "/a/b").assert_success()?;
    assert!(result.contains_stdout("# Names to delete (3)"));
    assert!(!fx.exists("a/c.iso"));
    assert!(!fx.exists("a/d.iso"));
    assert!(!fx.exists("a/b"));
    assert!(fx.exists("a/keep"));
    assert!(!fx.exists(&format!("rdiff-backup-data/increments/a/c.iso.{T2}.snapshot.gz")));
    Ok(())
}
