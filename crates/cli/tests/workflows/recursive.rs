//! Directory handling with and without -R / -r

use crate::common::{ArchiveFixture, T1, T2};
use anyhow::Result;

/// `cache/` is a directory with history; `cached` is a sibling file whose
/// name shares the prefix
fn cache_archive() -> Result<ArchiveFixture> {
    let fx = ArchiveFixture::new()?;
    fx.mirror_file("cache/x", "x")?
        .mirror_file("cache/sub/y", "y")?
        .mirror_file("cached", "keep me")?
        .increment("cache", T1, "dir", false)?
        .increment("cache/x", T1, "snapshot", true)?
        .increment("cache/old", T2, "missing", false)?
        .increment("cached", T1, "snapshot", true)?
        .metadata(
            &format!("mirror_metadata.{T1}.snapshot.gz"),
            "File .\n  Type dir\nFile cache\n  Type dir\nFile cache/sub\n  Type dir\nFile cache/sub/y\n  Type reg\nFile cache/x\n  Type reg\nFile cached\n  Type reg\n",
        )?
        .metadata(
            &format!("file_statistics.{T1}.data"),
            ". 0 1 1 NA\ncache 0 1 1 NA\ncache/sub/y 0 1 1 NA\ncache/x 0 1 1 NA\ncached 0 7 7 NA\n",
        )?;
    Ok(fx)
}

#[test]
fn test_full_recursion_removes_subtree() -> Result<()> {
    let fx = cache_archive()?;

    let result = crate::prune!("-y", "-R", fx.arg(), "/cache").assert_success()?;
    // Subtree roots are listed with a trailing slash
    assert!(result.contains_stdout("cache/\n"));

    assert!(!fx.exists("cache"));
    assert!(!fx.exists("rdiff-backup-data/increments/cache"));
    assert!(!fx.exists(&format!("rdiff-backup-data/increments/cache.{T1}.dir")));
    assert!(fx.exists("cached"));
    assert!(fx.exists(&format!("rdiff-backup-data/increments/cached.{T1}.snapshot.gz")));

    let meta = fx.read_metadata(&format!("mirror_metadata.{T1}.snapshot.gz"))?;
    assert_eq!(meta, "File .\n  Type dir\nFile cached\n  Type reg\n");
    let stats = fx.read_metadata(&format!("file_statistics.{T1}.data"))?;
    assert_eq!(stats, ". 0 1 1 NA\ncached 0 7 7 NA\n");
    Ok(())
}

#[test]
fn test_full_recursion_wildcard_spans_separators() -> Result<()> {
    let fx = cache_archive()?;
    crate::prune!("-y", "-R", fx.arg(), "/cache/*y").assert_success()?;

    assert!(!fx.exists("cache/sub/y"));
    assert!(fx.exists("cache/x"));
    assert!(fx.exists("cache/sub"));
    Ok(())
}

#[test]
fn test_limited_recursion() -> Result<()> {
    let fx = cache_archive()?;
    crate::prune!("-y", "-r", fx.arg(), "/cache/s*").assert_success()?;

    assert!(!fx.exists("cache/sub"));
    assert!(fx.exists("cache/x"));

    let meta = fx.read_metadata(&format!("mirror_metadata.{T1}.snapshot.gz"))?;
    assert!(!meta.contains("cache/sub"));
    assert!(meta.contains("File cache/x\n"));
    Ok(())
}

#[test]
fn test_limited_recursion_rejects_inner_wildcards() -> Result<()> {
    let fx = cache_archive()?;
    let before = fx.snapshot()?;

    let result = crate::prune!("-y", "-r", fx.arg(), "/ca*/x").assert_exit(1)?;
    assert!(result.contains_stderr("malformed pattern"));
    assert_eq!(fx.snapshot()?, before);
    Ok(())
}

#[test]
fn test_directory_skipped_without_recursion() -> Result<()> {
    let fx = cache_archive()?;
    let before = fx.snapshot()?;

    let result = crate::prune!("-y", fx.arg(), "/cache").assert_success()?;
    assert!(result.contains_stderr("cache is a directory; skipped"));
    assert!(result.contains_stdout("Nothing to delete"));
    assert_eq!(fx.snapshot()?, before);
    Ok(())
}

#[test]
fn test_recursion_clears_foreign_files_in_increment_dirs() -> Result<()> {
    let fx = cache_archive()?;
    std::fs::write(fx.increments_dir().join("cache/not-an-increment"), "left by hand")?;

    crate::prune!("-y", "-R", fx.arg(), "/cache").assert_success()?;
    assert!(!fx.exists("rdiff-backup-data/increments/cache"));
    assert!(!fx.exists("cache"));
    assert!(fx.exists("cached"));

    let again = crate::prune!("-y", "-R", fx.arg(), "/cache").assert_success()?;
    assert!(again.contains_stdout("Nothing to delete"));
    Ok(())
}

#[test]
fn test_file_and_directory_collision_is_excluded() -> Result<()> {
    // `both` is a file now but was a directory at T1
    let fx = ArchiveFixture::new()?;
    fx.mirror_file("both", "now a file")?
        .mirror_file("plain", "p")?
        .increment("both", T1, "dir", false)?
        .metadata(
            &format!("mirror_metadata.{T2}.snapshot"),
            "File both\n  Type reg\nFile plain\n  Type reg\n",
        )?;
    let before = fx.snapshot()?;

    let result = crate::prune!("-y", fx.arg(), "/both").assert_success()?;
    assert!(result.contains_stderr("was both a directory and a non-directory"));
    assert_eq!(fx.snapshot()?, before);

    // The other name in the same run still goes
    crate::prune!("-y", fx.arg(), "/both", "/plain").assert_success()?;
    assert!(!fx.exists("plain"));
    assert!(fx.exists("both"));
    assert_eq!(
        fx.read_metadata(&format!("mirror_metadata.{T2}.snapshot"))?,
        "File both\n  Type reg\n"
    );
    Ok(())
}
