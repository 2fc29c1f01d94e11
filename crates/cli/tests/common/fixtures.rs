//! On-disk archive fixtures
//!
//! An [`ArchiveFixture`] is a throwaway archive root with a mirror, an
//! increments tree and a metadata directory. Files ending in `.gz` are
//! written and read through gzip so tests deal in plain text.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const T1: &str = "2020-01-01T00:00:00-00:00";
pub const T2: &str = "2020-02-01T00:00:00-00:00";
pub const T3: &str = "2020-03-01T00:00:00-00:00";

/// Snapshot entry: file bytes, or `None` for a directory
pub type Tree = BTreeMap<PathBuf, Option<Vec<u8>>>;

pub struct ArchiveFixture {
    dir: TempDir,
    root: String,
}

impl ArchiveFixture {
    /// Empty archive: just the metadata and increments directories
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("rdiff-backup-data").join("increments"))?;
        let root = dir.path().display().to_string();
        Ok(Self { dir, root })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Archive root as a command-line argument
    pub fn arg(&self) -> &str {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join("rdiff-backup-data")
    }

    pub fn increments_dir(&self) -> PathBuf {
        self.data_dir().join("increments")
    }

    pub fn mirror_file(&self, rel: &str, content: &str) -> Result<&Self> {
        write_file(&self.root().join(rel), content.as_bytes(), false)?;
        Ok(self)
    }

    pub fn mirror_dir(&self, rel: &str) -> Result<&Self> {
        fs::create_dir_all(self.root().join(rel))?;
        Ok(self)
    }

    /// Add `increments/<name>.<ts>.<kind>[.gz]`
    pub fn increment(&self, name: &str, ts: &str, kind: &str, gz: bool) -> Result<&Self> {
        let mut file_name = format!("{}.{}.{}", name, ts, kind);
        if gz {
            file_name.push_str(".gz");
        }
        let content: &[u8] = match kind {
            "dir" | "missing" => b"",
            _ => b"old contents\n",
        };
        write_file(&self.increments_dir().join(file_name), content, gz)?;
        Ok(self)
    }

    pub fn increment_dir(&self, rel: &str) -> Result<&Self> {
        fs::create_dir_all(self.increments_dir().join(rel))?;
        Ok(self)
    }

    /// Add a file to the metadata directory, gzipped if the name says so
    pub fn metadata(&self, file_name: &str, content: &str) -> Result<&Self> {
        write_file(
            &self.data_dir().join(file_name),
            content.as_bytes(),
            file_name.ends_with(".gz"),
        )?;
        Ok(self)
    }

    /// Decompressed text of a metadata file
    pub fn read_metadata(&self, file_name: &str) -> Result<String> {
        let path = self.data_dir().join(file_name);
        let raw = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let bytes = if file_name.contains(".gz") {
            let mut out = Vec::new();
            GzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
            out
        } else {
            raw
        };
        Ok(String::from_utf8(bytes)?)
    }

    /// Symlink in the mirror pointing at `target`
    pub fn mirror_symlink(&self, rel: &str, target: &Path) -> Result<&Self> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        std::os::unix::fs::symlink(target, &path)?;
        Ok(self)
    }

    /// Whether `rel` exists below the archive root
    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).symlink_metadata().is_ok()
    }

    /// Every entry below the root with its bytes
    pub fn snapshot(&self) -> Result<Tree> {
        let mut tree = Tree::new();
        collect(self.root(), self.root(), &mut tree)?;
        Ok(tree)
    }
}

fn write_file(path: &Path, content: &[u8], gz: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = if gz {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content)?;
        encoder.finish()?
    } else {
        content.to_vec()
    };
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn collect(base: &Path, dir: &Path, tree: &mut Tree) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let rel = path.strip_prefix(base)?.to_path_buf();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            tree.insert(rel, None);
            collect(base, &path, tree)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&path)?;
            tree.insert(rel, Some(target.as_os_str().as_bytes().to_vec()));
        } else {
            tree.insert(rel, Some(fs::read(&path)?));
        }
    }
    Ok(())
}
