//! Tree walking capability
//!
//! The scanner never touches the filesystem directly: it asks a
//! [`TreeWalker`] for the entries under a root. [`FsWalker`] walks a real
//! directory with walkdir, [`MemoryWalker`] serves in-memory fixtures.

use crate::error::{PruneError, Result};
use crate::name::ArchiveName;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Type of a walked entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (never followed)
    Symlink,
    /// Device, fifo, socket
    Special,
}

impl EntryKind {
    /// Directories are the only kind that can contain other entries
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// One entry found below a walk root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the walk root
    pub path: ArchiveName,
    /// Entry type
    pub kind: EntryKind,
}

/// Something that can list a directory tree
pub trait TreeWalker: Send + Sync {
    /// List every entry strictly below `root`, parents before children
    ///
    /// `skip` names a path relative to `root` that must be neither reported
    /// nor descended into. A missing root, or one that is not a real
    /// directory, yields an empty listing.
    fn walk(&self, root: &Path, skip: Option<&Path>) -> Result<Vec<WalkEntry>>;

    /// Type of the entry at `path` without following a final symlink,
    /// `None` if nothing is there
    fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>>;
}

fn kind_of(ft: std::fs::FileType) -> EntryKind {
    if ft.is_dir() {
        EntryKind::Directory
    } else if ft.is_symlink() {
        EntryKind::Symlink
    } else if ft.is_file() {
        EntryKind::File
    } else {
        EntryKind::Special
    }
}

/// Walks the real filesystem without following symlinks
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWalker;

impl TreeWalker for FsWalker {
    fn walk(&self, root: &Path, skip: Option<&Path>) -> Result<Vec<WalkEntry>> {
        // walkdir follows the root it is handed even with follow_links off
        if self.entry_kind(root)? != Some(EntryKind::Directory) {
            return Ok(Vec::new());
        }
        let skip_abs = skip.map(|s| root.join(s));

        let mut entries = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| skip_abs.as_deref() != Some(e.path()));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let context = format!("failed to walk {}", root.display());
                PruneError::io(context, e.into())
            })?;
            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| PruneError::io("walked outside root", std::io::ErrorKind::Other.into()))?;

            entries.push(WalkEntry {
                path: ArchiveName::from_path(rel),
                kind: kind_of(entry.file_type()),
            });
        }

        Ok(entries)
    }

    fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>> {
        match std::fs::symlink_metadata(path) {
            Ok(meta) => Ok(Some(kind_of(meta.file_type()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PruneError::io(format!("failed to stat {}", path.display()), e)),
        }
    }
}

/// In-memory tree keyed by absolute path, for tests
#[derive(Debug, Default, Clone)]
pub struct MemoryWalker {
    entries: BTreeMap<PathBuf, EntryKind>,
}

impl MemoryWalker {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating parent directories implicitly
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.add_parents(&path);
        self.entries.insert(path, EntryKind::File);
        self
    }

    /// Add a directory, creating parent directories implicitly
    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.add_parents(&path);
        self.entries.insert(path, EntryKind::Directory);
        self
    }

    /// Add a symlink, creating parent directories implicitly
    pub fn symlink(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.add_parents(&path);
        self.entries.insert(path, EntryKind::Symlink);
        self
    }

    fn add_parents(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() || ancestor == Path::new("/") {
                break;
            }
            self.entries
                .entry(ancestor.to_path_buf())
                .or_insert(EntryKind::Directory);
        }
    }
}

impl TreeWalker for MemoryWalker {
    fn walk(&self, root: &Path, skip: Option<&Path>) -> Result<Vec<WalkEntry>> {
        if self.entries.get(root).is_some_and(|kind| !kind.is_dir()) {
            return Ok(Vec::new());
        }
        let skip_abs = skip.map(|s| root.join(s));
        Ok(self
            .entries
            .iter()
            .filter(|(path, _)| path.starts_with(root) && path.as_path() != root)
            .filter(|(path, _)| match &skip_abs {
                Some(s) => !path.starts_with(s),
                None => true,
            })
            .filter_map(|(path, kind)| {
                let rel = path.strip_prefix(root).ok()?;
                Some(WalkEntry {
                    path: ArchiveName::from_path(rel),
                    kind: *kind,
                })
            })
            .collect())
    }

    fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>> {
        Ok(self.entries.get(path).copied())
    }
}
