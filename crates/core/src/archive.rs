//! On-disk archive layout and metadata file discovery

use crate::compress::Compressor;
use crate::error::{PruneError, Result};
use crate::timestamp::Timestamp;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Metadata directory below the archive root
pub const DATA_DIR_NAME: &str = "rdiff-backup-data";
/// Increment tree below the metadata directory
pub const INCREMENTS_DIR_NAME: &str = "increments";
/// Auxiliary storage for over-long file names (not supported)
pub const LONG_FILENAME_DIR_NAME: &str = "long_filename_data";

/// Layout of a backup archive
///
/// ```text
/// <root>/                      mirror of the latest backup
///   rdiff-backup-data/
///     mirror_metadata.<ts>[.snapshot|.diff][.gz]
///     access_control_lists.<ts>[.gz]
///     extended_attributes.<ts>[.gz]
///     file_statistics.<ts>[.data][.gz]
///     increments/              per-path history: <name>.<ts>.<type>[.gz]
///     long_filename_data/      refused when populated
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    root: PathBuf,
    data_dir: PathBuf,
    increments_dir: PathBuf,
}

impl ArchiveLayout {
    /// Open an existing archive
    pub fn open(root: &Path) -> Result<Self> {
        let data_dir = root.join(DATA_DIR_NAME);
        if !data_dir.is_dir() {
            return Err(PruneError::NotAnArchive(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
            increments_dir: data_dir.join(INCREMENTS_DIR_NAME),
            data_dir,
        })
    }

    /// Refuse archives that keep long file names in auxiliary storage
    pub fn check_supported(&self) -> Result<()> {
        let long_dir = self.data_dir.join(LONG_FILENAME_DIR_NAME);
        if !long_dir.is_dir() {
            return Ok(());
        }
        let entries = fs::read_dir(&long_dir)
            .map_err(|e| PruneError::io(format!("failed to read {}", long_dir.display()), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PruneError::io("failed to read long filename storage", e))?;
            if entry.file_name() != "next_free" {
                return Err(PruneError::UnsupportedFormat(format!(
                    "{} is in use; archives with long filename storage cannot be pruned",
                    long_dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Mirror root (the archive root itself)
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Metadata directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Increment tree root
    pub fn increments_dir(&self) -> &Path {
        &self.increments_dir
    }

    /// Relative path of the metadata directory, used to exclude it from the mirror walk
    pub fn data_dir_rel() -> &'static Path {
        Path::new(DATA_DIR_NAME)
    }

    /// Every metadata file this tool knows how to rewrite, oldest first
    pub fn metadata_files(&self) -> Result<Vec<MetadataFile>> {
        let entries = fs::read_dir(&self.data_dir)
            .map_err(|e| PruneError::io(format!("failed to read {}", self.data_dir.display()), e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PruneError::io("failed to list metadata directory", e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(file) = MetadataFile::parse(name, entry.path()) {
                files.push(file);
            }
        }
        files.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(files)
    }
}

/// Kind of per-session record file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKind {
    /// `File <path>` blocks with attribute lines
    MirrorMetadata,
    /// `# file: <path>` blocks with ACL entries
    AccessControlLists,
    /// `# file: <path>` blocks with extended attributes
    ExtendedAttributes,
    /// One line per path with four numeric fields
    FileStatistics,
}

impl MetadataKind {
    const ALL: [MetadataKind; 4] = [
        MetadataKind::MirrorMetadata,
        MetadataKind::AccessControlLists,
        MetadataKind::ExtendedAttributes,
        MetadataKind::FileStatistics,
    ];

    /// File name prefix, without the trailing dot
    pub fn prefix(self) -> &'static str {
        match self {
            MetadataKind::MirrorMetadata => "mirror_metadata",
            MetadataKind::AccessControlLists => "access_control_lists",
            MetadataKind::ExtendedAttributes => "extended_attributes",
            MetadataKind::FileStatistics => "file_statistics",
        }
    }

    fn accepts_variant(self, variant: &str) -> bool {
        match self {
            MetadataKind::MirrorMetadata => matches!(variant, "snapshot" | "diff"),
            MetadataKind::FileStatistics => variant == "data",
            _ => false,
        }
    }
}

/// One metadata file in the metadata directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFile {
    pub kind: MetadataKind,
    pub timestamp: Timestamp,
    pub compressed: bool,
    pub path: PathBuf,
}

impl MetadataFile {
    /// Recognize a metadata file name; anything else yields `None`
    pub fn parse(file_name: &str, path: PathBuf) -> Option<Self> {
        let (stem, compressed) = match file_name.strip_suffix(".gz") {
            Some(stem) => (stem, true),
            None => (file_name, false),
        };

        let kind = MetadataKind::ALL.into_iter().find(|k| {
            stem.strip_prefix(k.prefix())
                .is_some_and(|rest| rest.starts_with('.'))
        })?;
        let rest = &stem[kind.prefix().len() + 1..];

        let (ts, variant) = match rest.split_once('.') {
            Some((ts, variant)) => (ts, Some(variant)),
            None => (rest, None),
        };
        if let Some(variant) = variant {
            if !kind.accepts_variant(variant) {
                return None;
            }
        }

        Some(Self {
            kind,
            timestamp: Timestamp::parse(ts)?,
            compressed,
            path,
        })
    }

    /// Read and, if needed, decompress the whole file
    pub fn read(&self, codec: &dyn Compressor) -> Result<Vec<u8>> {
        let raw = fs::read(&self.path)
            .map_err(|e| PruneError::io(format!("failed to read {}", self.path.display()), e))?;
        if self.compressed {
            codec.decompress(&raw)
        } else {
            Ok(raw)
        }
    }

    /// File name without directory
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Hidden sibling used to stage content before a rename into `target`
pub fn sibling_temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.prune-tmp", name))
}

/// Write `data` to `path` and fsync it
pub fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Fsync a directory so a rename inside it is durable
pub fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}
