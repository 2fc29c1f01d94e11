//! Core types for pruning paths out of a reverse-increment backup archive
//!
//! This crate provides:
//! - Byte-exact archive names with the quoting schemes the archive uses
//! - Timestamps and increment filename decoding
//! - Path pattern compilation
//! - Injected capabilities for tree walking and compression
//! - Archive layout and metadata file discovery
//! - The canonical deletion set and the error taxonomy

pub mod archive;
pub mod compress;
pub mod error;
pub mod escape;
pub mod hash;
pub mod increment;
pub mod name;
pub mod pattern;
pub mod set;
pub mod timestamp;
pub mod walker;

// Re-exports
pub use archive::{ArchiveLayout, MetadataFile, MetadataKind};
pub use compress::{Compressor, GzipCompressor};
pub use error::{ErrorClass, PruneError, Result};
pub use hash::PlanHash;
pub use increment::{IncrementKind, IncrementRecord};
pub use name::ArchiveName;
pub use pattern::{PathMatcher, PathPattern, RecursionMode};
pub use set::DeletionSet;
pub use timestamp::Timestamp;
pub use walker::{EntryKind, FsWalker, MemoryWalker, TreeWalker, WalkEntry};
