//! Archive history analysis
//!
//! This crate provides:
//! - Tree scanning of mirror and increments against compiled patterns
//! - Earliest-history tracking and the metadata cutoff date
//! - Construction of the canonical, collision-checked deletion set

pub mod cutoff;
pub mod deletion;
pub mod scan;

// Re-exports
pub use cutoff::{Cutoff, HistoryEntry, HistoryKind, HistoryPoint, HistoryTracker};
pub use deletion::{BuildOutcome, DeletionSetBuilder, RemovalList};
pub use scan::{IncrementHit, ScanReport, TreeScanner};
