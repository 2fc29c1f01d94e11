//! Earliest-history tracking and the metadata cutoff date
//!
//! A metadata file dated before a name's first recorded appearance cannot
//! describe that name. When every name slated for deletion first shows up
//! as a `missing` increment, metadata strictly older than the earliest of
//! those timestamps is skipped. One name that existed before recorded
//! history began disables the cutoff.

use prune_core::{ArchiveName, DeletionSet, IncrementKind, IncrementRecord, Timestamp};
use std::collections::BTreeMap;
use std::fmt;

/// Position of a history entry in time; `AliveNow` sorts after every timestamp
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum HistoryPoint {
    At(Timestamp),
    AliveNow,
}

/// What was recorded at a history point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// An increment file of the given type
    Increment(IncrementKind),
    /// Present in the current mirror or as a live increment directory
    Alive,
}

impl HistoryKind {
    /// `missing` means "did not exist at this time"
    pub fn is_missing(self) -> bool {
        matches!(self, HistoryKind::Increment(IncrementKind::Missing))
    }
}

/// Earliest known record for one name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub point: HistoryPoint,
    pub kind: HistoryKind,
}

/// Per-name earliest history, filled in during the scan
#[derive(Debug, Default, Clone)]
pub struct HistoryTracker {
    earliest: BTreeMap<ArchiveName, HistoryEntry>,
}

impl HistoryTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the synthetic entry for a name that exists right now
    pub fn record_alive(&mut self, name: ArchiveName) {
        self.record(name, HistoryPoint::AliveNow, HistoryKind::Alive);
    }

    /// Account for one increment file
    pub fn record_increment(&mut self, rec: &IncrementRecord) {
        self.record(
            rec.name.clone(),
            HistoryPoint::At(rec.timestamp.clone()),
            HistoryKind::Increment(rec.kind),
        );
    }

    fn record(&mut self, name: ArchiveName, point: HistoryPoint, kind: HistoryKind) {
        match self.earliest.get_mut(&name) {
            Some(existing) => {
                let earlier = point < existing.point;
                // On a tie the existence proof wins, it is the conservative choice
                let tie_upgrade = point == existing.point && existing.kind.is_missing() && !kind.is_missing();
                if earlier || tie_upgrade {
                    *existing = HistoryEntry { point, kind };
                }
            }
            None => {
                self.earliest.insert(name, HistoryEntry { point, kind });
            }
        }
    }

    /// Earliest entry for a name
    pub fn get(&self, name: &ArchiveName) -> Option<&HistoryEntry> {
        self.earliest.get(name)
    }

    /// Number of tracked names
    pub fn len(&self) -> usize {
        self.earliest.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.earliest.is_empty()
    }

    /// Cutoff for the names in `set`
    ///
    /// Disabled as soon as one member has no history at all or its earliest
    /// record is anything but `missing`.
    pub fn cutoff_for(&self, set: &DeletionSet) -> Cutoff {
        let mut earliest: Option<&Timestamp> = None;
        for name in set.iter() {
            let Some(entry) = self.earliest.get(name) else {
                tracing::debug!("No history for {}, cutoff disabled", name);
                return Cutoff::Disabled;
            };
            if !entry.kind.is_missing() {
                tracing::debug!("{} predates recorded history, cutoff disabled", name);
                return Cutoff::Disabled;
            }
            if let HistoryPoint::At(ts) = &entry.point {
                if earliest.map_or(true, |e| ts < e) {
                    earliest = Some(ts);
                }
            }
        }
        match earliest {
            Some(ts) => Cutoff::At(ts.clone()),
            None => Cutoff::Disabled,
        }
    }
}

/// Oldest metadata date that still has to be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cutoff {
    /// Every metadata file must be scanned
    Disabled,
    /// Files dated strictly before this are skipped
    At(Timestamp),
}

impl Cutoff {
    /// Whether a metadata file from `ts` needs rewriting
    pub fn includes(&self, ts: &Timestamp) -> bool {
        match self {
            Cutoff::Disabled => true,
            Cutoff::At(cutoff) => ts.instant() >= cutoff.instant(),
        }
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cutoff::Disabled => f.write_str("none (all history scanned)"),
            Cutoff::At(ts) => write!(f, "{}", ts),
        }
    }
}
