//! Tree scanning of the mirror and the increment tree
//!
//! Both trees are walked separately through the injected [`TreeWalker`],
//! rooted at the patterns' shared literal prefix. Entries are classified
//! in two passes: recursive modes first collect the directories that match
//! directly, then everything below one of them matches as well.

use crate::cutoff::HistoryTracker;
use prune_core::{
    ArchiveLayout, ArchiveName, EntryKind, IncrementKind, IncrementRecord, PathMatcher, Result, TreeWalker,
    WalkEntry,
};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// An increment file that matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementHit {
    /// Path relative to the increments directory
    pub path: ArchiveName,
    /// Decoded name, timestamp and type
    pub record: IncrementRecord,
}

/// Everything a scan matched
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Matched non-directory mirror entries
    pub mirror_files: Vec<ArchiveName>,
    /// Matched mirror directories, deepest first
    pub mirror_dirs: Vec<ArchiveName>,
    /// Matched increment files
    pub increment_files: Vec<IncrementHit>,
    /// Matched increment directories, deepest first
    pub increment_dirs: Vec<ArchiveName>,
    /// Files under a matched increment subtree that are not increments
    pub stray_increment_files: Vec<ArchiveName>,
    /// Earliest history per matched name
    pub history: HistoryTracker,
}

impl ScanReport {
    /// Whether nothing matched at all
    pub fn is_empty(&self) -> bool {
        self.mirror_files.is_empty()
            && self.mirror_dirs.is_empty()
            && self.increment_files.is_empty()
            && self.increment_dirs.is_empty()
            && self.stray_increment_files.is_empty()
    }
}

/// Walks an archive and classifies what the patterns match
pub struct TreeScanner<'a> {
    layout: &'a ArchiveLayout,
    matcher: &'a PathMatcher,
    walker: &'a dyn TreeWalker,
}

impl<'a> TreeScanner<'a> {
    /// Create a scanner over `layout`
    pub fn new(layout: &'a ArchiveLayout, matcher: &'a PathMatcher, walker: &'a dyn TreeWalker) -> Self {
        Self {
            layout,
            matcher,
            walker,
        }
    }

    /// Scan both trees
    pub fn scan(&self) -> Result<ScanReport> {
        let prefix = self.matcher.scan_prefix();
        info!("Scanning from '{}'", if prefix.is_root() { ".".to_string() } else { prefix.to_string() });

        let mirror = self.walk_mirror(&prefix)?;

        // Refuse before reading any increment name we could misinterpret
        self.layout.check_supported()?;
        let increments = self.walk_rooted(&prefix, self.layout.increments_dir(), None)?;

        let recursive = self.matcher.mode().is_recursive();
        let roots = if recursive {
            self.collect_subtree_roots(&mirror, &increments)
        } else {
            BTreeSet::new()
        };
        let in_matched_subtree = |name: &ArchiveName| name.ancestors().any(|a| roots.contains(a));
        let selected = |name: &ArchiveName| self.matcher.matches(name) || in_matched_subtree(name);

        let mut report = ScanReport::default();

        for entry in mirror {
            if !selected(&entry.path) {
                continue;
            }
            debug!("Mirror match: {}", entry.path);
            report.history.record_alive(entry.path.clone());
            if entry.kind.is_dir() {
                report.mirror_dirs.push(entry.path);
            } else {
                report.mirror_files.push(entry.path);
            }
        }

        for entry in increments {
            if entry.kind.is_dir() {
                if selected(&entry.path) {
                    debug!("Increment directory match: {}", entry.path);
                    report.history.record_alive(entry.path.clone());
                    report.increment_dirs.push(entry.path);
                }
                continue;
            }
            let Some(record) = IncrementRecord::decode(&entry.path) else {
                if in_matched_subtree(&entry.path) {
                    // Its directory goes away, so it has to as well
                    warn!("Removing non-increment file {} with its directory", entry.path);
                    report.stray_increment_files.push(entry.path);
                } else {
                    debug!("Ignoring undecodable increment {}", entry.path);
                }
                continue;
            };
            if selected(&record.name) {
                debug!("Increment match: {} ({} at {})", record.name, record.kind, record.timestamp);
                report.history.record_increment(&record);
                report.increment_files.push(IncrementHit {
                    path: entry.path,
                    record,
                });
            }
        }

        sort_deepest_first(&mut report.mirror_dirs);
        sort_deepest_first(&mut report.increment_dirs);

        info!(
            "Matched {} mirror files, {} mirror dirs, {} increments, {} increment dirs",
            report.mirror_files.len(),
            report.mirror_dirs.len(),
            report.increment_files.len(),
            report.increment_dirs.len()
        );
        Ok(report)
    }

    fn walk_mirror(&self, prefix: &ArchiveName) -> Result<Vec<WalkEntry>> {
        let data_dir = ArchiveLayout::data_dir_rel();
        let data_name = ArchiveName::from_path(data_dir);
        if *prefix == data_name || prefix.is_descendant_of(&data_name) {
            // Patterns aimed inside the metadata directory never match mirror content
            return Ok(Vec::new());
        }
        let skip = if prefix.is_root() { Some(data_dir) } else { None };
        self.walk_rooted(prefix, self.layout.root(), skip)
    }

    /// Walk `base/prefix` and report names relative to `base`
    fn walk_rooted(
        &self,
        prefix: &ArchiveName,
        base: &std::path::Path,
        skip: Option<&std::path::Path>,
    ) -> Result<Vec<WalkEntry>> {
        if prefix.is_root() {
            return self.walker.walk(base, skip);
        }
        // Every prefix component must be a real directory, or the walk would
        // leave the archive through a symlink
        let mut components: Vec<&[u8]> = prefix.ancestors().collect();
        components.reverse();
        components.push(prefix.as_bytes());
        for component in components {
            let path = ArchiveName::from_bytes(component.to_vec()).under(base);
            if self.walker.entry_kind(&path)? != Some(EntryKind::Directory) {
                debug!("Prefix {} is not a directory, nothing to walk", path.display());
                return Ok(Vec::new());
            }
        }
        let entries = self.walker.walk(&prefix.under(base), skip)?;
        Ok(entries
            .into_iter()
            .map(|e| WalkEntry {
                path: prefix.join(e.path.as_bytes()),
                kind: e.kind,
            })
            .collect())
    }

    /// Directories matched directly by a pattern, by raw name
    fn collect_subtree_roots(&self, mirror: &[WalkEntry], increments: &[WalkEntry]) -> BTreeSet<Vec<u8>> {
        let mut roots = BTreeSet::new();
        for entry in mirror.iter().chain(increments.iter()) {
            if entry.kind.is_dir() && self.matcher.matches(&entry.path) {
                roots.insert(entry.path.as_bytes().to_vec());
            }
        }
        for entry in increments.iter().filter(|e| !e.kind.is_dir()) {
            if let Some(record) = IncrementRecord::decode(&entry.path) {
                if record.kind == IncrementKind::Dir && self.matcher.matches(&record.name) {
                    roots.insert(record.name.as_bytes().to_vec());
                }
            }
        }
        roots
    }
}

/// Children before parents, so directories can be removed in order
fn sort_deepest_first(dirs: &mut [ArchiveName]) {
    dirs.sort_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| b.cmp(a)));
}
