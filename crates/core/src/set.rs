//! The canonical set of names slated for removal

use crate::name::{self, ArchiveName};
use std::collections::BTreeSet;

/// Sorted, deduplicated set of archive names to delete
///
/// Names recorded as subtree roots (recursive mode only) also cover every
/// name below them, so records of descendants that never showed up during
/// the scan are still dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSet {
    names: BTreeSet<ArchiveName>,
    subtree_roots: BTreeSet<ArchiveName>,
}

impl DeletionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single name. The archive root is never accepted.
    pub fn insert(&mut self, name: ArchiveName) -> bool {
        if name.is_root() {
            return false;
        }
        self.names.insert(name)
    }

    /// Add a directory whose whole subtree goes with it
    pub fn insert_subtree(&mut self, dir: ArchiveName) {
        if dir.is_root() {
            return;
        }
        self.names.insert(dir.clone());
        self.subtree_roots.insert(dir);
    }

    /// Exact membership
    pub fn contains(&self, name: &ArchiveName) -> bool {
        self.names.contains(name)
    }

    /// Membership including coverage by a subtree root
    pub fn covers(&self, name: &ArchiveName) -> bool {
        if self.names.contains(name) {
            return true;
        }
        if self.subtree_roots.is_empty() {
            return false;
        }
        name.ancestors()
            .any(|a| self.subtree_roots.contains(&ArchiveName::from_bytes(a.to_vec())))
    }

    /// Names in byte order
    pub fn iter(&self) -> impl Iterator<Item = &ArchiveName> {
        self.names.iter()
    }

    /// Subtree roots in byte order
    pub fn subtree_roots(&self) -> impl Iterator<Item = &ArchiveName> {
        self.subtree_roots.iter()
    }

    /// Number of names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing is slated for removal
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Serialized form hashed and stored in the plan file
    ///
    /// Plain names are NUL-terminated; a subtree root is written a second
    /// time with a trailing `/` so the encoding stays unambiguous.
    pub fn to_plan_bytes(&self) -> Vec<u8> {
        let mut out = name::encode_nul_list(&self.names);
        for root in &self.subtree_roots {
            out.extend_from_slice(root.as_bytes());
            out.extend_from_slice(b"/\0");
        }
        out
    }

    /// Parse [`to_plan_bytes`](Self::to_plan_bytes) output
    pub fn from_plan_bytes(data: &[u8]) -> Self {
        let mut set = Self::new();
        for chunk in data.split(|&b| b == 0).filter(|c| !c.is_empty()) {
            match chunk.strip_suffix(b"/") {
                Some(dir) => set.insert_subtree(ArchiveName::from_bytes(dir.to_vec())),
                None => {
                    set.insert(ArchiveName::from_bytes(chunk.to_vec()));
                }
            }
        }
        set
    }
}

impl FromIterator<ArchiveName> for DeletionSet {
    fn from_iter<I: IntoIterator<Item = ArchiveName>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}
