//! ACL and extended attribute record filtering
//!
//! Both files are `getfacl`/`getfattr` style dumps: a `# file: <path>`
//! marker starts each block and everything up to the next marker belongs
//! to it. Marker paths are octal-escaped.

use crate::{lines_with_terminator, trim_terminator, ParseError, RecordRewriter, RewriteOutcome};
use prune_core::escape::octal_unescape;
use prune_core::{ArchiveName, DeletionSet};

const MARKER: &[u8] = b"# file: ";

/// Drops ACL / extended attribute blocks of deleted names
pub struct AclRewriter<'s> {
    set: &'s DeletionSet,
}

impl<'s> AclRewriter<'s> {
    pub fn new(set: &'s DeletionSet) -> Self {
        Self { set }
    }
}

impl RecordRewriter for AclRewriter<'_> {
    fn rewrite(&self, input: &[u8]) -> Result<RewriteOutcome, ParseError> {
        let mut out = Vec::with_capacity(input.len());
        let mut removed = 0;
        // Lines before the first marker are kept
        let mut dropping = false;

        for (idx, raw) in lines_with_terminator(input, b'\n').enumerate() {
            let line = trim_terminator(raw, b'\n');
            if let Some(escaped) = line.strip_prefix(MARKER) {
                let path = octal_unescape(escaped)
                    .ok_or_else(|| ParseError::new(idx + 1, "invalid octal escape in file marker"))?;
                dropping = self.set.covers(&ArchiveName::from_bytes(path));
                if dropping {
                    removed += 1;
                }
            }
            if !dropping {
                out.extend_from_slice(raw);
            }
        }

        if removed == 0 {
            return Ok(RewriteOutcome::Unchanged);
        }
        Ok(RewriteOutcome::Changed { content: out, removed })
    }
}
