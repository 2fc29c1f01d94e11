//! File statistics record filtering
//!
//! One record per path: `<quoted path> <changed> <source size> <mirror size>
//! <increment size>`, each field an integer or `NA`. Records are separated
//! by newlines, or by NUL when the file was written in NUL mode. Paths never
//! contain a raw separator since newlines are quoted as `\n`.

use crate::{lines_with_terminator, trim_terminator, ParseError, RecordRewriter, RewriteOutcome};
use prune_core::{ArchiveName, DeletionSet};

const FIELD_COUNT: usize = 4;

/// Record separator used by a statistics file
pub fn detect_separator(input: &[u8]) -> u8 {
    if input.contains(&0) {
        0
    } else {
        b'\n'
    }
}

fn is_field(field: &[u8]) -> bool {
    field == b"NA" || (!field.is_empty() && field.iter().all(u8::is_ascii_digit))
}

/// Split a record into its quoted path and validate the trailing fields
fn record_path(record: &[u8]) -> Option<&[u8]> {
    let mut parts = record.rsplitn(FIELD_COUNT + 1, |&b| b == b' ');
    for _ in 0..FIELD_COUNT {
        if !is_field(parts.next()?) {
            return None;
        }
    }
    parts.next().filter(|path| !path.is_empty())
}

/// Drops statistics records of deleted names
pub struct StatsRewriter<'s> {
    set: &'s DeletionSet,
}

impl<'s> StatsRewriter<'s> {
    pub fn new(set: &'s DeletionSet) -> Self {
        Self { set }
    }
}

impl RecordRewriter for StatsRewriter<'_> {
    fn rewrite(&self, input: &[u8]) -> Result<RewriteOutcome, ParseError> {
        let sep = detect_separator(input);
        let mut out = Vec::with_capacity(input.len());
        let mut removed = 0;

        for (idx, raw) in lines_with_terminator(input, sep).enumerate() {
            let record = trim_terminator(raw, sep);
            if record.starts_with(b"#") {
                out.extend_from_slice(raw);
                continue;
            }
            let quoted = record_path(record)
                .ok_or_else(|| ParseError::new(idx + 1, "expected a path followed by four numeric fields"))?;
            let name = ArchiveName::from_quoted(quoted)
                .ok_or_else(|| ParseError::new(idx + 1, "invalid escape sequence in path"))?;
            if self.set.covers(&name) {
                removed += 1;
            } else {
                out.extend_from_slice(raw);
            }
        }

        if removed == 0 {
            return Ok(RewriteOutcome::Unchanged);
        }
        Ok(RewriteOutcome::Changed { content: out, removed })
    }
}
