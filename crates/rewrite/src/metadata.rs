//! Mirror metadata rewriting
//!
//! A mirror metadata stream is a sequence of blocks:
//!
//! ```text
//! File a/b
//!   Type reg
//!   NumHardLinks 2
//!   Inode 1234
//!   DeviceLoc 2049
//!   SHA1Digest 0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33
//! ```
//!
//! Hard links share one checksum, stored only on the first block of the
//! inode group. When that block is deleted its checksum is carried over to
//! the next surviving block with the same `(DeviceLoc, Inode)` key.

use crate::{lines_with_terminator, trim_terminator, ParseError, RecordRewriter, RewriteOutcome};
use ahash::AHashMap;
use prune_core::{ArchiveName, DeletionSet};
use tracing::debug;

const HEADER: &[u8] = b"File";
const INDENT: &[u8] = b"  ";
const INODE: &[u8] = b"Inode";
const DEVICE_LOC: &[u8] = b"DeviceLoc";
const CHECKSUM: &[u8] = b"SHA1Digest";

/// One `  Name value` line
#[derive(Debug, Clone, Copy)]
struct Attr<'a> {
    name: &'a [u8],
    value: &'a [u8],
    /// Raw line including its terminator
    raw: &'a [u8],
}

/// A header line with its attribute lines
#[derive(Debug)]
struct Block<'a> {
    name: ArchiveName,
    header: &'a [u8],
    attrs: Vec<Attr<'a>>,
}

impl<'a> Block<'a> {
    fn attr(&self, name: &[u8]) -> Option<&'a [u8]> {
        self.attrs.iter().find(|a| a.name == name).map(|a| a.value)
    }

    fn inode_key(&self) -> Option<(&'a [u8], &'a [u8])> {
        Some((self.attr(DEVICE_LOC)?, self.attr(INODE)?))
    }

    /// Index of whichever of `Inode`/`DeviceLoc` comes last
    fn inode_key_end(&self) -> Option<usize> {
        self.attrs
            .iter()
            .rposition(|a| a.name == INODE || a.name == DEVICE_LOC)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.header);
        for attr in &self.attrs {
            out.extend_from_slice(attr.raw);
        }
    }

    fn write_with_checksum(&self, out: &mut Vec<u8>, after: usize, checksum: &[u8]) {
        out.extend_from_slice(self.header);
        for (i, attr) in self.attrs.iter().enumerate() {
            out.extend_from_slice(attr.raw);
            if i == after {
                if out.last() != Some(&b'\n') {
                    out.push(b'\n');
                }
                out.extend_from_slice(INDENT);
                out.extend_from_slice(CHECKSUM);
                out.push(b' ');
                out.extend_from_slice(checksum);
                out.push(b'\n');
            }
        }
    }
}

/// Parse a whole stream into blocks
fn parse_blocks(input: &[u8]) -> Result<Vec<Block<'_>>, ParseError> {
    let mut blocks: Vec<Block<'_>> = Vec::new();
    for (idx, raw) in lines_with_terminator(input, b'\n').enumerate() {
        let line_no = idx + 1;
        let line = trim_terminator(raw, b'\n');

        if let Some(attr) = line.strip_prefix(INDENT) {
            let Some(block) = blocks.last_mut() else {
                return Err(ParseError::new(line_no, "attribute line before any File header"));
            };
            let (name, value) = match attr.iter().position(|&b| b == b' ') {
                Some(pos) => (&attr[..pos], &attr[pos + 1..]),
                None => (attr, &attr[attr.len()..]),
            };
            if name.is_empty() {
                return Err(ParseError::new(line_no, "empty attribute name"));
            }
            block.attrs.push(Attr { name, value, raw });
            continue;
        }

        let quoted = match line.strip_prefix(HEADER).and_then(|rest| rest.strip_prefix(b" ")) {
            Some(quoted) => quoted,
            None if line == HEADER => &line[line.len()..],
            None => return Err(ParseError::new(line_no, "expected a File header or an indented attribute")),
        };
        if quoted.is_empty() {
            return Err(ParseError::new(line_no, "File header without a path"));
        }
        let name = ArchiveName::from_quoted(quoted)
            .ok_or_else(|| ParseError::new(line_no, "invalid escape sequence in path"))?;
        blocks.push(Block {
            name,
            header: raw,
            attrs: Vec::new(),
        });
    }
    Ok(blocks)
}

/// Checksums of deleted blocks, waiting for a surviving hard link
///
/// Lives for the rewrite of a single file. Keys are `(DeviceLoc, Inode)`.
#[derive(Debug, Default)]
pub struct InodeChecksumTable<'a> {
    pending: AHashMap<(&'a [u8], &'a [u8]), &'a [u8]>,
}

impl<'a> InodeChecksumTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a checksum; a later deleted block with the same key replaces it
    pub fn record(&mut self, key: (&'a [u8], &'a [u8]), checksum: &'a [u8]) {
        self.pending.insert(key, checksum);
    }

    /// Hand out a pending checksum at most once
    pub fn take(&mut self, key: (&'a [u8], &'a [u8])) -> Option<&'a [u8]> {
        self.pending.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Drops `File` blocks of deleted names
pub struct MetadataRewriter<'s> {
    set: &'s DeletionSet,
}

impl<'s> MetadataRewriter<'s> {
    pub fn new(set: &'s DeletionSet) -> Self {
        Self { set }
    }
}

impl RecordRewriter for MetadataRewriter<'_> {
    fn rewrite(&self, input: &[u8]) -> Result<RewriteOutcome, ParseError> {
        let blocks = parse_blocks(input)?;
        let mut table = InodeChecksumTable::new();
        let mut out = Vec::with_capacity(input.len());
        let mut removed = 0;

        for block in &blocks {
            if self.set.covers(&block.name) {
                removed += 1;
                if let (Some(key), Some(checksum)) = (block.inode_key(), block.attr(CHECKSUM)) {
                    table.record(key, checksum);
                }
                continue;
            }

            let pending = match block.inode_key() {
                Some(key) if block.attr(CHECKSUM).is_none() => table.take(key),
                _ => None,
            };
            match (pending, block.inode_key_end()) {
                (Some(checksum), Some(after)) => {
                    debug!("Forwarding checksum to hard link {}", block.name);
                    block.write_with_checksum(&mut out, after, checksum);
                }
                _ => block.write(&mut out),
            }
        }

        if !table.is_empty() {
            debug!("{} checksums had no surviving hard link", table.len());
        }
        if removed == 0 {
            return Ok(RewriteOutcome::Unchanged);
        }
        Ok(RewriteOutcome::Changed { content: out, removed })
    }
}
