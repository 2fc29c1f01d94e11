//! Stream codec capability for `.gz` archive files

use crate::error::{PruneError, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compression codec used for archive files
pub trait Compressor: Send + Sync {
    /// Inflate a whole compressed file
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Deflate a whole file
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// gzip via flate2
#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: u32,
}

impl GzipCompressor {
    /// Create a codec with the given level (0-9)
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor for GzipCompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 4);
        MultiGzDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| PruneError::io("failed to decompress", e))?;
        Ok(out)
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| PruneError::io("failed to compress", e))?;
        encoder
            .finish()
            .map_err(|e| PruneError::io("failed to compress", e))
    }
}
