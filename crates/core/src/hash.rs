//! BLAKE3 content hash guarding a confirmed plan

use crate::error::{PruneError, Result};
use std::path::Path;

/// Content hash of a plan file (32 bytes)
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct PlanHash([u8; 32]);

impl PlanHash {
    /// Create a new PlanHash from bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        const HEX_CHARS: &[u8] = b"0123456789abcdef";
        let mut hex = String::with_capacity(64);
        for &byte in &self.0 {
            hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
            hex.push(HEX_CHARS[(byte & 0xf) as usize] as char);
        }
        hex
    }

    /// Short prefix shown to the user next to the confirmation prompt
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl std::fmt::Debug for PlanHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlanHash({})", self.to_hex())
    }
}

impl std::fmt::Display for PlanHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash bytes using BLAKE3
pub fn hash_bytes(data: &[u8]) -> PlanHash {
    PlanHash::from_bytes(*blake3::hash(data).as_bytes())
}

/// Hash a file using BLAKE3 (streaming)
pub fn hash_file(path: &Path) -> Result<PlanHash> {
    use std::fs::File;
    use std::io::{BufReader, Read};

    let context = || format!("failed to hash {}", path.display());
    let file = File::open(path).map_err(|e| PruneError::io(context(), e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| PruneError::io(context(), e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(PlanHash::from_bytes(*hasher.finalize().as_bytes()))
}
