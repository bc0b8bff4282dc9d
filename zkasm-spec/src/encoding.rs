//! # Binary Artifact Format
//!
//! Compiled functions are cached as a fixed header followed by a bincode
//! payload. The format is internal to this toolchain.
//!
//! ```text
//! Offset  Size  Field
//! ──────────────────────────────────
//! 0x00    4     magic ("ZKAS")
//! 0x04    4     version
//! 0x08    8     payload length
//! 0x10    32    SHA-256 of the payload
//! 0x30    ...   payload
//! ```

use sha2::{Digest, Sha256};

use crate::error::SpecError;
use crate::function::Function;

/// Magic number for artifacts: "ZKAS" = 0x5A4B4153
pub const MAGIC: u32 = 0x5A4B4153;

/// Version: v1.0 = 0x00010000
pub const VERSION: u32 = 0x00010000;

/// Header size in bytes
pub const HEADER_SIZE: usize = 48;

fn checksum(payload: &[u8]) -> [u8; 32] {
    Sha256::digest(payload).into()
}

impl Function {
    /// Serialize to an artifact
    pub fn to_bytes(&self) -> Result<Vec<u8>, SpecError> {
        let payload = bincode::serialize(self)?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&checksum(&payload));
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Deserialize from an artifact, verifying its header first
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpecError> {
        if bytes.len() < HEADER_SIZE {
            return Err(SpecError::Truncated {
                expected: HEADER_SIZE,
                found: bytes.len(),
            });
        }

        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        let magic = word(0);
        if magic != MAGIC {
            return Err(SpecError::InvalidMagic(magic));
        }

        let version = word(4);
        if version != VERSION {
            return Err(SpecError::InvalidVersion {
                expected: VERSION,
                found: version,
            });
        }

        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[8..16]);
        let len = u64::from_le_bytes(len) as usize;
        let payload = &bytes[HEADER_SIZE..];
        if payload.len() != len {
            return Err(SpecError::Truncated {
                expected: HEADER_SIZE.saturating_add(len),
                found: bytes.len(),
            });
        }

        if bytes[16..HEADER_SIZE] != checksum(payload) {
            return Err(SpecError::ChecksumMismatch);
        }

        let function: Function = bincode::deserialize(payload)?;
        function.check_register_order()?;
        Ok(function)
    }
}
