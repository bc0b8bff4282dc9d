//! # Error Types for the zkasm model

use num_bigint::BigUint;
use thiserror::Error;

use crate::config::ConfigError;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum SpecError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    // Artifact format errors
    #[error("Invalid artifact magic: expected 0x5A4B4153, got {0:#010x}")]
    InvalidMagic(u32),

    #[error("Invalid artifact version: expected {expected:#010x}, found {found:#010x}")]
    InvalidVersion { expected: u32, found: u32 },

    #[error("Truncated artifact: expected {expected} bytes, found {found} bytes")]
    Truncated { expected: usize, found: usize },

    #[error("Artifact checksum mismatch")]
    ChecksumMismatch,

    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    // Model errors
    #[error("Padding {pad} of register {register} does not fit in {width} bits")]
    InvalidPadding {
        register: String,
        pad: BigUint,
        width: usize,
    },

    #[error("Registers of {function} are not ordered inputs, outputs, others")]
    RegisterOrder { function: String },

    #[error("{function}: instruction {instruction}: {source}")]
    Validation {
        function: String,
        instruction: usize,
        #[source]
        source: ValidationError,
    },
}

impl SpecError {
    /// Whether this error was raised while decoding an artifact
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            SpecError::InvalidMagic(_)
                | SpecError::InvalidVersion { .. }
                | SpecError::Truncated { .. }
                | SpecError::ChecksumMismatch
                | SpecError::Encoding(_)
        )
    }
}
