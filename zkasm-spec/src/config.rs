//! # Field Configuration
//!
//! Describes the proving field a program is compiled for. Two numbers matter
//! to the compiler:
//!
//! - **bandwidth**: how many bits a single field element can hold before
//!   arithmetic wraps around the modulus. Every right-hand side of a microcode
//!   must fit within it.
//! - **register width**: the widest register column the proving system
//!   accepts. Registers wider than this are split into limbs.

use std::fmt;

/// Field configuration for limb splitting and validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldConfig {
    /// Human readable field name
    pub name: &'static str,
    /// Usable bits per field element
    pub bandwidth: usize,
    /// Maximum register (column) width in bits
    pub register_width: usize,
}

impl FieldConfig {
    /// GF(251): tiny prime field, useful for exercising splitting
    pub const GF_251: Self = Self {
        name: "GF_251",
        bandwidth: 7,
        register_width: 3,
    };

    /// GF(8209): 14-bit prime field
    pub const GF_8209: Self = Self {
        name: "GF_8209",
        bandwidth: 13,
        register_width: 6,
    };

    /// KoalaBear (p = 2^31 - 2^24 + 1) with 16-bit registers
    pub const KOALABEAR_16: Self = Self {
        name: "KOALABEAR_16",
        bandwidth: 30,
        register_width: 16,
    };

    /// BLS12-377 scalar field
    pub const BLS12_377: Self = Self {
        name: "BLS12_377",
        bandwidth: 252,
        register_width: 160,
    };

    /// No field limits. Used to validate programs before splitting.
    pub const UNBOUNDED: Self = Self {
        name: "UNBOUNDED",
        bandwidth: usize::MAX,
        register_width: usize::MAX,
    };

    /// Create a new configuration with validation
    pub const fn new(
        name: &'static str,
        bandwidth: usize,
        register_width: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            name,
            bandwidth,
            register_width,
        };

        if register_width == 0 {
            return Err(ConfigError::ZeroRegisterWidth);
        }
        if register_width > bandwidth {
            return Err(ConfigError::RegisterWiderThanBand {
                register_width,
                bandwidth,
            });
        }

        Ok(config)
    }

    /// Whether this configuration imposes no width limits at all
    #[inline]
    pub const fn is_unbounded(&self) -> bool {
        self.bandwidth == usize::MAX
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.register_width == 0 {
            return Err(ConfigError::ZeroRegisterWidth);
        }
        if self.register_width > self.bandwidth {
            return Err(ConfigError::RegisterWiderThanBand {
                register_width: self.register_width,
                bandwidth: self.bandwidth,
            });
        }
        Ok(())
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self::BLS12_377
    }
}

impl fmt::Display for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            return write!(f, "{} {{ unbounded }}", self.name);
        }
        write!(
            f,
            "{} {{ bandwidth: {} bits, registers: {} bits }}",
            self.name, self.bandwidth, self.register_width,
        )
    }
}

/// Configuration error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("register width must be at least one bit")]
    ZeroRegisterWidth,

    #[error("register width {register_width} exceeds field bandwidth {bandwidth}")]
    RegisterWiderThanBand {
        register_width: usize,
        bandwidth: usize,
    },
}
