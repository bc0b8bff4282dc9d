//! # zkasm core model
//!
//! Register machine description shared by the splitting pass and the
//! interpreter.
//!
//! ## Key Features
//! - Registers of arbitrary declared bit-width, with pad values
//! - Buses connecting call sites to other functions
//! - A closed microcode catalogue bundled into instructions
//! - Bit-width accounting against a configurable field
//! - Write-conflict analysis within an instruction
//! - Checksummed binary artifacts

pub mod bus;
pub mod code;
pub mod config;
pub mod encoding;
pub mod error;
pub mod function;
pub mod instruction;
pub mod polynomial;
pub mod register;
pub mod validation;
pub mod write_map;

pub use bus::Bus;
pub use code::Code;
pub use config::{ConfigError, FieldConfig};
pub use error::SpecError;
pub use function::Function;
pub use instruction::Instruction;
pub use polynomial::{Monomial, Polynomial};
pub use register::{Register, RegisterId, RegisterKind};
pub use validation::{Context, ValidationError};
pub use write_map::{WriteMap, WriteState};

/// Program counter after a successful return
pub const RETURN: usize = usize::MAX;

/// Program counter after the input was rejected
pub const FAIL: usize = usize::MAX - 1;
