//! Runtime error types
//!
//! Rejections that belong to the program's domain (a failed cast, a zero
//! divisor, a callee that failed) are not errors; they end execution with
//! [`crate::Outcome::Failed`].

use num_bigint::BigUint;
use thiserror::Error;
use zkasm_spec::SpecError;
use zkasm_split::SplitError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Split error: {0}")]
    Split(#[from] SplitError),

    #[error("Value {value} does not fit {register} ({width} bits)")]
    WidthViolation {
        register: String,
        width: usize,
        value: BigUint,
    },

    #[error("{function} expects {expected} inputs, got {found}")]
    InputArity {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("Unknown bus {bus}")]
    UnknownBus { bus: usize },

    #[error("Bus {name} has no identifier")]
    UnlinkedBus { name: String },

    #[error("Step limit exceeded: {limit}")]
    StepLimit { limit: usize },

    #[error("Call depth limit exceeded: {limit}")]
    CallDepth { limit: usize },

    #[error("Invalid program counter: instruction {pc}, microcode {microcode}")]
    InvalidPc { pc: usize, microcode: usize },

    #[error("Bus {bus} answered {found} data lines, expected {expected}")]
    BadResponse {
        bus: usize,
        expected: usize,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
