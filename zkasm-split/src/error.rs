//! Splitting pass error types

use thiserror::Error;
use zkasm_spec::SpecError;

/// Fatal failures of the splitting pass. There is no partial outcome: an
/// error means no split function was produced.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Division over multi-limb operands is not supported: \"{code}\"")]
    UnsupportedDivision { code: String },

    #[error("Subtraction has no target prefix as wide as its minuend: \"{code}\"")]
    MisalignedSubtraction { code: String },

    #[error("Comparison operands differ in width: \"{code}\"")]
    MisalignedComparison { code: String },

    #[error("Result overflows the most significant limb: \"{code}\"")]
    Overflow { code: String },

    #[error("Unknown register {0}")]
    UnknownRegister(usize),

    #[error("Split function is invalid: {0}")]
    Invalid(#[from] SpecError),
}

pub type Result<T> = std::result::Result<T, SplitError>;
