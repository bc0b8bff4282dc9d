//! Register and register identifier definitions

use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SpecError;

/// Role a register plays within a function
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterKind {
    /// Supplied by the caller, never written
    Input,
    /// Returned to the caller
    Output,
    /// Scratch storage (including synthesized carries and borrows)
    Temporary,
    /// Holds its padding value for the whole execution
    Constant,
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterKind::Input => "input",
            RegisterKind::Output => "output",
            RegisterKind::Temporary => "temp",
            RegisterKind::Constant => "const",
        };
        write!(f, "{name}")
    }
}

/// Index of a register within its function, or the `UNUSED` sentinel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegisterId(usize);

impl RegisterId {
    /// Marks an operand slot that holds a constant instead of a register
    pub const UNUSED: Self = Self(usize::MAX);

    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_used(self) -> bool {
        self.0 != usize::MAX
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_used() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "_")
        }
    }
}

/// A logical register of arbitrary declared width
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Register {
    kind: RegisterKind,
    name: String,
    width: usize,
    pad: BigUint,
}

impl Register {
    /// Create a register padded with zero
    pub fn new(kind: RegisterKind, name: impl Into<String>, width: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            width,
            pad: BigUint::default(),
        }
    }

    pub fn input(name: impl Into<String>, width: usize) -> Self {
        Self::new(RegisterKind::Input, name, width)
    }

    pub fn output(name: impl Into<String>, width: usize) -> Self {
        Self::new(RegisterKind::Output, name, width)
    }

    pub fn temporary(name: impl Into<String>, width: usize) -> Self {
        Self::new(RegisterKind::Temporary, name, width)
    }

    /// Replace the padding value, which must fit within the register
    pub fn with_padding(mut self, pad: BigUint) -> Result<Self, SpecError> {
        if pad.bits() as usize > self.width {
            return Err(SpecError::InvalidPadding {
                register: self.name,
                pad,
                width: self.width,
            });
        }
        self.pad = pad;
        Ok(self)
    }

    #[inline]
    pub fn kind(&self) -> RegisterKind {
        self.kind
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn pad(&self) -> &BigUint {
        &self.pad
    }

    /// 2^width
    pub fn bound(&self) -> BigUint {
        BigUint::one() << self.width
    }

    /// 2^width - 1
    pub fn max_value(&self) -> BigUint {
        self.bound() - BigUint::one()
    }

    #[inline]
    pub fn is_input(&self) -> bool {
        self.kind == RegisterKind::Input
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        self.kind == RegisterKind::Output
    }

    /// Whether `value` can be stored without truncation
    pub fn fits(&self, value: &BigUint) -> bool {
        value.bits() as usize <= self.width
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} u{}", self.kind, self.name, self.width)
    }
}

/// Width of `id`, or zero when the id is unused or unknown
pub fn width_of(registers: &[Register], id: RegisterId) -> usize {
    if !id.is_used() {
        return 0;
    }
    registers.get(id.index()).map_or(0, Register::width)
}

/// Name of `id` for diagnostics
pub fn name_of(registers: &[Register], id: RegisterId) -> String {
    if !id.is_used() {
        return "_".to_string();
    }
    match registers.get(id.index()) {
        Some(reg) => reg.name().to_string(),
        None => format!("?{}", id.index()),
    }
}
