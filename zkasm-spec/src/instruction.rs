//! # Instructions
//!
//! An instruction bundles microcodes that execute within a single cycle.
//! Control enters at microcode 0 and must leave through a `Jmp`, `Ret` or
//! `Fail`; running off the end of the bundle is a validation error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::code::Code;
use crate::register::{name_of, Register};
use crate::validation::{self, Context, ValidationError};
use crate::write_map::WriteMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    codes: Vec<Code>,
}

impl Instruction {
    pub fn new(codes: Vec<Code>) -> Self {
        Self { codes }
    }

    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn get(&self, offset: usize) -> Option<&Code> {
        self.codes.get(offset)
    }

    pub fn write_map(&self) -> WriteMap {
        WriteMap::new(&self.codes)
    }

    /// Validate every microcode, then the control flow and write
    /// conflicts of the bundle as a whole.
    pub fn validate(&self, ctx: &Context) -> Result<(), ValidationError> {
        if self.codes.is_empty() {
            return Err(ValidationError::EmptyInstruction);
        }

        for code in &self.codes {
            validation::validate(code, ctx)?;
        }

        let len = self.codes.len();
        for (offset, code) in self.codes.iter().enumerate() {
            for succ in code.successors(offset) {
                if succ == len && succ == offset + 1 {
                    return Err(ValidationError::FallsThrough { offset });
                }
                if succ >= len {
                    return Err(ValidationError::BranchOutOfBounds {
                        code: code.display(ctx.registers).to_string(),
                        offset,
                        target: succ,
                    });
                }
            }
        }

        let map = self.write_map();
        for (offset, code) in self.codes.iter().enumerate() {
            let Some(state) = map.get(offset) else {
                continue;
            };
            if let Some(read) = code.reads().into_iter().find(|&r| state.is_ambiguous(r)) {
                return Err(ValidationError::ConflictingRead {
                    code: code.display(ctx.registers).to_string(),
                    register: name_of(ctx.registers, read),
                    offset,
                });
            }
            if let Some(write) = code.writes().into_iter().find(|&w| state.maybe_written(w)) {
                return Err(ValidationError::ConflictingWrite {
                    code: code.display(ctx.registers).to_string(),
                    register: name_of(ctx.registers, write),
                    offset,
                });
            }
        }

        Ok(())
    }

    pub fn display<'a>(&'a self, registers: &'a [Register]) -> InstructionDisplay<'a> {
        InstructionDisplay {
            instruction: self,
            registers,
        }
    }
}

impl From<Vec<Code>> for Instruction {
    fn from(codes: Vec<Code>) -> Self {
        Self::new(codes)
    }
}

/// Renders an instruction as `code; code; ...`
pub struct InstructionDisplay<'a> {
    instruction: &'a Instruction,
    registers: &'a [Register],
}

impl fmt::Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, code) in self.instruction.codes.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", code.display(self.registers))?;
        }
        Ok(())
    }
}
