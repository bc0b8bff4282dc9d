//! Splitting of `Division`
//!
//! Only single-limb operands are supported; the microcode is remapped onto
//! the limb registers unchanged.

use zkasm_spec::{Code, Register, RegisterId};

use crate::allocator::RegisterAllocator;
use crate::error::{Result, SplitError};

pub(crate) fn split_division(code: &Code, registers: &[Register], alloc: &RegisterAllocator) -> Result<Code> {
    let Code::Division {
        quotient,
        remainder,
        witness,
        dividend,
        divisor,
    } = code
    else {
        return Ok(code.clone());
    };

    let single = |id: RegisterId| -> Result<RegisterId> {
        if !id.is_used() {
            return Ok(id);
        }
        match alloc.try_limbs(id)? {
            [limb] => Ok(*limb),
            _ => Err(SplitError::UnsupportedDivision {
                code: code.display(registers).to_string(),
            }),
        }
    };

    Ok(Code::Division {
        quotient: single(*quotient)?,
        remainder: single(*remainder)?,
        witness: single(*witness)?,
        dividend: single(*dividend)?,
        divisor: single(*divisor)?,
    })
}
