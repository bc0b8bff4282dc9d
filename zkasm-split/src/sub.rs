//! Splitting of `Sub`
//!
//! A subtraction becomes a chain of limb-wise subtractions, one per limb of
//! the minuend. Stage `j` subtracts the subtrahend limbs starting at the same
//! offset, the matching constant chunk and the previous stage's borrow, and
//! writes the low target limb at that offset plus a borrow register sized to
//! exactly the largest borrow count the stage can produce. The final stage
//! writes its borrow into the original high targets.
//!
//! Summing the stages weighted by their offsets telescopes the borrows, so
//! the low limbs and the final borrow equal those of the unsplit form.
//!
//! Two layouts need an extra step:
//! - Subtrahend limbs lying above the minuend are whole multiples of the
//!   borrow unit. They are added to the final borrow with an `Assign` onto
//!   the high targets.
//! - Low targets split differently from the minuend receive the stage
//!   results through scratch registers, re-chunked with an `Assign`.

use num_traits::Zero;
use zkasm_spec::register::width_of;
use zkasm_spec::validation::{max_borrow, sub_pivot};
use zkasm_spec::{Code, Monomial, Register, RegisterId};

use crate::allocator::{chunk_at, RegisterAllocator};
use crate::assign::distribute;
use crate::error::{Result, SplitError};

pub(crate) fn split_sub(code: &Code, registers: &[Register], alloc: &mut RegisterAllocator) -> Result<Vec<Code>> {
    let Code::Sub {
        targets,
        sources,
        constant,
    } = code
    else {
        return Ok(vec![code.clone()]);
    };
    let misaligned = || SplitError::MisalignedSubtraction {
        code: code.display(registers).to_string(),
    };
    let overflow = || SplitError::Overflow {
        code: code.display(registers).to_string(),
    };

    let Some((&minuend, subtrahends)) = sources.split_first() else {
        return Err(misaligned());
    };
    let width = width_of(registers, minuend);
    let pivot = sub_pivot(targets, registers, width).ok_or_else(misaligned)?;

    let mut minuend_limbs = alloc.register_limbs(minuend)?;
    if width == 0 {
        minuend_limbs.truncate(1);
    }
    let low = alloc.layout(&targets[..pivot])?;
    let high = alloc.layout(&targets[pivot..])?;
    let aligned = low.len() == minuend_limbs.len()
        && low.iter().zip(&minuend_limbs).all(|(t, m)| t.width == m.width);

    let mut subtracted: Vec<Vec<RegisterId>> = vec![Vec::new(); minuend_limbs.len()];
    let mut above = Vec::new();
    for &s in subtrahends {
        for limb in alloc.register_limbs(s)? {
            if limb.width == 0 {
                continue;
            }
            if limb.offset >= width {
                above.push((Monomial::new(1u32, vec![limb.id]), limb.offset - width));
                continue;
            }
            let stage = minuend_limbs
                .iter()
                .position(|m| m.offset == limb.offset)
                .ok_or_else(misaligned)?;
            subtracted[stage].push(limb.id);
        }
    }

    let max_of = |alloc: &RegisterAllocator, id: RegisterId| {
        alloc
            .register(id)
            .map(Register::max_value)
            .unwrap_or_default()
    };

    let mut out = Vec::with_capacity(minuend_limbs.len());
    let mut scratch = Vec::new();
    let mut borrow = RegisterId::UNUSED;
    for (j, m) in minuend_limbs.iter().enumerate() {
        let last = j + 1 == minuend_limbs.len();
        let chunk = chunk_at(constant, &minuend_limbs, j);

        let mut stage_sources = vec![m.id];
        stage_sources.extend_from_slice(&subtracted[j]);
        if borrow.is_used() {
            stage_sources.push(borrow);
        }
        let most = stage_sources[1..]
            .iter()
            .map(|&s| max_of(alloc, s))
            .fold(chunk.clone(), |acc, v| acc + v);
        let borrow_bits = if most.is_zero() {
            0
        } else {
            max_borrow(&most, m.width).bits() as usize
        };

        let mut stage_targets = Vec::new();
        if width > 0 {
            if aligned {
                stage_targets.push(low[j].id);
            } else {
                let tmp = alloc.allocate("tmp", m.width);
                if tmp.is_used() {
                    stage_targets.push(tmp);
                    scratch.push((Monomial::new(1u32, vec![tmp]), m.offset));
                }
            }
        }

        if last && above.is_empty() {
            let capacity: usize = high.iter().map(|l| l.width).sum();
            if borrow_bits > capacity {
                return Err(overflow());
            }
            stage_targets.extend(high.iter().map(|l| l.id));
        } else {
            let next = alloc.allocate("borrow", borrow_bits);
            if next.is_used() {
                stage_targets.push(next);
            }
            borrow = next;
        }

        out.push(Code::Sub {
            targets: stage_targets,
            sources: stage_sources,
            constant: chunk,
        });
    }

    if !aligned {
        out.extend(distribute(scratch, &low, alloc, overflow)?);
    }
    if !above.is_empty() {
        if borrow.is_used() {
            above.push((Monomial::new(1u32, vec![borrow]), 0));
        }
        if high.is_empty() {
            return Err(overflow());
        }
        out.extend(distribute(above, &high, alloc, overflow)?);
    }

    Ok(out)
}
