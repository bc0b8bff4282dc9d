//! Microcode execution

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use zkasm_spec::register::width_of;
use zkasm_spec::validation::sub_pivot;
use zkasm_spec::{Code, RegisterId};

use crate::error::Result;
use crate::state::State;

/// Where control goes after one microcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Advance this many microcodes within the instruction
    Skip(usize),
    /// Leave the instruction for instruction `pc`
    Jump(usize),
    Return,
    Fail,
}

/// Registers packed least significant first
fn pack(state: &State, ids: &[RegisterId]) -> BigUint {
    let mut offset = 0;
    let mut acc = BigUint::zero();
    for &id in ids {
        acc += state.load(id) << offset;
        offset += width_of(state.registers(), id);
    }
    acc
}

fn branch(left: &BigUint, right: &BigUint, skip: usize) -> Step {
    if left != right {
        Step::Skip(1 + skip)
    } else {
        Step::Skip(1)
    }
}

/// Execute one microcode against `state`
pub fn execute(code: &Code, state: &mut State) -> Result<Step> {
    match code {
        Code::Assign { targets, rhs } => {
            let value = rhs.evaluate(|id| state.load(id));
            state.store_across(&BigInt::from(value), targets)?;
        }

        Code::Add {
            targets,
            sources,
            constant,
        } => {
            let value = sources
                .iter()
                .fold(constant.clone(), |acc, &id| acc + state.load(id));
            state.store_across(&BigInt::from(value), targets)?;
        }

        Code::Mul {
            targets,
            sources,
            constant,
        } => {
            let value = sources
                .iter()
                .fold(constant.clone(), |acc, &id| acc * state.load(id));
            state.store_across(&BigInt::from(value), targets)?;
        }

        Code::Sub {
            targets,
            sources,
            constant,
        } => {
            let (minuend, width) = match sources.first() {
                Some(&id) => (state.load(id), width_of(state.registers(), id)),
                None => (BigUint::zero(), 0),
            };
            let subtracted = sources
                .iter()
                .skip(1)
                .fold(constant.clone(), |acc, &id| acc + state.load(id));
            let pivot = sub_pivot(targets, state.registers(), width).unwrap_or(targets.len());

            let diff = BigInt::from(minuend) - BigInt::from(subtracted);
            state.store_across(&diff, &targets[..pivot])?;

            // borrow = ceil(-diff / 2^width) when the difference went negative
            let borrow = if diff < BigInt::zero() {
                let deficit = diff.magnitude();
                ((deficit - BigUint::one()) >> width) + BigUint::one()
            } else {
                BigUint::zero()
            };
            state.store_across(&BigInt::from(borrow), &targets[pivot..])?;
        }

        Code::Cast {
            targets,
            source,
            width,
        } => {
            let value = state.load(*source);
            if value.bits() as usize > *width {
                return Ok(Step::Fail);
            }
            state.store_across(&BigInt::from(value), targets)?;
        }

        Code::Division {
            quotient,
            remainder,
            witness,
            dividend,
            divisor,
        } => {
            let n = state.load(*dividend);
            let d = state.load(*divisor);
            if d.is_zero() {
                return Ok(Step::Fail);
            }
            let r = &n % &d;
            let q = &n / &d;
            let w = &d - &r - BigUint::one();
            state.store(*quotient, q)?;
            state.store(*remainder, r)?;
            state.store(*witness, w)?;
        }

        Code::Skip {
            left,
            right,
            constant,
            skip,
        } => {
            let l = state.load(*left);
            let r = if right.is_used() {
                state.load(*right)
            } else {
                constant.clone()
            };
            return Ok(branch(&l, &r, *skip));
        }

        Code::SkipIf {
            left,
            right,
            constant,
            skip,
        } => {
            let l = pack(state, left);
            let r = if right.is_empty() {
                constant.clone()
            } else {
                pack(state, right)
            };
            return Ok(branch(&l, &r, *skip));
        }

        Code::Call {
            bus,
            targets,
            sources,
        } => {
            if !state.transact(*bus, sources, targets)? {
                return Ok(Step::Fail);
            }
        }

        Code::Jmp { target } => return Ok(Step::Jump(*target)),
        Code::Ret => return Ok(Step::Return),
        Code::Fail => return Ok(Step::Fail),
    }
    Ok(Step::Skip(1))
}
