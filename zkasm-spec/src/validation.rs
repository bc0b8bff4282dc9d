//! Microcode validation
//!
//! Checks a single microcode against the registers and buses of its function:
//! - Bit-width accounting (rhs must fit the targets and the field)
//! - Target legality (no input writes, no duplicate targets)
//! - Subtraction pivot alignment
//! - Comparison operand widths
//! - Call shapes against the declared bus
//!
//! Errors carry the rendered microcode so callers can build diagnostics.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use thiserror::Error;

use crate::bus::Bus;
use crate::code::Code;
use crate::config::FieldConfig;
use crate::register::{name_of, width_of, Register, RegisterId};

/// Validation error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rhs wider than lhs ({rhs} > {lhs} bits) in \"{code}\"")]
    RhsWiderThanLhs { code: String, lhs: usize, rhs: usize },

    #[error("rhs wider than field ({rhs} > {field} bits) in \"{code}\"")]
    RhsWiderThanField { code: String, field: usize, rhs: usize },

    #[error("write to input register {register} in \"{code}\"")]
    InputRegisterWrite { code: String, register: String },

    #[error("register {register} written more than once in \"{code}\"")]
    DuplicateTarget { code: String, register: String },

    #[error("conflicting write to {register} at microcode {offset} (\"{code}\")")]
    ConflictingWrite {
        code: String,
        register: String,
        offset: usize,
    },

    #[error("ambiguous read of {register} at microcode {offset} (\"{code}\")")]
    ConflictingRead {
        code: String,
        register: String,
        offset: usize,
    },

    #[error("minuend does not align with targets in \"{code}\"")]
    MisalignedPivot { code: String },

    #[error("operand widths differ ({left} vs {right} bits) in \"{code}\"")]
    WidthMismatch { code: String, left: usize, right: usize },

    #[error("constant {constant} wider than {width} bits in \"{code}\"")]
    ConstantTooWide {
        code: String,
        constant: BigUint,
        width: usize,
    },

    #[error("unknown bus {bus} in \"{code}\"")]
    UnknownBus { code: String, bus: usize },

    #[error("argument mismatch in \"{code}\": {reason}")]
    ArgumentMismatch { code: String, reason: String },

    #[error("return mismatch in \"{code}\": {reason}")]
    ReturnMismatch { code: String, reason: String },

    #[error("branch at microcode {offset} targets {target} beyond instruction end (\"{code}\")")]
    BranchOutOfBounds {
        code: String,
        offset: usize,
        target: usize,
    },

    #[error("jump to instruction {target} out of bounds in \"{code}\"")]
    JumpOutOfBounds { code: String, target: usize },

    #[error("control falls through the end of the instruction after microcode {offset}")]
    FallsThrough { offset: usize },

    #[error("empty instruction")]
    EmptyInstruction,

    #[error("unknown register {index} in \"{code}\"")]
    UnknownRegister { code: String, index: usize },

    #[error("invalid cast width {width} in \"{code}\"")]
    InvalidCastWidth { code: String, width: usize },
}

/// Everything a microcode is validated against
#[derive(Clone, Copy, Debug)]
pub struct Context<'a> {
    pub field: &'a FieldConfig,
    pub registers: &'a [Register],
    pub buses: &'a [Bus],
    /// Number of instructions in the enclosing function
    pub instructions: usize,
}

impl<'a> Context<'a> {
    pub fn new(field: &'a FieldConfig, registers: &'a [Register], buses: &'a [Bus], instructions: usize) -> Self {
        Self {
            field,
            registers,
            buses,
            instructions,
        }
    }

    fn width(&self, id: RegisterId) -> usize {
        width_of(self.registers, id)
    }

    fn total_width(&self, ids: &[RegisterId]) -> usize {
        ids.iter().map(|&id| self.width(id)).sum()
    }

    fn max_value(&self, id: RegisterId) -> BigUint {
        self.registers
            .get(id.index())
            .map(Register::max_value)
            .unwrap_or_default()
    }
}

/// Validate a single microcode
pub fn validate(code: &Code, ctx: &Context) -> Result<(), ValidationError> {
    let text = || code.display(ctx.registers).to_string();

    for id in code.reads().into_iter().chain(code.writes()) {
        if id.index() >= ctx.registers.len() {
            return Err(ValidationError::UnknownRegister {
                code: text(),
                index: id.index(),
            });
        }
    }

    match code {
        Code::Assign { targets, .. } | Code::Add { targets, .. } | Code::Mul { targets, .. } => {
            check_target_registers(code, targets, ctx)?;
            let rhs = code.as_polynomial().unwrap_or_default().width(ctx.registers);
            check_rhs(code, ctx, ctx.total_width(targets), rhs)
        }

        Code::Sub {
            targets,
            sources,
            constant,
        } => {
            check_target_registers(code, targets, ctx)?;
            let Some((&minuend, subtrahends)) = sources.split_first() else {
                return Err(ValidationError::MisalignedPivot { code: text() });
            };
            let k = ctx.width(minuend);
            let pivot = sub_pivot(targets, ctx.registers, k)
                .ok_or_else(|| ValidationError::MisalignedPivot { code: text() })?;

            let subtracted = subtrahends
                .iter()
                .map(|&s| ctx.max_value(s))
                .fold(constant.clone(), |acc, v| acc + v);
            let borrow = max_borrow(&subtracted, k);
            let borrow_bits = borrow.bits() as usize;
            let high = ctx.total_width(&targets[pivot..]);
            if borrow_bits > high {
                return Err(ValidationError::RhsWiderThanLhs {
                    code: text(),
                    lhs: high,
                    rhs: borrow_bits,
                });
            }
            // minuend + borrow * 2^k bounds both sides of the rebalanced equation
            let rhs = (ctx.max_value(minuend) + (borrow << k)).bits() as usize;
            check_field(code, ctx, rhs)
        }

        Code::Cast {
            targets,
            source,
            width,
        } => {
            check_target_registers(code, targets, ctx)?;
            if *width > ctx.width(*source) {
                return Err(ValidationError::InvalidCastWidth {
                    code: text(),
                    width: *width,
                });
            }
            let capacity = ctx.total_width(targets);
            if *width > capacity {
                return Err(ValidationError::RhsWiderThanLhs {
                    code: text(),
                    lhs: capacity,
                    rhs: *width,
                });
            }
            check_field(code, ctx, *width)
        }

        Code::Division {
            quotient,
            remainder,
            witness,
            dividend,
            divisor,
        } => {
            let targets: Vec<RegisterId> = [*quotient, *remainder, *witness]
                .into_iter()
                .filter(|r| r.is_used())
                .collect();
            check_target_registers(code, &targets, ctx)?;
            check_rhs(code, ctx, ctx.width(*quotient), ctx.width(*dividend))?;
            check_rhs(code, ctx, ctx.width(*remainder), ctx.width(*divisor))?;
            if witness.is_used() {
                check_rhs(code, ctx, ctx.width(*witness), ctx.width(*divisor))?;
            }
            Ok(())
        }

        Code::Skip {
            left,
            right,
            constant,
            ..
        } => {
            let width = ctx.width(*left);
            if right.is_used() {
                let right_width = ctx.width(*right);
                if width != right_width {
                    return Err(ValidationError::WidthMismatch {
                        code: text(),
                        left: width,
                        right: right_width,
                    });
                }
            } else {
                check_constant(code, ctx, constant, width)?;
            }
            check_field(code, ctx, width)
        }

        Code::SkipIf {
            left,
            right,
            constant,
            ..
        } => {
            let width = ctx.total_width(left);
            if !right.is_empty() {
                let right_width = ctx.total_width(right);
                if width != right_width {
                    return Err(ValidationError::WidthMismatch {
                        code: text(),
                        left: width,
                        right: right_width,
                    });
                }
            } else {
                check_constant(code, ctx, constant, width)?;
            }
            check_field(code, ctx, width)
        }

        Code::Call {
            bus,
            targets,
            sources,
        } => {
            check_target_registers(code, targets, ctx)?;
            let decl = ctx
                .buses
                .iter()
                .find(|b| b.id() == Some(*bus))
                .ok_or_else(|| ValidationError::UnknownBus {
                    code: text(),
                    bus: *bus,
                })?;
            check_lines(ctx, sources, decl.address()).map_err(|reason| ValidationError::ArgumentMismatch {
                code: text(),
                reason,
            })?;
            check_lines(ctx, targets, decl.data()).map_err(|reason| ValidationError::ReturnMismatch {
                code: text(),
                reason,
            })
        }

        Code::Jmp { target } => {
            if *target >= ctx.instructions {
                return Err(ValidationError::JumpOutOfBounds {
                    code: text(),
                    target: *target,
                });
            }
            Ok(())
        }

        Code::Ret | Code::Fail => Ok(()),
    }
}

/// Rejects writes to input registers and targets that repeat a register.
pub fn check_target_registers(code: &Code, targets: &[RegisterId], ctx: &Context) -> Result<(), ValidationError> {
    for (i, &target) in targets.iter().enumerate() {
        if ctx.registers.get(target.index()).is_some_and(Register::is_input) {
            return Err(ValidationError::InputRegisterWrite {
                code: code.display(ctx.registers).to_string(),
                register: name_of(ctx.registers, target),
            });
        }
        if targets[..i].contains(&target) {
            return Err(ValidationError::DuplicateTarget {
                code: code.display(ctx.registers).to_string(),
                register: name_of(ctx.registers, target),
            });
        }
    }
    Ok(())
}

/// Index splitting `targets` into the low part (exactly `width` bits wide)
/// and the borrow part. `None` when no prefix of the targets has that width.
pub fn sub_pivot(targets: &[RegisterId], registers: &[Register], width: usize) -> Option<usize> {
    let mut acc = 0;
    if width == 0 {
        return Some(0);
    }
    for (i, &t) in targets.iter().enumerate() {
        acc += width_of(registers, t);
        if acc == width {
            return Some(i + 1);
        }
        if acc > width {
            return None;
        }
    }
    None
}

/// Largest borrow count when subtracting at most `subtracted` from a
/// `width`-bit minuend: ceil(subtracted / 2^width).
pub fn max_borrow(subtracted: &BigUint, width: usize) -> BigUint {
    if subtracted.is_zero() {
        return BigUint::zero();
    }
    ((subtracted - BigUint::one()) >> width) + BigUint::one()
}

fn check_rhs(code: &Code, ctx: &Context, lhs: usize, rhs: usize) -> Result<(), ValidationError> {
    if rhs > lhs {
        return Err(ValidationError::RhsWiderThanLhs {
            code: code.display(ctx.registers).to_string(),
            lhs,
            rhs,
        });
    }
    check_field(code, ctx, rhs)
}

fn check_field(code: &Code, ctx: &Context, rhs: usize) -> Result<(), ValidationError> {
    if rhs > ctx.field.bandwidth {
        return Err(ValidationError::RhsWiderThanField {
            code: code.display(ctx.registers).to_string(),
            field: ctx.field.bandwidth,
            rhs,
        });
    }
    Ok(())
}

fn check_constant(code: &Code, ctx: &Context, constant: &BigUint, width: usize) -> Result<(), ValidationError> {
    if constant.bits() as usize > width {
        return Err(ValidationError::ConstantTooWide {
            code: code.display(ctx.registers).to_string(),
            constant: constant.clone(),
            width,
        });
    }
    Ok(())
}

fn check_lines(ctx: &Context, actual: &[RegisterId], declared: &[RegisterId]) -> Result<(), String> {
    if actual.len() != declared.len() {
        return Err(format!("expected {} lines, found {}", declared.len(), actual.len()));
    }
    for (i, (&a, &d)) in actual.iter().zip(declared).enumerate() {
        let (aw, dw) = (ctx.width(a), ctx.width(d));
        if aw != dw {
            return Err(format!("line {i} is {aw} bits, bus expects {dw}"));
        }
    }
    Ok(())
}
