//! # Microcode Catalogue
//!
//! The closed set of atomic operations an instruction is built from. Targets
//! are always listed least-significant first: a result wider than any single
//! target is spread across the target list, with the last target holding the
//! most significant bits. The textual form prints targets most-significant
//! first, e.g. `c, r0 = r1 + 1`.
//!
//! ## Control flow
//!
//! - `Skip` / `SkipIf`: on inequality advance by `1 + skip` microcodes,
//!   otherwise fall through by one.
//! - `Jmp`: leave the instruction, continuing at instruction `target`.
//! - `Ret` / `Fail`: leave the function, accepting or rejecting the input.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::polynomial::{Monomial, Polynomial};
use crate::register::{name_of, Register, RegisterId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Code {
    /// targets = polynomial
    Assign {
        targets: Vec<RegisterId>,
        rhs: Polynomial,
    },

    /// targets = sources[0] + sources[1] + ... + constant
    Add {
        targets: Vec<RegisterId>,
        sources: Vec<RegisterId>,
        constant: BigUint,
    },

    /// targets = sources[0] - sources[1] - ... - constant
    ///
    /// The targets split at the pivot: the low targets (as wide as
    /// `sources[0]`) receive the difference truncated to that width, the
    /// remaining targets receive the borrow count.
    Sub {
        targets: Vec<RegisterId>,
        sources: Vec<RegisterId>,
        constant: BigUint,
    },

    /// targets = sources[0] * sources[1] * ... * constant
    Mul {
        targets: Vec<RegisterId>,
        sources: Vec<RegisterId>,
        constant: BigUint,
    },

    /// targets = source, failing if source does not fit in `width` bits
    Cast {
        targets: Vec<RegisterId>,
        source: RegisterId,
        width: usize,
    },

    /// quotient, remainder = dividend / divisor, failing on a zero divisor.
    /// `witness` (or `UNUSED`) receives `divisor - remainder - 1`.
    Division {
        quotient: RegisterId,
        remainder: RegisterId,
        witness: RegisterId,
        dividend: RegisterId,
        divisor: RegisterId,
    },

    /// Skip if `left != right` (or `left != constant` when `right` is unused)
    Skip {
        left: RegisterId,
        right: RegisterId,
        constant: BigUint,
        skip: usize,
    },

    /// Vector form of `Skip`: both sides are packed least-significant first.
    /// An empty `right` compares against `constant`.
    SkipIf {
        left: Vec<RegisterId>,
        right: Vec<RegisterId>,
        constant: BigUint,
        skip: usize,
    },

    /// targets = bus(sources)
    Call {
        bus: usize,
        targets: Vec<RegisterId>,
        sources: Vec<RegisterId>,
    },

    Jmp {
        target: usize,
    },

    Ret,

    Fail,
}

impl Code {
    pub fn assign(targets: Vec<RegisterId>, rhs: Polynomial) -> Self {
        Code::Assign { targets, rhs }
    }

    pub fn add(targets: Vec<RegisterId>, sources: Vec<RegisterId>, constant: impl Into<BigUint>) -> Self {
        Code::Add {
            targets,
            sources,
            constant: constant.into(),
        }
    }

    pub fn sub(targets: Vec<RegisterId>, sources: Vec<RegisterId>, constant: impl Into<BigUint>) -> Self {
        Code::Sub {
            targets,
            sources,
            constant: constant.into(),
        }
    }

    pub fn mul(targets: Vec<RegisterId>, sources: Vec<RegisterId>, constant: impl Into<BigUint>) -> Self {
        Code::Mul {
            targets,
            sources,
            constant: constant.into(),
        }
    }

    pub fn cast(targets: Vec<RegisterId>, source: RegisterId, width: usize) -> Self {
        Code::Cast {
            targets,
            source,
            width,
        }
    }

    /// Register/register comparison
    pub fn skip(left: RegisterId, right: RegisterId, skip: usize) -> Self {
        Code::Skip {
            left,
            right,
            constant: BigUint::zero(),
            skip,
        }
    }

    /// Register/constant comparison
    pub fn skip_const(left: RegisterId, constant: impl Into<BigUint>, skip: usize) -> Self {
        Code::Skip {
            left,
            right: RegisterId::UNUSED,
            constant: constant.into(),
            skip,
        }
    }

    pub fn call(bus: usize, targets: Vec<RegisterId>, sources: Vec<RegisterId>) -> Self {
        Code::Call {
            bus,
            targets,
            sources,
        }
    }

    pub fn jmp(target: usize) -> Self {
        Code::Jmp { target }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Code::Assign { .. } => "assign",
            Code::Add { .. } => "add",
            Code::Sub { .. } => "sub",
            Code::Mul { .. } => "mul",
            Code::Cast { .. } => "cast",
            Code::Division { .. } => "div",
            Code::Skip { .. } => "skip",
            Code::SkipIf { .. } => "skip_if",
            Code::Call { .. } => "call",
            Code::Jmp { .. } => "jmp",
            Code::Ret => "ret",
            Code::Fail => "fail",
        }
    }

    /// Leaves the enclosing instruction unconditionally
    pub fn is_terminal(&self) -> bool {
        matches!(self, Code::Jmp { .. } | Code::Ret | Code::Fail)
    }

    /// Skip distance of a branch
    pub fn skip_distance(&self) -> Option<usize> {
        match self {
            Code::Skip { skip, .. } | Code::SkipIf { skip, .. } => Some(*skip),
            _ => None,
        }
    }

    /// Microcode offsets control may reach after executing this microcode at
    /// `offset`. Terminal microcodes have none.
    pub fn successors(&self, offset: usize) -> Vec<usize> {
        if self.is_terminal() {
            return vec![];
        }
        match self.skip_distance() {
            Some(skip) if skip > 0 => vec![offset + 1, offset + 1 + skip],
            _ => vec![offset + 1],
        }
    }

    /// Registers read by this microcode
    pub fn reads(&self) -> Vec<RegisterId> {
        let mut reads = match self {
            Code::Assign { rhs, .. } => rhs.registers(),
            Code::Add { sources, .. } | Code::Sub { sources, .. } | Code::Mul { sources, .. } => {
                sources.clone()
            }
            Code::Cast { source, .. } => vec![*source],
            Code::Division {
                dividend, divisor, ..
            } => vec![*dividend, *divisor],
            Code::Skip { left, right, .. } => vec![*left, *right],
            Code::SkipIf { left, right, .. } => left.iter().chain(right.iter()).copied().collect(),
            Code::Call { sources, .. } => sources.clone(),
            Code::Jmp { .. } | Code::Ret | Code::Fail => vec![],
        };
        reads.retain(|r| r.is_used());
        reads
    }

    /// Registers written by this microcode, least-significant first
    pub fn writes(&self) -> Vec<RegisterId> {
        let mut writes = match self {
            Code::Assign { targets, .. }
            | Code::Add { targets, .. }
            | Code::Sub { targets, .. }
            | Code::Mul { targets, .. }
            | Code::Cast { targets, .. }
            | Code::Call { targets, .. } => targets.clone(),
            Code::Division {
                quotient,
                remainder,
                witness,
                ..
            } => vec![*quotient, *remainder, *witness],
            Code::Skip { .. } | Code::SkipIf { .. } | Code::Jmp { .. } | Code::Ret | Code::Fail => {
                vec![]
            }
        };
        writes.retain(|r| r.is_used());
        writes
    }

    /// Same microcode with every used register id rewritten by `f`
    pub fn map_registers<F>(&self, mut f: F) -> Code
    where
        F: FnMut(RegisterId) -> RegisterId,
    {
        let mut one = |id: RegisterId| if id.is_used() { f(id) } else { id };
        let mut code = self.clone();
        match &mut code {
            Code::Assign { targets, rhs } => {
                targets.iter_mut().for_each(|t| *t = one(*t));
                let terms = rhs
                    .terms()
                    .iter()
                    .map(|m| Monomial::new(m.coefficient.clone(), m.vars.iter().map(|&v| one(v)).collect()))
                    .collect();
                *rhs = Polynomial::from_terms(terms);
            }
            Code::Add { targets, sources, .. }
            | Code::Sub { targets, sources, .. }
            | Code::Mul { targets, sources, .. }
            | Code::Call { targets, sources, .. } => {
                targets.iter_mut().chain(sources.iter_mut()).for_each(|r| *r = one(*r));
            }
            Code::Cast { targets, source, .. } => {
                targets.iter_mut().for_each(|t| *t = one(*t));
                *source = one(*source);
            }
            Code::Division {
                quotient,
                remainder,
                witness,
                dividend,
                divisor,
            } => {
                for r in [quotient, remainder, witness, dividend, divisor] {
                    *r = one(*r);
                }
            }
            Code::Skip { left, right, .. } => {
                *left = one(*left);
                *right = one(*right);
            }
            Code::SkipIf { left, right, .. } => {
                left.iter_mut().chain(right.iter_mut()).for_each(|r| *r = one(*r));
            }
            Code::Jmp { .. } | Code::Ret | Code::Fail => {}
        }
        code
    }

    /// Equivalent polynomial for the sum and product forms
    pub fn as_polynomial(&self) -> Option<Polynomial> {
        match self {
            Code::Assign { rhs, .. } => Some(rhs.clone()),
            Code::Add {
                sources, constant, ..
            } => Some(Polynomial::sum(sources).term(constant.clone(), vec![])),
            Code::Mul {
                sources, constant, ..
            } => Some(Polynomial::new().term(constant.clone(), sources.clone())),
            _ => None,
        }
    }

    pub fn display<'a>(&'a self, registers: &'a [Register]) -> CodeDisplay<'a> {
        CodeDisplay {
            code: self,
            registers,
        }
    }
}

/// Renders a microcode using register names
pub struct CodeDisplay<'a> {
    code: &'a Code,
    registers: &'a [Register],
}

impl CodeDisplay<'_> {
    /// Targets, most significant first
    fn targets(&self, targets: &[RegisterId]) -> String {
        targets
            .iter()
            .rev()
            .map(|&t| name_of(self.registers, t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn vector(&self, regs: &[RegisterId]) -> String {
        regs.iter()
            .rev()
            .map(|&t| name_of(self.registers, t))
            .collect::<Vec<_>>()
            .join("::")
    }

    fn list(&self, regs: &[RegisterId]) -> String {
        regs.iter()
            .map(|&t| name_of(self.registers, t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn chain(&self, sources: &[RegisterId], op: &str, constant: &BigUint, identity: &BigUint) -> String {
        let mut parts: Vec<String> = sources.iter().map(|&s| name_of(self.registers, s)).collect();
        if constant != identity || parts.is_empty() {
            parts.push(constant.to_string());
        }
        parts.join(op)
    }
}

impl fmt::Display for CodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zero = BigUint::zero();
        let one = BigUint::one();
        match self.code {
            Code::Assign { targets, rhs } => {
                write!(f, "{} = {}", self.targets(targets), rhs.display(self.registers))
            }
            Code::Add {
                targets,
                sources,
                constant,
            } => write!(f, "{} = {}", self.targets(targets), self.chain(sources, " + ", constant, &zero)),
            Code::Sub {
                targets,
                sources,
                constant,
            } => write!(f, "{} = {}", self.targets(targets), self.chain(sources, " - ", constant, &zero)),
            Code::Mul {
                targets,
                sources,
                constant,
            } => write!(f, "{} = {}", self.targets(targets), self.chain(sources, " * ", constant, &one)),
            Code::Cast {
                targets,
                source,
                width,
            } => write!(
                f,
                "{} = (u{}) {}",
                self.targets(targets),
                width,
                name_of(self.registers, *source)
            ),
            Code::Division {
                quotient,
                remainder,
                witness,
                dividend,
                divisor,
            } => {
                write!(
                    f,
                    "{}, {}",
                    name_of(self.registers, *quotient),
                    name_of(self.registers, *remainder)
                )?;
                if witness.is_used() {
                    write!(f, ", {}", name_of(self.registers, *witness))?;
                }
                write!(
                    f,
                    " = {} / {}",
                    name_of(self.registers, *dividend),
                    name_of(self.registers, *divisor)
                )
            }
            Code::Skip {
                left,
                right,
                constant,
                skip,
            } => {
                let rhs = if right.is_used() {
                    name_of(self.registers, *right)
                } else {
                    constant.to_string()
                };
                write!(f, "skip {} != {} {}", name_of(self.registers, *left), rhs, skip)
            }
            Code::SkipIf {
                left,
                right,
                constant,
                skip,
            } => {
                let rhs = if right.is_empty() {
                    constant.to_string()
                } else {
                    self.vector(right)
                };
                write!(f, "skip_if {} != {} {}", self.vector(left), rhs, skip)
            }
            Code::Call {
                bus,
                targets,
                sources,
            } => write!(f, "call {} ({}) -> ({})", bus, self.list(sources), self.list(targets)),
            Code::Jmp { target } => write!(f, "jmp {target}"),
            Code::Ret => write!(f, "ret"),
            Code::Fail => write!(f, "fail"),
        }
    }
}
