//! Polynomial right-hand sides for `Assign`.
//!
//! A polynomial is a sum of monomials, each a non-negative coefficient times a
//! product of registers. The value of a polynomial is therefore always
//! non-negative, and its maximum is reached when every register holds its
//! maximum value.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::register::{name_of, Register, RegisterId};

/// `coefficient * vars[0] * vars[1] * ...`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Monomial {
    pub coefficient: BigUint,
    pub vars: Vec<RegisterId>,
}

impl Monomial {
    pub fn new(coefficient: impl Into<BigUint>, vars: Vec<RegisterId>) -> Self {
        Self {
            coefficient: coefficient.into(),
            vars,
        }
    }

    /// Largest value this monomial can take
    pub fn max_value(&self, registers: &[Register]) -> BigUint {
        self.vars.iter().fold(self.coefficient.clone(), |acc, id| {
            let max = registers
                .get(id.index())
                .map(Register::max_value)
                .unwrap_or_default();
            acc * max
        })
    }

    pub fn evaluate<F>(&self, load: &mut F) -> BigUint
    where
        F: FnMut(RegisterId) -> BigUint,
    {
        self.vars
            .iter()
            .fold(self.coefficient.clone(), |acc, &id| acc * load(id))
    }
}

/// Sum of monomials
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polynomial {
    terms: Vec<Monomial>,
}

impl Polynomial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_terms(terms: Vec<Monomial>) -> Self {
        Self { terms }
    }

    /// The polynomial `value`
    pub fn constant(value: impl Into<BigUint>) -> Self {
        Self::new().term(value, vec![])
    }

    /// The polynomial `id`
    pub fn var(id: RegisterId) -> Self {
        Self::new().term(1u32, vec![id])
    }

    /// Sum of the given registers
    pub fn sum(ids: &[RegisterId]) -> Self {
        ids.iter().fold(Self::new(), |p, &id| p.term(1u32, vec![id]))
    }

    /// Append `coefficient * vars`, dropping zero coefficients
    pub fn term(mut self, coefficient: impl Into<BigUint>, vars: Vec<RegisterId>) -> Self {
        self.push(Monomial::new(coefficient, vars));
        self
    }

    pub fn push(&mut self, monomial: Monomial) {
        if !monomial.coefficient.is_zero() {
            self.terms.push(monomial);
        }
    }

    pub fn terms(&self) -> &[Monomial] {
        &self.terms
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Registers mentioned, in order of first appearance
    pub fn registers(&self) -> Vec<RegisterId> {
        let mut seen = Vec::new();
        for id in self.terms.iter().flat_map(|t| t.vars.iter()) {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }

    pub fn max_value(&self, registers: &[Register]) -> BigUint {
        self.terms
            .iter()
            .map(|t| t.max_value(registers))
            .fold(BigUint::zero(), |acc, v| acc + v)
    }

    /// Number of bits needed to hold any value of this polynomial
    pub fn width(&self, registers: &[Register]) -> usize {
        self.max_value(registers).bits() as usize
    }

    pub fn evaluate<F>(&self, mut load: F) -> BigUint
    where
        F: FnMut(RegisterId) -> BigUint,
    {
        self.terms
            .iter()
            .fold(BigUint::zero(), |acc, t| acc + t.evaluate(&mut load))
    }

    pub fn display<'a>(&'a self, registers: &'a [Register]) -> PolynomialDisplay<'a> {
        PolynomialDisplay {
            poly: self,
            registers,
        }
    }
}

/// Renders a polynomial using register names
pub struct PolynomialDisplay<'a> {
    poly: &'a Polynomial,
    registers: &'a [Register],
}

impl fmt::Display for PolynomialDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.poly.is_zero() {
            return write!(f, "0");
        }
        for (i, term) in self.poly.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            let mut first = true;
            if !term.coefficient.is_one() || term.vars.is_empty() {
                write!(f, "{}", term.coefficient)?;
                first = false;
            }
            for var in &term.vars {
                if !first {
                    write!(f, "*")?;
                }
                write!(f, "{}", name_of(self.registers, *var))?;
                first = false;
            }
        }
        Ok(())
    }
}
