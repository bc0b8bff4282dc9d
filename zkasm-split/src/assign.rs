//! Splitting of `Assign`, `Add` and `Mul`
//!
//! The right-hand side is rewritten over limbs: every monomial expands into
//! the product of its variables' limbs, each product landing at the sum of
//! the limb offsets. Products are then distributed over one equation per
//! target limb. Equation `k` writes target limb `k` plus a carry register
//! sized to exactly the bits that do not fit; the carry is added to equation
//! `k + 1`. The last equation that receives any term writes all remaining
//! target limbs.

use num_bigint::BigUint;
use num_traits::Zero;
use zkasm_spec::{Code, Monomial, Polynomial, Register, RegisterId};

use crate::allocator::{bit_slice, Limb, RegisterAllocator};
use crate::error::{Result, SplitError};

/// Products of limbs with their bit shift
fn expand(monomial: &Monomial, alloc: &RegisterAllocator) -> Result<Vec<(Vec<RegisterId>, usize)>> {
    let mut products = vec![(Vec::new(), 0usize)];
    for &var in &monomial.vars {
        let limbs = alloc.register_limbs(var)?;
        let mut next = Vec::with_capacity(products.len() * limbs.len());
        for (vars, shift) in &products {
            // zero-width limbs always read as zero
            for limb in limbs.iter().filter(|l| l.width > 0) {
                let mut vars = vars.clone();
                vars.push(limb.id);
                next.push((vars, shift + limb.offset));
            }
        }
        products = next;
    }
    Ok(products)
}

pub(crate) fn split_polynomial(
    code: &Code,
    registers: &[Register],
    alloc: &mut RegisterAllocator,
) -> Result<Vec<Code>> {
    let (targets, rhs) = match (code, code.as_polynomial()) {
        (
            Code::Assign { targets, .. } | Code::Add { targets, .. } | Code::Mul { targets, .. },
            Some(rhs),
        ) => (targets, rhs),
        _ => return Ok(vec![code.clone()]),
    };

    let layout = alloc.layout(targets)?;
    let mut terms = Vec::new();
    for monomial in rhs.terms() {
        for (vars, shift) in expand(monomial, alloc)? {
            terms.push((Monomial::new(monomial.coefficient.clone(), vars), shift));
        }
    }
    distribute(terms, &layout, alloc, || SplitError::Overflow {
        code: code.display(registers).to_string(),
    })
}

/// Spread `terms` (each a monomial over split registers weighted by
/// `2^shift`) across the target limbs of `layout`, one equation per limb.
pub(crate) fn distribute(
    terms: Vec<(Monomial, usize)>,
    layout: &[Limb],
    alloc: &mut RegisterAllocator,
    overflow: impl Fn() -> SplitError,
) -> Result<Vec<Code>> {
    let Some(top) = layout.len().checked_sub(1) else {
        return Ok(vec![]);
    };

    let mut equations: Vec<Vec<Monomial>> = vec![Vec::new(); layout.len()];
    for (monomial, shift) in terms {
        let Monomial { coefficient, vars } = monomial;
        let anchor = layout.iter().rposition(|l| l.offset <= shift).unwrap_or(0);
        let mut remaining: BigUint = coefficient << (shift.saturating_sub(layout[anchor].offset));
        let mut k = anchor;
        while !remaining.is_zero() {
            if k == top {
                equations[k].push(Monomial::new(remaining, vars));
                break;
            }
            let chunk = bit_slice(&remaining, 0, layout[k].width);
            remaining >>= layout[k].width;
            if !chunk.is_zero() {
                equations[k].push(Monomial::new(chunk, vars.clone()));
            }
            k += 1;
        }
    }

    let last = equations.iter().rposition(|eq| !eq.is_empty()).unwrap_or(0);

    // An equation must not read a target limb already written by an
    // earlier equation; such limbs are copied to scratch registers first.
    let position = |id: RegisterId| layout.iter().position(|l| l.id == id);
    let mut copies: Vec<(RegisterId, RegisterId)> = Vec::new();
    for (k, equation) in equations.iter().enumerate().take(last + 1) {
        for var in equation.iter().flat_map(|m| m.vars.iter()) {
            let hazard = position(*var).is_some_and(|j| j < k);
            if hazard && !copies.iter().any(|(limb, _)| limb == var) {
                let width = alloc.register(*var).map_or(0, Register::width);
                copies.push((*var, alloc.allocate("tmp", width)));
            }
        }
    }
    let substitute = |id: RegisterId| {
        copies
            .iter()
            .find(|(limb, _)| *limb == id)
            .map_or(id, |(_, tmp)| *tmp)
    };

    let mut out: Vec<Code> = copies
        .iter()
        .map(|&(limb, tmp)| Code::assign(vec![tmp], Polynomial::var(limb)))
        .collect();

    let mut carry = RegisterId::UNUSED;
    for (k, equation) in equations.into_iter().enumerate().take(last + 1) {
        let mut rhs = Polynomial::new();
        for monomial in equation {
            let vars = monomial.vars.iter().map(|&v| substitute(v)).collect();
            rhs.push(Monomial::new(monomial.coefficient, vars));
        }
        if carry.is_used() {
            rhs.push(Monomial::new(1u32, vec![carry]));
        }
        let bits = rhs.width(alloc.registers());

        if k < last {
            let next = alloc.allocate("carry", bits.saturating_sub(layout[k].width));
            let mut limb_targets = vec![layout[k].id];
            if next.is_used() {
                limb_targets.push(next);
            }
            out.push(Code::assign(limb_targets, rhs));
            carry = next;
        } else {
            let capacity: usize = layout[k..].iter().map(|l| l.width).sum();
            if bits > capacity {
                return Err(overflow());
            }
            out.push(Code::assign(layout[k..].iter().map(|l| l.id).collect(), rhs));
        }
    }

    Ok(out)
}
