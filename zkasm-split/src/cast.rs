//! Splitting of `Cast`
//!
//! Source limbs that lie entirely above the cast width must be zero; each
//! gets a guard comparing it against zero that branches to the instruction's
//! `fail` trailer. Limbs entirely below the width are kept whole, and a limb
//! straddling the width becomes a single-limb cast that fails on its own.
//!
//! When every kept piece starts at a target limb wide enough to hold it, the
//! pieces are copied limb for limb and the remaining target limbs cleared.
//! Otherwise the pieces are re-chunked across the targets like the terms of
//! an `Assign`.

use zkasm_spec::{Code, Monomial, Polynomial, Register};

use crate::allocator::{Limb, RegisterAllocator};
use crate::assign::distribute;
use crate::error::{Result, SplitError};
use crate::instruction::{Branch, Fragment};

/// Source limb keeping its low `kept` bits
struct Piece {
    limb: Limb,
    kept: usize,
}

/// Target limb index for each piece, if every piece lines up with one
fn line_up(pieces: &[Piece], targets: &[Limb]) -> Option<Vec<usize>> {
    pieces
        .iter()
        .map(|p| {
            targets
                .iter()
                .position(|t| t.offset == p.limb.offset && t.width >= p.kept)
        })
        .collect()
}

pub(crate) fn split_cast(code: &Code, registers: &[Register], alloc: &mut RegisterAllocator) -> Result<Vec<Fragment>> {
    let Code::Cast {
        targets,
        source,
        width,
    } = code
    else {
        return Ok(vec![Fragment::plain(code.clone())]);
    };

    let source_limbs = alloc.register_limbs(*source)?;
    let target_limbs = alloc.layout(targets)?;

    let mut fragments = Vec::new();
    let mut pieces = Vec::new();
    for &limb in source_limbs.iter().filter(|l| l.width > 0) {
        let kept = width.saturating_sub(limb.offset).min(limb.width);
        if kept == 0 {
            fragments.push(Fragment::branch(Code::skip_const(limb.id, 0u32, 0), Branch::Trailer));
        } else {
            pieces.push(Piece { limb, kept });
        }
    }

    if let Some(slots) = line_up(&pieces, &target_limbs) {
        let mut covered = vec![false; target_limbs.len()];
        for (piece, &j) in pieces.iter().zip(&slots) {
            covered[j] = true;
            let target = target_limbs[j].id;
            let copy = if piece.kept == piece.limb.width {
                Code::assign(vec![target], Polynomial::var(piece.limb.id))
            } else {
                Code::cast(vec![target], piece.limb.id, piece.kept)
            };
            fragments.push(Fragment::plain(copy));
        }
        for (target, _) in target_limbs.iter().zip(&covered).filter(|(_, c)| !**c) {
            fragments.push(Fragment::plain(Code::assign(vec![target.id], Polynomial::new())));
        }
        return Ok(fragments);
    }

    let mut terms = Vec::with_capacity(pieces.len());
    for piece in &pieces {
        let mut id = piece.limb.id;
        if piece.kept < piece.limb.width {
            id = alloc.allocate("tmp", piece.kept);
            fragments.push(Fragment::plain(Code::cast(vec![id], piece.limb.id, piece.kept)));
        }
        terms.push((Monomial::new(1u32, vec![id]), piece.limb.offset));
    }
    let overflow = || SplitError::Overflow {
        code: code.display(registers).to_string(),
    };
    fragments.extend(
        distribute(terms, &target_limbs, alloc, overflow)?
            .into_iter()
            .map(Fragment::plain),
    );

    Ok(fragments)
}
