//! Splitting of `Skip` and `SkipIf`
//!
//! Two packed operands differ iff some aligned slice of them differs. The
//! limbs of both sides are grouped at every bit offset where both have a
//! limb boundary, and each group becomes one comparison branching to the
//! microcode the original comparison branched to. Groups of one limb per
//! side compare with `Skip`; wider groups pack their limbs with `SkipIf`.
//! Constants are chunked by the left operand's limb layout.

use num_bigint::BigUint;
use zkasm_spec::{Code, Register, RegisterId};

use crate::allocator::{chunk_at, Limb, RegisterAllocator};
use crate::error::{Result, SplitError};
use crate::instruction::{Branch, Fragment};

/// Split the comparison found at `offset` of its instruction
pub(crate) fn split_compare(
    code: &Code,
    offset: usize,
    registers: &[Register],
    alloc: &RegisterAllocator,
) -> Result<Vec<Fragment>> {
    // `right` is `None` when comparing against the constant
    let (left, right, constant, skip) = match code {
        Code::Skip {
            left,
            right,
            constant,
            skip,
        } => {
            let right = if right.is_used() {
                Some(alloc.layout(&[*right])?)
            } else {
                None
            };
            (alloc.layout(&[*left])?, right, constant, *skip)
        }
        Code::SkipIf {
            left,
            right,
            constant,
            skip,
        } => {
            let right = if right.is_empty() {
                None
            } else {
                Some(alloc.layout(right)?)
            };
            (alloc.layout(left)?, right, constant, *skip)
        }
        _ => return Ok(vec![Fragment::plain(code.clone())]),
    };
    let branch = Branch::Original(offset + 1 + skip);

    let Some(right) = right else {
        return Ok(compare_constant(&left, constant, branch));
    };

    let total = |limbs: &[Limb]| limbs.iter().map(|l| l.width).sum::<usize>();
    if total(&left) != total(&right) {
        return Err(SplitError::MisalignedComparison {
            code: code.display(registers).to_string(),
        });
    }

    Ok(common_groups(&left, &right)
        .into_iter()
        .map(|(l, r)| {
            let compare = if l.len() == 1 && r.len() == 1 {
                Code::skip(l[0], r[0], 0)
            } else {
                Code::SkipIf {
                    left: l,
                    right: r,
                    constant: BigUint::default(),
                    skip: 0,
                }
            };
            Fragment::branch(compare, branch)
        })
        .collect())
}

/// Limbs of two equally wide operands grouped at their shared boundaries.
/// Zero-width limbs always read as zero and are left out.
fn common_groups(left: &[Limb], right: &[Limb]) -> Vec<(Vec<RegisterId>, Vec<RegisterId>)> {
    let mut left = left.iter().filter(|l| l.width > 0);
    let mut right = right.iter().filter(|l| l.width > 0);

    let mut groups = Vec::new();
    let (mut group_l, mut group_r) = (Vec::new(), Vec::new());
    let (mut end_l, mut end_r) = (0, 0);
    loop {
        if end_l <= end_r {
            let Some(limb) = left.next() else { break };
            group_l.push(limb.id);
            end_l += limb.width;
        } else {
            let Some(limb) = right.next() else { break };
            group_r.push(limb.id);
            end_r += limb.width;
        }
        if end_l == end_r {
            groups.push((std::mem::take(&mut group_l), std::mem::take(&mut group_r)));
        }
    }
    groups
}

fn compare_constant(left: &[Limb], constant: &BigUint, branch: Branch) -> Vec<Fragment> {
    left.iter()
        .enumerate()
        .map(|(i, l)| Fragment::branch(Code::skip_const(l.id, chunk_at(constant, left, i), 0), branch))
        .collect()
}
