//! Instruction splitting and branch retargeting
//!
//! Each microcode expands into zero or more fragments. Branch fragments
//! remember where they must land in terms of the original instruction:
//! either the first fragment of an original microcode, or the shared `fail`
//! trailer appended after the last fragment. Once every expansion is known
//! the skip distances are recomputed from the new offsets.

use zkasm_spec::{Code, Instruction, Register};

use crate::allocator::RegisterAllocator;
use crate::error::Result;
use crate::{assign, cast, compare, division, sub};

/// Landing point of a branch fragment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Branch {
    /// First fragment of the original microcode at this offset
    Original(usize),
    /// The `fail` appended to the split instruction
    Trailer,
}

#[derive(Clone, Debug)]
pub(crate) struct Fragment {
    pub code: Code,
    pub branch: Option<Branch>,
}

impl Fragment {
    pub fn plain(code: Code) -> Self {
        Self { code, branch: None }
    }

    pub fn branch(code: Code, branch: Branch) -> Self {
        Self {
            code,
            branch: Some(branch),
        }
    }
}

fn plain(codes: Vec<Code>) -> Vec<Fragment> {
    codes.into_iter().map(Fragment::plain).collect()
}

/// Split one microcode found at `offset` of its instruction
fn split_code(
    code: &Code,
    offset: usize,
    registers: &[Register],
    alloc: &mut RegisterAllocator,
) -> Result<Vec<Fragment>> {
    // Microcodes over single-limb registers keep their form
    let mut single = true;
    for id in code.reads().into_iter().chain(code.writes()) {
        single &= alloc.try_limbs(id)?.len() == 1;
    }
    if single {
        let remapped = code.map_registers(|id| alloc.limbs(id).map_or(id, |limbs| limbs[0]));
        let fragment = match code.skip_distance() {
            Some(skip) => Fragment::branch(remapped, Branch::Original(offset + 1 + skip)),
            None => Fragment::plain(remapped),
        };
        return Ok(vec![fragment]);
    }

    match code {
        Code::Assign { .. } | Code::Add { .. } | Code::Mul { .. } => {
            Ok(plain(assign::split_polynomial(code, registers, alloc)?))
        }
        Code::Sub { .. } => Ok(plain(sub::split_sub(code, registers, alloc)?)),
        Code::Cast { .. } => cast::split_cast(code, registers, alloc),
        Code::Division { .. } => Ok(plain(vec![division::split_division(code, registers, alloc)?])),
        Code::Skip { .. } | Code::SkipIf { .. } => compare::split_compare(code, offset, registers, alloc),
        Code::Call {
            bus,
            targets,
            sources,
        } => Ok(plain(vec![Code::call(
            *bus,
            alloc.flatten(targets)?,
            alloc.flatten(sources)?,
        )])),
        // jump targets are instruction indices, which splitting preserves
        Code::Jmp { .. } | Code::Ret | Code::Fail => Ok(plain(vec![code.clone()])),
    }
}

fn set_skip(code: &mut Code, distance: usize) {
    if let Code::Skip { skip, .. } | Code::SkipIf { skip, .. } = code {
        *skip = distance;
    }
}

/// Split every microcode of `instruction` and retarget its branches
pub fn split_instruction(
    instruction: &Instruction,
    registers: &[Register],
    alloc: &mut RegisterAllocator,
) -> Result<Instruction> {
    let mut expansions = Vec::with_capacity(instruction.len());
    for (offset, code) in instruction.codes().iter().enumerate() {
        expansions.push(split_code(code, offset, registers, alloc)?);
    }

    // starts[i] is the new offset of original microcode i; starts[n] is the
    // end of the split body, where the trailer goes
    let mut starts = Vec::with_capacity(expansions.len() + 1);
    let mut end = 0;
    for expansion in &expansions {
        starts.push(end);
        end += expansion.len();
    }
    starts.push(end);

    let needs_trailer = expansions
        .iter()
        .flatten()
        .any(|f| f.branch == Some(Branch::Trailer));

    let mut codes = Vec::with_capacity(end + usize::from(needs_trailer));
    for fragment in expansions.into_iter().flatten() {
        let here = codes.len();
        let mut code = fragment.code;
        if let Some(branch) = fragment.branch {
            let target = match branch {
                Branch::Original(offset) => starts
                    .get(offset)
                    .copied()
                    .unwrap_or(end + offset.saturating_sub(instruction.len())),
                Branch::Trailer => end,
            };
            set_skip(&mut code, target.saturating_sub(here + 1));
        }
        codes.push(code);
    }
    if needs_trailer {
        codes.push(Code::Fail);
    }

    Ok(Instruction::new(codes))
}
