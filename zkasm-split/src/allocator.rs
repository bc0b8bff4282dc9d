//! # Register Allocator / Limb Map
//!
//! Decomposes every register wider than the maximum width into limbs
//! (least-significant first, the top limb possibly narrower) and hands out
//! fresh carry, borrow and scratch registers while a function is split.
//!
//! Limb registers keep the kind of the register they came from, so the
//! split register list stays ordered inputs, outputs, then everything else.
//! Allocated registers are appended as temporaries and their ids never move.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use zkasm_spec::{Register, RegisterId};

use crate::error::{Result, SplitError};

/// One limb of a register (or of a packed register list)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limb {
    pub id: RegisterId,
    /// Bit offset of this limb's least significant bit
    pub offset: usize,
    pub width: usize,
}

/// `width` bits of `value` starting at bit `offset`
pub(crate) fn bit_slice(value: &BigUint, offset: usize, width: usize) -> BigUint {
    (value >> offset) & ((BigUint::one() << width) - BigUint::one())
}

/// Slice of `value` covered by `limbs[index]`; the last limb takes every
/// remaining high bit.
pub(crate) fn chunk_at(value: &BigUint, limbs: &[Limb], index: usize) -> BigUint {
    let limb = limbs[index];
    if index + 1 == limbs.len() {
        value >> limb.offset
    } else {
        bit_slice(value, limb.offset, limb.width)
    }
}

#[derive(Clone, Debug)]
pub struct RegisterAllocator {
    width: usize,
    limbs: Vec<Vec<RegisterId>>,
    registers: Vec<Register>,
    /// Number of limb registers; everything after was allocated
    base: usize,
}

impl RegisterAllocator {
    pub fn new(registers: &[Register], width: usize) -> Result<Self> {
        let width = width.max(1);
        let mut limbs = Vec::with_capacity(registers.len());
        let mut split = Vec::with_capacity(registers.len());

        for reg in registers {
            let count = if reg.width() <= width {
                1
            } else {
                reg.width().div_ceil(width)
            };
            let mut ids = Vec::with_capacity(count);
            for i in 0..count {
                let offset = i * width;
                let limb_width = width.min(reg.width() - offset.min(reg.width()));
                let name = if count == 1 {
                    reg.name().to_string()
                } else {
                    format!("{}'{}", reg.name(), i)
                };
                let limb = Register::new(reg.kind(), name, limb_width)
                    .with_padding(bit_slice(reg.pad(), offset, limb_width))?;
                ids.push(RegisterId::new(split.len()));
                split.push(limb);
            }
            limbs.push(ids);
        }

        Ok(Self {
            width,
            limbs,
            base: split.len(),
            registers: split,
        })
    }

    /// Maximum limb width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Limbs of an original register, least significant first
    pub fn limbs(&self, id: RegisterId) -> Option<&[RegisterId]> {
        self.limbs.get(id.index()).map(Vec::as_slice)
    }

    pub(crate) fn try_limbs(&self, id: RegisterId) -> Result<&[RegisterId]> {
        self.limbs(id).ok_or(SplitError::UnknownRegister(id.index()))
    }

    /// A register of the split list
    pub fn register(&self, id: RegisterId) -> Option<&Register> {
        self.registers.get(id.index())
    }

    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    pub fn into_registers(self) -> Vec<Register> {
        self.registers
    }

    /// Number of registers appended since construction
    pub fn num_allocated(&self) -> usize {
        self.registers.len() - self.base
    }

    /// Append a temporary of exactly `width` bits. A zero width allocates
    /// nothing and yields `RegisterId::UNUSED`.
    pub fn allocate(&mut self, prefix: &str, width: usize) -> RegisterId {
        if width == 0 {
            return RegisterId::UNUSED;
        }
        let id = RegisterId::new(self.registers.len());
        let name = format!("${}{}", prefix, self.num_allocated());
        self.registers.push(Register::temporary(name, width));
        id
    }

    fn limb_width(&self, id: RegisterId) -> usize {
        self.registers.get(id.index()).map_or(0, Register::width)
    }

    /// Limbs of `id` with offsets relative to the register
    pub fn register_limbs(&self, id: RegisterId) -> Result<Vec<Limb>> {
        self.layout(&[id])
    }

    /// Limbs of a packed register list, least significant first, with
    /// offsets relative to the whole list
    pub fn layout(&self, ids: &[RegisterId]) -> Result<Vec<Limb>> {
        let mut out = Vec::new();
        let mut offset = 0;
        for &id in ids {
            for &limb in self.try_limbs(id)? {
                let width = self.limb_width(limb);
                out.push(Limb { id: limb, offset, width });
                offset += width;
            }
        }
        Ok(out)
    }

    /// Limb ids of a register list, flattened
    pub fn flatten(&self, ids: &[RegisterId]) -> Result<Vec<RegisterId>> {
        let mut out = Vec::new();
        for &id in ids {
            out.extend_from_slice(self.try_limbs(id)?);
        }
        Ok(out)
    }

    /// Limb values of `value` stored in register `id`
    pub fn split_value(&self, id: RegisterId, value: &BigUint) -> Option<Vec<BigUint>> {
        let limbs = self.register_limbs(id).ok()?;
        Some(
            limbs
                .iter()
                .map(|l| bit_slice(value, l.offset, l.width))
                .collect(),
        )
    }

    /// Recombine limb values of register `id` (weighted sum, LSB first)
    pub fn join_values(&self, id: RegisterId, values: &[BigUint]) -> Option<BigUint> {
        let limbs = self.register_limbs(id).ok()?;
        if limbs.len() != values.len() {
            return None;
        }
        Some(
            limbs
                .iter()
                .zip(values)
                .fold(BigUint::zero(), |acc, (l, v)| acc + (v << l.offset)),
        )
    }
}
