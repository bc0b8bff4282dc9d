//! Execution state for one function call

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};
use zkasm_spec::register::{name_of, width_of};
use zkasm_spec::{Bus, Register, RegisterId};

use crate::error::{Result, RuntimeError};
use crate::io::IoBus;

fn mask(width: usize) -> BigUint {
    (BigUint::one() << width) - BigUint::one()
}

/// `width` bits of `value` starting at bit `offset`.
///
/// With `sign == false` the value stands for a negative number in two's
/// complement, so every bit at or above `value.bits()` reads as one.
pub fn read_bit_slice(offset: usize, width: usize, value: &BigUint, sign: bool) -> BigUint {
    let mut slice = (value >> offset) & mask(width);
    let len = value.bits() as usize;
    if !sign && offset + width > len {
        let start = len.saturating_sub(offset);
        slice |= mask(width) ^ mask(start);
    }
    slice
}

/// Register values plus the I/O boundary of a running function
pub struct State<'a> {
    pc: usize,
    terminated: bool,
    values: Vec<BigUint>,
    registers: &'a [Register],
    io: &'a dyn IoBus,
}

impl<'a> State<'a> {
    /// Fresh state with every register holding its pad value
    pub fn new(registers: &'a [Register], io: &'a dyn IoBus) -> Self {
        Self {
            pc: 0,
            terminated: false,
            values: registers.iter().map(|r| r.pad().clone()).collect(),
            registers,
            io,
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Move to instruction `pc`; the `RETURN` and `FAIL` sentinels end the call
    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
        self.terminated = pc == zkasm_spec::RETURN || pc == zkasm_spec::FAIL;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn registers(&self) -> &'a [Register] {
        self.registers
    }

    pub fn values(&self) -> &[BigUint] {
        &self.values
    }

    /// Value of `id`; unused or unknown registers read as zero
    pub fn load(&self, id: RegisterId) -> BigUint {
        self.values.get(id.index()).cloned().unwrap_or_default()
    }

    pub fn store(&mut self, id: RegisterId, value: BigUint) -> Result<()> {
        if !id.is_used() {
            return Ok(());
        }
        let Some(register) = self.registers.get(id.index()) else {
            return Err(RuntimeError::WidthViolation {
                register: name_of(self.registers, id),
                width: 0,
                value,
            });
        };
        if !register.fits(&value) {
            return Err(RuntimeError::WidthViolation {
                register: register.name().to_string(),
                width: register.width(),
                value,
            });
        }
        self.values[id.index()] = value;
        Ok(())
    }

    /// Spread `value` over `targets`, least significant first. Negative
    /// values are written in two's complement and truncated to the targets;
    /// non-negative values must fit.
    pub fn store_across(&mut self, value: &BigInt, targets: &[RegisterId]) -> Result<()> {
        let negative = value.sign() == Sign::Minus;
        let magnitude = value.magnitude();
        let source = if negative {
            (BigUint::one() << (magnitude.bits() + 1)) - magnitude
        } else {
            magnitude.clone()
        };

        let mut offset = 0;
        for &target in targets {
            let width = width_of(self.registers, target);
            self.store(target, read_bit_slice(offset, width, &source, !negative))?;
            offset += width;
        }

        if !negative && !(&source >> offset).is_zero() {
            let names: Vec<String> = targets.iter().rev().map(|&t| name_of(self.registers, t)).collect();
            return Err(RuntimeError::WidthViolation {
                register: names.join(", "),
                width: offset,
                value: source,
            });
        }
        Ok(())
    }

    /// Read `bus` at the values of `address` and store the answer into
    /// `data`. Returns `false` when the other side rejected the request.
    pub fn transact(&mut self, bus: usize, address: &[RegisterId], data: &[RegisterId]) -> Result<bool> {
        let request: Vec<BigUint> = address.iter().map(|&a| self.load(a)).collect();
        let Some(response) = self.io.read(bus, &request)? else {
            return Ok(false);
        };
        if response.len() != data.len() {
            return Err(RuntimeError::BadResponse {
                bus,
                expected: data.len(),
                found: response.len(),
            });
        }
        for (&line, value) in data.iter().zip(response) {
            self.store(line, value)?;
        }
        Ok(true)
    }

    /// One read transaction on a declared bus
    pub fn bus_in(&mut self, bus: &Bus) -> Result<bool> {
        let id = linked(bus)?;
        self.transact(id, bus.address(), bus.data())
    }

    /// One write transaction on a declared bus
    pub fn bus_out(&mut self, bus: &Bus) -> Result<()> {
        let id = linked(bus)?;
        let address: Vec<BigUint> = bus.address().iter().map(|&a| self.load(a)).collect();
        let data: Vec<BigUint> = bus.data().iter().map(|&d| self.load(d)).collect();
        self.io.write(id, &address, &data)
    }
}

fn linked(bus: &Bus) -> Result<usize> {
    bus.id().ok_or(RuntimeError::UnlinkedBus {
        name: bus.name().to_string(),
    })
}
