//! Function splitting pass

use zkasm_spec::{FieldConfig, Function};

use crate::allocator::RegisterAllocator;
use crate::error::Result;
use crate::instruction::split_instruction;

/// A split function together with the limb map that produced it
#[derive(Clone, Debug)]
pub struct SplitFunction {
    pub function: Function,
    pub allocator: RegisterAllocator,
}

/// Rewrite `function` over registers no wider than the field's register
/// width, then re-validate the result against `field`.
pub fn split_function(function: &Function, field: &FieldConfig) -> Result<Function> {
    Ok(split_with_limbs(function, field)?.function)
}

/// Like [`split_function`], also returning the limb map so callers can
/// translate values between the two forms.
pub fn split_with_limbs(function: &Function, field: &FieldConfig) -> Result<SplitFunction> {
    field.validate().map_err(zkasm_spec::SpecError::from)?;

    let registers = function.registers();
    let mut alloc = RegisterAllocator::new(registers, field.register_width)?;

    let mut code = Vec::with_capacity(function.code().len());
    for instruction in function.code() {
        code.push(split_instruction(instruction, registers, &mut alloc)?);
    }

    let mut buses = Vec::with_capacity(function.buses().len());
    for bus in function.buses() {
        // every line must be known before remapping
        alloc.flatten(&bus.address_data())?;
        buses.push(bus.map_lines(|line| alloc.limbs(line).map(<[_]>::to_vec).unwrap_or_default()));
    }

    tracing::debug!(
        "split {}: {} registers -> {} ({} allocated), {} microcodes -> {}",
        function.name(),
        registers.len(),
        alloc.registers().len(),
        alloc.num_allocated(),
        function.code().iter().map(|i| i.len()).sum::<usize>(),
        code.iter().map(|i| i.len()).sum::<usize>(),
    );

    let split = Function::new(function.name(), alloc.registers().to_vec(), buses, code)?;
    split.validate(field)?;

    Ok(SplitFunction {
        function: split,
        allocator: alloc,
    })
}
