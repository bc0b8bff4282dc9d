//! # Functions
//!
//! A function owns its registers (ordered inputs, outputs, then everything
//! else), the buses it calls through, and its instruction stream.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bus::Bus;
use crate::config::FieldConfig;
use crate::error::SpecError;
use crate::instruction::Instruction;
use crate::register::{Register, RegisterId, RegisterKind};
use crate::validation::Context;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    name: String,
    registers: Vec<Register>,
    buses: Vec<Bus>,
    code: Vec<Instruction>,
}

impl Function {
    /// Create a function, checking that registers are ordered inputs,
    /// outputs, then everything else.
    pub fn new(
        name: impl Into<String>,
        registers: Vec<Register>,
        buses: Vec<Bus>,
        code: Vec<Instruction>,
    ) -> Result<Self, SpecError> {
        let function = Self {
            name: name.into(),
            registers,
            buses,
            code,
        };
        function.check_register_order()?;
        Ok(function)
    }

    pub(crate) fn check_register_order(&self) -> Result<(), SpecError> {
        let rank = |kind: RegisterKind| match kind {
            RegisterKind::Input => 0,
            RegisterKind::Output => 1,
            RegisterKind::Temporary | RegisterKind::Constant => 2,
        };
        let ordered = self
            .registers
            .windows(2)
            .all(|w| rank(w[0].kind()) <= rank(w[1].kind()));
        if !ordered {
            return Err(SpecError::RegisterOrder {
                function: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn instruction(&self, pc: usize) -> Option<&Instruction> {
        self.code.get(pc)
    }

    /// Bus with the given global identifier
    pub fn bus(&self, id: usize) -> Option<&Bus> {
        self.buses.iter().find(|b| b.id() == Some(id))
    }

    pub fn num_inputs(&self) -> usize {
        self.registers.iter().take_while(|r| r.is_input()).count()
    }

    pub fn num_outputs(&self) -> usize {
        self.registers[self.num_inputs()..]
            .iter()
            .take_while(|r| r.is_output())
            .count()
    }

    pub fn inputs(&self) -> &[Register] {
        &self.registers[..self.num_inputs()]
    }

    pub fn outputs(&self) -> &[Register] {
        let start = self.num_inputs();
        &self.registers[start..start + self.num_outputs()]
    }

    /// Ids of the output registers, in declaration order
    pub fn output_ids(&self) -> impl Iterator<Item = RegisterId> {
        let start = self.num_inputs();
        (start..start + self.num_outputs()).map(RegisterId::new)
    }

    /// True iff the body is exactly one instruction, which lets constraint
    /// generation drop the program counter column.
    pub fn is_atomic(&self) -> bool {
        self.code.len() == 1
    }

    pub fn register_id(&self, name: &str) -> Option<RegisterId> {
        self.registers
            .iter()
            .position(|r| r.name() == name)
            .map(RegisterId::new)
    }

    /// Validate every instruction against `field`
    pub fn validate(&self, field: &FieldConfig) -> Result<(), SpecError> {
        field.validate()?;
        self.check_register_order()?;
        let ctx = Context::new(field, &self.registers, &self.buses, self.code.len());
        for (pc, instruction) in self.code.iter().enumerate() {
            instruction
                .validate(&ctx)
                .map_err(|source| SpecError::Validation {
                    function: self.name.clone(),
                    instruction: pc,
                    source,
                })?;
        }
        Ok(())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fn {}", self.name)?;
        for reg in &self.registers {
            writeln!(f, "  {reg}")?;
        }
        for bus in &self.buses {
            let id = bus.id().map_or_else(|| "?".to_string(), |id| id.to_string());
            writeln!(f, "  bus {} #{}", bus.name(), id)?;
        }
        for (pc, instruction) in self.code.iter().enumerate() {
            writeln!(f, "  {pc}: {}", instruction.display(&self.registers))?;
        }
        Ok(())
    }
}
