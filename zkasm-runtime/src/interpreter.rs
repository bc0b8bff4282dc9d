//! # Interpreter
//!
//! Runs a function from an input tuple until it returns or fails.
//!
//! Within an instruction execution starts at microcode 0 and advances by the
//! distance each microcode reports; `Jmp`, `Ret` and `Fail` leave the
//! instruction and set the program counter for the next one.

use num_bigint::BigUint;
use zkasm_spec::{Function, RegisterId, FAIL, RETURN};

use crate::error::{Result, RuntimeError};
use crate::execute::{execute, Step};
use crate::io::IoBus;
use crate::state::State;

/// Interpreter configuration
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Maximum number of microcodes executed before giving up
    pub max_steps: usize,

    /// Record a trace row per executed microcode
    pub trace: bool,

    /// Maximum nesting of calls served by a [`crate::Machine`]
    pub max_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            trace: false,
            max_depth: 128,
        }
    }
}

/// How a call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Reached `ret`; outputs are valid
    Returned,
    /// The input is outside the function's domain
    Failed,
}

/// Register values right after one microcode executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRow {
    pub instruction: usize,
    pub microcode: usize,
    pub values: Vec<BigUint>,
}

/// Result of one call
#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: Outcome,

    /// Output register values in declaration order, empty on failure
    pub outputs: Vec<BigUint>,

    /// Number of microcodes executed
    pub steps: usize,

    /// Execution trace (if tracing enabled)
    pub trace: Vec<TraceRow>,
}

impl Execution {
    pub fn is_returned(&self) -> bool {
        self.outcome == Outcome::Returned
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

pub struct Interpreter<'f> {
    function: &'f Function,
    config: InterpreterConfig,
}

impl<'f> Interpreter<'f> {
    pub fn new(function: &'f Function) -> Self {
        Self::with_config(function, InterpreterConfig::default())
    }

    pub fn with_config(function: &'f Function, config: InterpreterConfig) -> Self {
        Self { function, config }
    }

    pub fn function(&self) -> &'f Function {
        self.function
    }

    /// Execute the function on `inputs`, one value per input register
    pub fn run(&self, inputs: &[BigUint], io: &dyn IoBus) -> Result<Execution> {
        let f = self.function;
        if inputs.len() != f.num_inputs() {
            return Err(RuntimeError::InputArity {
                function: f.name().to_string(),
                expected: f.num_inputs(),
                found: inputs.len(),
            });
        }

        let mut state = State::new(f.registers(), io);
        for (i, value) in inputs.iter().enumerate() {
            state.store(RegisterId::new(i), value.clone())?;
        }

        let mut steps = 0;
        let mut trace = Vec::new();
        while !state.is_terminated() {
            let pc = state.pc();
            let instruction = f
                .instruction(pc)
                .ok_or(RuntimeError::InvalidPc { pc, microcode: 0 })?;

            let mut index = 0;
            let next = loop {
                let code = instruction
                    .get(index)
                    .ok_or(RuntimeError::InvalidPc { pc, microcode: index })?;
                if steps == self.config.max_steps {
                    tracing::warn!("{}: step limit {} reached at {}:{}", f.name(), steps, pc, index);
                    return Err(RuntimeError::StepLimit { limit: steps });
                }
                steps += 1;

                let step = execute(code, &mut state)?;
                tracing::trace!("{}:{} {} -> {:?}", pc, index, code.display(f.registers()), step);
                if self.config.trace {
                    trace.push(TraceRow {
                        instruction: pc,
                        microcode: index,
                        values: state.values().to_vec(),
                    });
                }

                match step {
                    Step::Skip(n) => index += n,
                    Step::Jump(target) => break target,
                    Step::Return => break RETURN,
                    Step::Fail => break FAIL,
                }
            };
            state.set_pc(next);
        }

        let (outcome, outputs) = if state.pc() == RETURN {
            (Outcome::Returned, f.output_ids().map(|id| state.load(id)).collect())
        } else {
            (Outcome::Failed, Vec::new())
        };

        Ok(Execution {
            outcome,
            outputs,
            steps,
            trace,
        })
    }
}
