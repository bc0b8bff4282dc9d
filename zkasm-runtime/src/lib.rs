//! # zkasm runtime
//!
//! Executes zkasm functions, split or unsplit, from an input tuple to a
//! terminated state.
//!
//! ## Features
//!
//! - **Arbitrary width registers**: values are `BigUint`, stores are width checked
//! - **Domain failures**: `Cast` overflow, a zero divisor and a failing callee
//!   end the call with [`Outcome::Failed`]
//! - **Traces**: optional per-microcode register snapshots
//! - **Machine**: linked functions with a memoised call cache and parallel
//!   row evaluation
//!
//! ## Example
//!
//! ```rust,no_run
//! use num_bigint::BigUint;
//! use zkasm_runtime::{Interpreter, NoBus};
//! use zkasm_spec::{Code, Function, Instruction, Register, RegisterId};
//!
//! let f = Function::new(
//!     "inc",
//!     vec![Register::input("x", 8), Register::output("y", 9)],
//!     vec![],
//!     vec![Instruction::new(vec![
//!         Code::add(vec![RegisterId::new(1)], vec![RegisterId::new(0)], 1u32),
//!         Code::Ret,
//!     ])],
//! )
//! .unwrap();
//! let exec = Interpreter::new(&f).run(&[BigUint::from(255u32)], &NoBus).unwrap();
//! println!("outputs: {:?}", exec.outputs);
//! ```

pub mod error;
pub mod execute;
pub mod interpreter;
pub mod io;
pub mod machine;
pub mod state;

pub use error::RuntimeError;
pub use execute::{execute, Step};
pub use interpreter::{Execution, Interpreter, InterpreterConfig, Outcome, TraceRow};
pub use io::{IoBus, NoBus, TableBus, Transaction};
pub use machine::Machine;
pub use state::{read_bit_slice, State};

/// Run `function` on `inputs` with nothing attached to its buses
pub fn run(function: &zkasm_spec::Function, inputs: &[num_bigint::BigUint]) -> Result<Execution, RuntimeError> {
    Interpreter::new(function).run(inputs, &NoBus)
}
