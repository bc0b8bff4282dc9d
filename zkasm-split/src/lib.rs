//! # zkasm field-agnosticity pass
//!
//! Rewrites a function whose registers may be arbitrarily wide into an
//! equivalent function whose registers all fit a field's register width.
//!
//! ## Overview
//!
//! Every register is split into limbs of at most `register_width` bits,
//! least-significant first. Arithmetic is lowered to chains of limb
//! equations linked by carry (or borrow) registers, comparisons are lowered
//! to one comparison per group of limbs sharing a boundary, and casts to
//! guarded limb copies. Branch distances are recomputed after expansion.
//!
//! ## Example
//!
//! ```rust,no_run
//! use zkasm_spec::{Code, FieldConfig, Function, Instruction, Register, RegisterId};
//! use zkasm_split::split_function;
//!
//! let f = Function::new(
//!     "inc",
//!     vec![Register::input("x", 16), Register::output("y", 17)],
//!     vec![],
//!     vec![Instruction::new(vec![
//!         Code::add(vec![RegisterId::new(1)], vec![RegisterId::new(0)], 1u32),
//!         Code::Ret,
//!     ])],
//! )
//! .unwrap();
//! let split = split_function(&f, &FieldConfig::GF_8209).unwrap();
//! println!("{split}");
//! ```

pub mod allocator;
mod assign;
mod cast;
mod compare;
mod division;
pub mod error;
pub mod function;
pub mod instruction;
mod sub;

pub use allocator::{Limb, RegisterAllocator};
pub use error::SplitError;
pub use function::{split_function, split_with_limbs, SplitFunction};
pub use instruction::split_instruction;
