//! End-to-end tests for branch retargeting and cross-function calls
//!
//! Splitting rewrites skip distances inside instructions while keeping
//! instruction indices, so a split function must visit the same sequence
//! of instructions as the original on every input.

use num_bigint::BigUint;
use proptest::prelude::*;
use zkasm_runtime::{Interpreter, InterpreterConfig, Machine, NoBus};
use zkasm_spec::{Bus, Code, FieldConfig, Function, Instruction, Polynomial, Register, RegisterId};
use zkasm_split::split_with_limbs;

fn r(i: usize) -> RegisterId {
    RegisterId::new(i)
}

fn v(x: u64) -> BigUint {
    BigUint::from(x)
}

fn field(width: usize) -> FieldConfig {
    FieldConfig::new("test", 64, width).unwrap()
}

/// Instruction indices visited, in order
fn visited(f: &Function, inputs: &[BigUint]) -> Vec<usize> {
    let config = InterpreterConfig {
        trace: true,
        ..Default::default()
    };
    let exec = Interpreter::with_config(f, config).run(inputs, &NoBus).unwrap();
    let mut pcs: Vec<usize> = exec.trace.iter().map(|row| row.instruction).collect();
    pcs.dedup();
    pcs
}

/// Dispatch on (a, b):
///   a != b            -> instruction 2
///   a == b, a != 5    -> instruction 3
///   a == b == 5       -> instruction 1
fn dispatch() -> Function {
    let tag = |value: u32| Instruction::new(vec![Code::add(vec![r(2)], vec![], value), Code::Ret]);
    Function::new(
        "dispatch",
        vec![
            Register::input("a", 12),
            Register::input("b", 12),
            Register::output("tag", 2),
        ],
        vec![],
        vec![
            Instruction::new(vec![
                Code::SkipIf {
                    left: vec![r(0)],
                    right: vec![r(1)],
                    constant: BigUint::default(),
                    skip: 2,
                },
                Code::skip_const(r(0), 5u32, 2),
                Code::jmp(1),
                Code::jmp(2),
                Code::jmp(3),
            ]),
            tag(1),
            tag(2),
            tag(3),
        ],
    )
    .unwrap()
}

#[test]
fn test_dispatch_paths() {
    let f = dispatch();
    f.validate(&FieldConfig::UNBOUNDED).unwrap();
    assert_eq!(visited(&f, &[v(5), v(5)]), vec![0, 1]);
    assert_eq!(visited(&f, &[v(5), v(6)]), vec![0, 2]);
    assert_eq!(visited(&f, &[v(4), v(4)]), vec![0, 3]);
}

proptest! {
    #[test]
    fn test_split_visits_same_instructions(
        a in 0u64..4096,
        b in 0u64..4096,
        same in any::<bool>(),
        width in 1usize..=12,
    ) {
        let f = dispatch();
        let b = if same { a } else { b };
        let split = split_with_limbs(&f, &field(width)).unwrap();
        let limbs: Vec<BigUint> = [a, b]
            .iter()
            .enumerate()
            .flat_map(|(i, &x)| split.allocator.split_value(r(i), &v(x)).unwrap())
            .collect();

        prop_assert_eq!(
            visited(&f, &[v(a), v(b)]),
            visited(&split.function, &limbs)
        );
    }
}

// ============================================================================
// Calls
// ============================================================================

/// Function 0: y = x * x
fn square() -> Function {
    Function::new(
        "square",
        vec![Register::input("x", 8), Register::output("y", 18)],
        vec![],
        vec![Instruction::new(vec![
            Code::assign(vec![r(1)], Polynomial::new().term(1u32, vec![r(0), r(0)])),
            Code::Ret,
        ])],
    )
    .unwrap()
}

/// Function 1: y = square(x) + square(z)
fn sum_of_squares() -> Function {
    Function::new(
        "sum_of_squares",
        vec![
            Register::input("x", 8),
            Register::input("z", 8),
            Register::output("y", 19),
            Register::temporary("sx", 18),
            Register::temporary("sz", 18),
        ],
        vec![
            Bus::new("square", 0, vec![r(0)], vec![r(3)]),
            Bus::new("square", 0, vec![r(1)], vec![r(4)]),
        ],
        vec![
            Instruction::new(vec![
                Code::call(0, vec![r(3)], vec![r(0)]),
                Code::call(0, vec![r(4)], vec![r(1)]),
                Code::jmp(1),
            ]),
            Instruction::new(vec![Code::add(vec![r(2)], vec![r(3), r(4)], 0u32), Code::Ret]),
        ],
    )
    .unwrap()
}

#[test]
fn test_machine_call_cache() {
    let m = Machine::new(vec![square(), sum_of_squares()]);
    m.validate(&FieldConfig::UNBOUNDED).unwrap();

    let exec = m.call(1, &[v(3), v(3)]).unwrap();
    assert_eq!(exec.outputs, vec![v(18)]);
    // both calls share one cache entry
    assert_eq!(m.cached(0), 1);

    let rows: Vec<Vec<BigUint>> = (0..32u64).map(|i| vec![v(i), v(31 - i)]).collect();
    let execs = m.execute_rows(1, &rows).unwrap();
    for (i, exec) in execs.iter().enumerate() {
        let (x, z) = (i as u64, 31 - i as u64);
        assert_eq!(exec.outputs, vec![v(x * x + z * z)]);
    }
    assert_eq!(m.cached(0), 32);
}

proptest! {
    #[test]
    fn test_split_machine_agrees(x in 0u64..256, z in 0u64..256, width in 1usize..=16) {
        let m = Machine::new(vec![square(), sum_of_squares()]);
        let direct = m.call(1, &[v(x), v(z)]).unwrap();

        let caller = split_with_limbs(&sum_of_squares(), &field(width)).unwrap();
        let split = m.split(&field(width)).unwrap();
        let inputs: Vec<BigUint> = [x, z]
            .iter()
            .enumerate()
            .flat_map(|(i, &value)| caller.allocator.split_value(r(i), &v(value)).unwrap())
            .collect();
        let lowered = split.call(1, &inputs).unwrap();

        prop_assert!(lowered.is_returned());
        let y = caller.allocator.join_values(r(2), &lowered.outputs).unwrap();
        prop_assert_eq!(vec![y], direct.outputs);
    }
}
