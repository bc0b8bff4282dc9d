//! End-to-end tests: a function and its split form compute the same thing
//!
//! Every program here is run directly and after splitting at each limb
//! width; inputs are translated to limbs and outputs recombined, and both
//! runs must agree on the outcome and on every output value.

use num_bigint::BigUint;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use zkasm_runtime::{run, Execution, Outcome};
use zkasm_spec::{Code, FieldConfig, Function, Instruction, Polynomial, Register, RegisterId};
use zkasm_split::split_with_limbs;

fn r(i: usize) -> RegisterId {
    RegisterId::new(i)
}

fn field(width: usize) -> FieldConfig {
    FieldConfig::new("test", 64, width).unwrap()
}

fn single(name: &str, registers: Vec<Register>, codes: Vec<Code>) -> Function {
    Function::new(name, registers, vec![], vec![Instruction::new(codes)]).unwrap()
}

/// Run `f` directly and split at `width`; returns the direct execution and
/// the recombined outputs of the split one
fn run_both(f: &Function, width: usize, inputs: &[u64]) -> (Execution, Outcome, Vec<BigUint>) {
    let inputs: Vec<BigUint> = inputs.iter().map(|&x| BigUint::from(x)).collect();
    let direct = run(f, &inputs).unwrap();

    let split = split_with_limbs(f, &field(width)).unwrap();
    let alloc = &split.allocator;
    let limb_inputs: Vec<BigUint> = inputs
        .iter()
        .enumerate()
        .flat_map(|(i, x)| alloc.split_value(r(i), x).unwrap())
        .collect();
    let lowered = run(&split.function, &limb_inputs).unwrap();

    let mut outputs = Vec::new();
    if lowered.outcome == Outcome::Returned {
        let mut limbs = lowered.outputs.into_iter();
        for id in f.output_ids() {
            let count = alloc.limbs(id).unwrap().len();
            let values: Vec<BigUint> = limbs.by_ref().take(count).collect();
            outputs.push(alloc.join_values(id, &values).unwrap());
        }
    }
    (direct, lowered.outcome, outputs)
}

fn check(f: &Function, width: usize, inputs: &[u64]) -> Result<(), TestCaseError> {
    let (direct, outcome, outputs) = run_both(f, width, inputs);
    prop_assert_eq!(direct.outcome, outcome);
    prop_assert_eq!(direct.outputs, outputs);
    Ok(())
}

// ============================================================================
// Programs
// ============================================================================

/// c, r0 = r1 + 1
fn increment() -> Function {
    single(
        "increment",
        vec![
            Register::input("r1", 16),
            Register::output("r0", 16),
            Register::output("c", 1),
        ],
        vec![Code::add(vec![r(1), r(2)], vec![r(0)], 1u32), Code::Ret],
    )
}

/// y = a + b + c + 5
fn sum3() -> Function {
    single(
        "sum3",
        vec![
            Register::input("a", 16),
            Register::input("b", 16),
            Register::input("c", 16),
            Register::output("y", 18),
        ],
        vec![Code::add(vec![r(3)], vec![r(0), r(1), r(2)], 5u32), Code::Ret],
    )
}

/// p = a * b, with the headroom carries need at narrow widths
fn product() -> Function {
    single(
        "product",
        vec![
            Register::input("a", 8),
            Register::input("b", 8),
            Register::output("p", 18),
        ],
        vec![Code::mul(vec![r(2)], vec![r(0), r(1)], 1u32), Code::Ret],
    )
}

/// y = 3a^2 + b
fn quadratic() -> Function {
    single(
        "quadratic",
        vec![
            Register::input("a", 8),
            Register::input("b", 8),
            Register::output("y", 20),
        ],
        vec![
            Code::assign(
                vec![r(2)],
                Polynomial::new().term(3u32, vec![r(0), r(0)]).term(1u32, vec![r(1)]),
            ),
            Code::Ret,
        ],
    )
}

/// b, d = x - y - 1
fn difference() -> Function {
    single(
        "difference",
        vec![
            Register::input("x", 16),
            Register::input("y", 16),
            Register::output("d", 16),
            Register::output("b", 1),
        ],
        vec![Code::sub(vec![r(2), r(3)], vec![r(0), r(1)], 1u32), Code::Ret],
    )
}

/// b, d = x - y with y wider than x: the high half of y is all borrow
fn wide_subtrahend() -> Function {
    single(
        "wide_subtrahend",
        vec![
            Register::input("x", 8),
            Register::input("y", 16),
            Register::output("d", 8),
            Register::output("b", 9),
        ],
        vec![Code::sub(vec![r(2), r(3)], vec![r(0), r(1)], 0u32), Code::Ret],
    )
}

/// b, hi, lo = x - 1 with 6-bit halves of a 12-bit difference
fn halves() -> Function {
    single(
        "halves",
        vec![
            Register::input("x", 12),
            Register::output("lo", 6),
            Register::output("hi", 6),
            Register::output("b", 1),
        ],
        vec![Code::sub(vec![r(1), r(2), r(3)], vec![r(0)], 1u32), Code::Ret],
    )
}

/// y = (b::a != c) ? 0 : 1
fn packed_compare() -> Function {
    single(
        "packed_compare",
        vec![
            Register::input("a", 8),
            Register::input("b", 8),
            Register::input("c", 16),
            Register::output("y", 1),
        ],
        vec![
            Code::SkipIf {
                left: vec![r(0), r(1)],
                right: vec![r(2)],
                constant: BigUint::default(),
                skip: 2,
            },
            Code::add(vec![r(3)], vec![], 1u32),
            Code::Ret,
            Code::add(vec![r(3)], vec![], 0u32),
            Code::Ret,
        ],
    )
}

/// z = (x != y) ? x : 7
fn select() -> Function {
    single(
        "select",
        vec![
            Register::input("x", 16),
            Register::input("y", 16),
            Register::output("z", 16),
        ],
        vec![
            Code::skip(r(0), r(1), 2),
            Code::add(vec![r(2)], vec![], 7u32),
            Code::Ret,
            Code::assign(vec![r(2)], Polynomial::var(r(0))),
            Code::Ret,
        ],
    )
}

/// y = (u8) x, failing when x does not fit
fn narrow() -> Function {
    single(
        "narrow",
        vec![Register::input("x", 16), Register::output("y", 8)],
        vec![Code::cast(vec![r(1)], r(0), 8), Code::Ret],
    )
}

/// q, m = n / d with witness, failing on d == 0
fn divide() -> Function {
    single(
        "divide",
        vec![
            Register::input("n", 8),
            Register::input("d", 8),
            Register::output("q", 8),
            Register::output("m", 8),
            Register::output("w", 8),
        ],
        vec![
            Code::Division {
                quotient: r(2),
                remainder: r(3),
                witness: r(4),
                dividend: r(0),
                divisor: r(1),
            },
            Code::Ret,
        ],
    )
}

/// hi, lo = (u12) x with a 5-bit low target
fn rechunk() -> Function {
    single(
        "rechunk",
        vec![
            Register::input("x", 16),
            Register::output("lo", 5),
            Register::output("hi", 7),
        ],
        vec![Code::cast(vec![r(1), r(2)], r(0), 12), Code::Ret],
    )
}

// ============================================================================
// Fixed cases
// ============================================================================

#[test]
fn test_programs_validate() {
    for f in [
        increment(),
        sum3(),
        product(),
        quadratic(),
        difference(),
        wide_subtrahend(),
        halves(),
        packed_compare(),
        select(),
        narrow(),
        rechunk(),
        divide(),
    ] {
        f.validate(&FieldConfig::UNBOUNDED).unwrap();
    }
}

#[test]
fn test_increment_wraps_into_carry() {
    let (direct, outcome, outputs) = run_both(&increment(), 8, &[0xFFFF]);
    assert_eq!(outcome, Outcome::Returned);
    assert_eq!(direct.outputs, vec![BigUint::from(0u32), BigUint::from(1u32)]);
    assert_eq!(outputs, direct.outputs);
}

#[test]
fn test_cast_guard_fails_in_both() {
    let (direct, outcome, _) = run_both(&narrow(), 3, &[0x100]);
    assert_eq!(direct.outcome, Outcome::Failed);
    assert_eq!(outcome, Outcome::Failed);
}

#[test]
fn test_packed_compare_without_splitting() {
    // every register fits a 16-bit limb, so the comparison is kept as is
    let (direct, outcome, outputs) = run_both(&packed_compare(), 16, &[0x34, 0x12, 0x1234]);
    assert_eq!(outcome, Outcome::Returned);
    assert_eq!(direct.outputs, vec![BigUint::from(1u32)]);
    assert_eq!(outputs, direct.outputs);

    let split = split_with_limbs(&packed_compare(), &field(16)).unwrap();
    assert_eq!(split.function.code(), packed_compare().code());
}

#[test]
fn test_zero_divisor_fails_in_both() {
    let (direct, outcome, _) = run_both(&divide(), 8, &[9, 0]);
    assert_eq!(direct.outcome, Outcome::Failed);
    assert_eq!(outcome, Outcome::Failed);
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #[test]
    fn test_increment_equivalent(x in 0u64..65536, width in 1usize..=16) {
        check(&increment(), width, &[x])?;
    }

    #[test]
    fn test_sum_equivalent(
        a in 0u64..65536,
        b in 0u64..65536,
        c in 0u64..65536,
        width in 1usize..=16,
    ) {
        check(&sum3(), width, &[a, b, c])?;
    }

    #[test]
    fn test_product_equivalent(a in 0u64..256, b in 0u64..256, width in 1usize..=16) {
        check(&product(), width, &[a, b])?;
    }

    #[test]
    fn test_quadratic_equivalent(a in 0u64..256, b in 0u64..256, width in 1usize..=16) {
        check(&quadratic(), width, &[a, b])?;
    }

    #[test]
    fn test_difference_equivalent(x in 0u64..65536, y in 0u64..65536, width in 1usize..=16) {
        check(&difference(), width, &[x, y])?;
    }

    #[test]
    fn test_wide_subtrahend_equivalent(x in 0u64..256, y in 0u64..65536, width in 1usize..=16) {
        check(&wide_subtrahend(), width, &[x, y])?;
    }

    #[test]
    fn test_halves_equivalent(x in 0u64..4096, width in 1usize..=16) {
        check(&halves(), width, &[x])?;
    }

    #[test]
    fn test_packed_compare_equivalent(
        a in 0u64..256,
        b in 0u64..256,
        same in any::<bool>(),
        noise in 1u64..65536,
        width in 1usize..=16,
    ) {
        let c = a + 256 * b;
        let c = if same { c } else { c ^ noise };
        check(&packed_compare(), width, &[a, b, c])?;
    }

    #[test]
    fn test_select_equivalent(x in 0u64..65536, same in any::<bool>(), width in 1usize..=16) {
        let y = if same { x } else { (x * 7 + 1) % 65536 };
        check(&select(), width, &[x, y])?;
    }

    #[test]
    fn test_narrow_equivalent(x in 0u64..1024, width in 1usize..=16) {
        check(&narrow(), width, &[x])?;
    }

    #[test]
    fn test_rechunk_equivalent(x in 0u64..8192, width in 1usize..=16) {
        check(&rechunk(), width, &[x])?;
    }

    #[test]
    fn test_divide_equivalent(n in 0u64..256, d in 0u64..256, width in 8usize..=16) {
        check(&divide(), width, &[n, d])?;
    }
}
