//! Integration tests for bit-width accounting and write-conflict detection

use num_bigint::BigUint;
use num_traits::One;
use proptest::prelude::*;
use zkasm_spec::{
    Code, Context, FieldConfig, Function, Instruction, Polynomial, Register, RegisterId,
    SpecError, ValidationError,
};

fn r(i: usize) -> RegisterId {
    RegisterId::new(i)
}

/// Inputs of the given widths followed by one output of `target` bits
fn registers(widths: &[usize], target: usize) -> Vec<Register> {
    let mut regs: Vec<Register> = widths
        .iter()
        .enumerate()
        .map(|(i, &w)| Register::input(format!("a{i}"), w))
        .collect();
    regs.push(Register::output("t", target));
    regs
}

fn max_of(width: usize) -> BigUint {
    (BigUint::one() << width) - BigUint::one()
}

fn validate(code: &Code, regs: &[Register], field: &FieldConfig) -> Result<(), ValidationError> {
    Instruction::new(vec![code.clone(), Code::Ret]).validate(&Context::new(field, regs, &[], 1))
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn test_mul_boundary() {
    // 8-bit * 8-bit * 3 needs bits(255 * 255 * 3) = 18 bits
    let field = FieldConfig::UNBOUNDED;
    let ok = registers(&[8, 8], 18);
    let code = Code::mul(vec![r(2)], vec![r(0), r(1)], 3u32);
    assert!(validate(&code, &ok, &field).is_ok());

    let short = registers(&[8, 8], 17);
    assert!(matches!(
        validate(&code, &short, &field),
        Err(ValidationError::RhsWiderThanLhs { lhs: 17, rhs: 18, .. })
    ));
}

#[test]
fn test_assign_spread_across_targets() {
    // t1, t0 = a0 * a1 with two 8-bit targets holds 16 bits
    let regs = vec![
        Register::input("a0", 8),
        Register::input("a1", 8),
        Register::output("t0", 8),
        Register::output("t1", 8),
    ];
    let code = Code::assign(
        vec![r(2), r(3)],
        Polynomial::new().term(1u32, vec![r(0), r(1)]),
    );
    assert!(validate(&code, &regs, &FieldConfig::UNBOUNDED).is_ok());

    let code = Code::assign(
        vec![r(2), r(3)],
        Polynomial::new().term(1u32, vec![r(0), r(1)]).term(1u32, vec![]),
    );
    assert!(validate(&code, &regs, &FieldConfig::UNBOUNDED).is_ok());

    let code = Code::assign(
        vec![r(2), r(3)],
        Polynomial::new().term(1u32, vec![r(0), r(1)]).term(256u32, vec![r(0)]),
    );
    assert!(validate(&code, &regs, &FieldConfig::UNBOUNDED).is_err());
}

#[test]
fn test_sub_borrow_boundary() {
    // d = a0 - a1 - a2 with 8-bit operands: borrow up to 2 needs 2 bits
    let regs = vec![
        Register::input("a0", 8),
        Register::input("a1", 8),
        Register::input("a2", 8),
        Register::output("d", 8),
        Register::output("b", 2),
        Register::output("b1", 1),
    ];
    let ok = Code::sub(vec![r(3), r(4)], vec![r(0), r(1), r(2)], 0u32);
    assert!(validate(&ok, &regs, &FieldConfig::UNBOUNDED).is_ok());

    let short = Code::sub(vec![r(3), r(5)], vec![r(0), r(1), r(2)], 0u32);
    assert!(matches!(
        validate(&short, &regs, &FieldConfig::UNBOUNDED),
        Err(ValidationError::RhsWiderThanLhs { lhs: 1, rhs: 2, .. })
    ));
}

#[test]
fn test_function_reports_location() {
    let f = Function::new(
        "double_write",
        vec![Register::input("x", 8), Register::output("y", 8)],
        vec![],
        vec![
            Instruction::new(vec![Code::jmp(1)]),
            Instruction::new(vec![
                Code::add(vec![r(1)], vec![r(0)], 0u32),
                Code::add(vec![r(1)], vec![], 1u32),
                Code::Ret,
            ]),
        ],
    )
    .unwrap();

    match f.validate(&FieldConfig::UNBOUNDED) {
        Err(SpecError::Validation {
            function,
            instruction,
            source: ValidationError::ConflictingWrite { register, offset, .. },
        }) => {
            assert_eq!(function, "double_write");
            assert_eq!(instruction, 1);
            assert_eq!(register, "y");
            assert_eq!(offset, 1);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_disjoint_branches_accept_same_target() {
    let regs = vec![Register::input("x", 8), Register::output("y", 8)];
    let field = FieldConfig::UNBOUNDED;
    let ctx = Context::new(&field, &regs, &[], 1);

    // 0: skip x != 0 2
    // 1: y = 1 ; 2: ret
    // 3: y = 2 ; 4: ret
    let guarded = Instruction::new(vec![
        Code::skip_const(r(0), 0u32, 2),
        Code::add(vec![r(1)], vec![], 1u32),
        Code::Ret,
        Code::add(vec![r(1)], vec![], 2u32),
        Code::Ret,
    ]);
    assert!(guarded.validate(&ctx).is_ok());

    // Same writes, but the first path falls into the second
    let unguarded = Instruction::new(vec![
        Code::skip_const(r(0), 0u32, 1),
        Code::add(vec![r(1)], vec![], 1u32),
        Code::add(vec![r(1)], vec![], 2u32),
        Code::Ret,
    ]);
    assert!(matches!(
        unguarded.validate(&ctx),
        Err(ValidationError::ConflictingWrite { offset: 2, .. })
    ));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn test_add_accepted_iff_fits(
        widths in prop::collection::vec(0usize..40, 1..5),
        constant in 0u64..1_000_000,
    ) {
        let max = widths
            .iter()
            .map(|&w| max_of(w))
            .fold(BigUint::from(constant), |acc, v| acc + v);
        let need = max.bits() as usize;
        let sources: Vec<RegisterId> = (0..widths.len()).map(r).collect();
        let target = r(widths.len());
        let code = Code::add(vec![target], sources, constant);
        let field = FieldConfig::UNBOUNDED;

        prop_assert!(validate(&code, &registers(&widths, need), &field).is_ok());
        if need > 0 {
            let short = validate(&code, &registers(&widths, need - 1), &field);
            let rejected = matches!(short, Err(ValidationError::RhsWiderThanLhs { .. }));
            prop_assert!(rejected);
        }

        // The field boundary behaves the same way
        if need > 0 {
            let exact = FieldConfig::new("exact", need, need).unwrap();
            prop_assert!(validate(&code, &registers(&widths, need), &exact).is_ok());
            if need > 1 {
                let narrow = FieldConfig::new("narrow", need - 1, need - 1).unwrap();
                let rejected = matches!(
                    validate(&code, &registers(&widths, need), &narrow),
                    Err(ValidationError::RhsWiderThanField { .. })
                );
                prop_assert!(rejected);
            }
        }
    }
}
