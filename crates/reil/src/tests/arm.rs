use std::collections::{BTreeMap, HashMap};

use crate::cpu::arm::*;
use crate::cpu::CpuPolicy;
use crate::*;

fn flags(c: bool, n: bool, z: bool, v: bool) -> BTreeMap<String, bool> {
    [(CARRY, c), (NEGATIVE, n), (ZERO, z), (OVERFLOW, v)]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

#[test]
fn register_file() {
    let policy = ArmPolicy;
    assert_eq!(policy.registers().len(), 16);
    assert_eq!(policy.register_size("R7"), Some(OperandSize::Dword));
    assert_eq!(policy.register_size("Q"), Some(OperandSize::Byte));
    assert_eq!(policy.register_size("t0"), None);
    assert!(policy.is_native_register("PC"));
    assert!(policy.is_flag("C"));
    assert!(!policy.is_flag("R0"));
    assert_eq!(policy.program_counter(), "PC");
}

#[test]
fn register_aliases() {
    let policy = ArmPolicy;
    assert_eq!(policy.canonical_register("r13"), Some("SP"));
    assert_eq!(policy.canonical_register("R14"), Some("LR"));
    assert_eq!(policy.canonical_register("r15"), Some("PC"));
    assert_eq!(policy.canonical_register("fp"), Some("R11"));
    assert_eq!(policy.canonical_register("r2"), Some("R2"));
    assert_eq!(policy.canonical_register("R16"), None);
}

#[test]
fn condition_codes() -> Result<()> {
    let policy = ArmPolicy;

    let equal = flags(true, false, true, false);
    assert!(policy.evaluate_condition("EQ", &equal)?);
    assert!(!policy.evaluate_condition("NE", &equal)?);
    assert!(policy.evaluate_condition("HS", &equal)?);
    assert!(policy.evaluate_condition("LS", &equal)?);
    assert!(!policy.evaluate_condition("HI", &equal)?);
    assert!(policy.evaluate_condition("GE", &equal)?);
    assert!(!policy.evaluate_condition("GT", &equal)?);
    assert!(policy.evaluate_condition("LE", &equal)?);

    let less = flags(false, true, false, false);
    assert!(policy.evaluate_condition("lt", &less)?);
    assert!(policy.evaluate_condition("MI", &less)?);
    assert!(policy.evaluate_condition("LO", &less)?);
    assert!(!policy.evaluate_condition("VS", &less)?);
    assert!(policy.evaluate_condition("AL", &less)?);
    Ok(())
}

#[test]
fn condition_reads_only_required_flags() -> Result<()> {
    let policy = ArmPolicy;
    let mut only_zero = BTreeMap::new();
    only_zero.insert(ZERO.to_string(), true);

    assert!(policy.evaluate_condition("EQ", &only_zero)?);
    assert!(matches!(
        policy.evaluate_condition("GE", &only_zero),
        Err(Error::UndefinedFlag(flag)) if flag == NEGATIVE
    ));
    Ok(())
}

#[test]
fn unknown_condition() {
    let policy = ArmPolicy;
    assert!(matches!(
        policy.evaluate_condition("XX", &flags(false, false, false, false)),
        Err(Error::UnknownCondition(_))
    ));
}

#[test]
fn condition_predicates() -> Result<()> {
    let signs_differ = Predicate::Xor(
        Box::new(Predicate::Flag(NEGATIVE)),
        Box::new(Predicate::Flag(OVERFLOW)),
    );
    assert_eq!(Condition::Lt.predicate(), signs_differ);
    assert_eq!(
        Condition::Ge.predicate(),
        Predicate::Not(Box::new(signs_differ))
    );
    assert_eq!(Condition::Al.predicate(), Predicate::True);

    let policy = ArmPolicy;
    let mut flags = HashMap::new();
    flags.insert(CARRY.to_string(), true);
    flags.insert(ZERO.to_string(), false);
    assert!(policy.evaluate_condition("HI", &flags)?);

    flags.insert(ZERO.to_string(), true);
    assert!(!policy.evaluate_condition("HI", &flags)?);
    assert!(policy.evaluate_condition("LS", &flags)?);
    Ok(())
}
