use crate::test_fixture::*;
use crate::translator::Result;
use crate::tree::OperandTree;
use proptest::prelude::*;
use reil_interpreter::StopReason;

fn run(machine: &mut Machine, mnemonic: &str, operands: Vec<OperandTree>) -> Result<()> {
    machine.run(&[instruction(0x100, mnemonic, operands)])?;
    Ok(())
}

#[test]
fn mov_immediate() -> Result<()> {
    let mut machine = Machine::new().flag("C", true);
    run(&mut machine, "MOV", vec![reg("R0"), imm("#0x2A")])?;
    assert_eq!(machine.get("R0"), 0x2a);

    // Flags are not updated without the S suffix
    assert!(machine.flag_value("C"));
    assert!(!machine.flag_value("Z"));
    Ok(())
}

#[test]
fn adds_carry_out() -> Result<()> {
    let mut machine = Machine::new().register("R1", 0xffff_ffff).register("R2", 1);
    run(&mut machine, "ADDS", vec![reg("R0"), reg("R1"), reg("R2")])?;

    assert_eq!(machine.get("R0"), 0);
    assert!(machine.flag_value("Z"));
    assert!(machine.flag_value("C"));
    assert!(!machine.flag_value("N"));
    assert!(!machine.flag_value("V"));
    Ok(())
}

#[test]
fn adds_signed_overflow() -> Result<()> {
    let mut machine = Machine::new().register("R1", 0x7fff_ffff).register("R2", 1);
    run(&mut machine, "ADDS", vec![reg("R0"), reg("R1"), reg("R2")])?;

    assert_eq!(machine.get("R0"), 0x8000_0000);
    assert!(machine.flag_value("N"));
    assert!(machine.flag_value("V"));
    assert!(!machine.flag_value("C"));
    assert!(!machine.flag_value("Z"));
    Ok(())
}

#[test]
fn subs_borrow() -> Result<()> {
    let mut machine = Machine::new().register("R1", 5).register("R2", 7);
    run(&mut machine, "SUBS", vec![reg("R0"), reg("R1"), reg("R2")])?;

    assert_eq!(machine.get("R0"), 0xffff_fffe);
    assert!(machine.flag_value("N"));
    assert!(!machine.flag_value("C"));
    assert!(!machine.flag_value("V"));
    Ok(())
}

#[test]
fn subs_signed_overflow() -> Result<()> {
    let mut machine = Machine::new().register("R1", 0x8000_0000);
    run(&mut machine, "SUBS", vec![reg("R0"), reg("R1"), imm("1")])?;

    assert_eq!(machine.get("R0"), 0x7fff_ffff);
    assert!(machine.flag_value("V"));
    assert!(machine.flag_value("C"));
    assert!(!machine.flag_value("N"));
    Ok(())
}

#[test]
fn compare_sets_flags_only() -> Result<()> {
    let mut machine = Machine::new()
        .register("R0", 0x55)
        .register("R1", 9)
        .register("R2", 9);
    run(&mut machine, "CMP", vec![reg("R1"), reg("R2")])?;

    assert!(machine.flag_value("Z"));
    assert!(machine.flag_value("C"));
    assert_eq!(machine.get("R0"), 0x55);
    assert_eq!(machine.get("R1"), 9);
    Ok(())
}

#[test]
fn compare_negative() -> Result<()> {
    let mut machine = Machine::new().register("R1", 0xffff_ffff).register("R2", 1);
    run(&mut machine, "CMN", vec![reg("R1"), reg("R2")])?;
    assert!(machine.flag_value("Z"));
    assert!(machine.flag_value("C"));
    Ok(())
}

#[test]
fn carry_chained_arithmetic() -> Result<()> {
    let mut machine = Machine::new().register("R1", 1).flag("C", true);
    run(&mut machine, "ADC", vec![reg("R0"), reg("R1"), imm("1")])?;
    assert_eq!(machine.get("R0"), 3);

    let mut machine = Machine::new().register("R1", 10).register("R2", 3);
    run(&mut machine, "SBC", vec![reg("R0"), reg("R1"), reg("R2")])?;
    assert_eq!(machine.get("R0"), 6);

    let mut machine = Machine::new().register("R1", 3);
    run(&mut machine, "RSC", vec![reg("R0"), reg("R1"), imm("10")])?;
    assert_eq!(machine.get("R0"), 6);
    Ok(())
}

#[test]
fn reverse_subtract() -> Result<()> {
    let mut machine = Machine::new().register("R1", 5);
    run(&mut machine, "RSBS", vec![reg("R0"), reg("R1"), imm("0")])?;
    assert_eq!(machine.get("R0"), 0xffff_fffb);
    assert!(machine.flag_value("N"));
    assert!(!machine.flag_value("C"));
    Ok(())
}

#[test]
fn logical_operations() -> Result<()> {
    let cases = [
        ("AND", 0x0000_0034),
        ("ORR", 0x0000_12ff),
        ("EOR", 0x0000_12cb),
        ("BIC", 0x0000_1200),
    ];

    for (mnemonic, expected) in cases {
        let mut machine = Machine::new().register("R1", 0x1234);
        run(&mut machine, mnemonic, vec![reg("R0"), reg("R1"), imm("0xff")])?;
        assert_eq!(machine.get("R0"), expected, "{mnemonic}");
    }

    let mut machine = Machine::new();
    run(&mut machine, "MVN", vec![reg("R0"), imm("0")])?;
    assert_eq!(machine.get("R0"), 0xffff_ffff);
    Ok(())
}

#[test]
fn logical_flags() -> Result<()> {
    let mut machine = Machine::new()
        .register("R1", 2)
        .flag("C", true)
        .flag("V", true);
    run(&mut machine, "TST", vec![reg("R1"), imm("1")])?;

    assert!(machine.flag_value("Z"));
    assert!(!machine.flag_value("N"));

    // Small immediates leave C unchanged and logical operations never touch V
    assert!(machine.flag_value("C"));
    assert!(machine.flag_value("V"));
    Ok(())
}

#[test]
fn rotated_immediate_carry() -> Result<()> {
    let mut machine = Machine::new();
    run(&mut machine, "MOVS", vec![reg("R0"), imm("0x80000000")])?;

    assert_eq!(machine.get("R0"), 0x8000_0000);
    assert!(machine.flag_value("C"));
    assert!(machine.flag_value("N"));
    Ok(())
}

#[test]
fn test_equivalence() -> Result<()> {
    let mut machine = Machine::new().register("R1", 0xdead);
    run(&mut machine, "TEQ", vec![reg("R1"), reg("R1")])?;
    assert!(machine.flag_value("Z"));
    Ok(())
}

#[test]
fn two_operand_form() -> Result<()> {
    let mut machine = Machine::new().register("R0", 1);
    run(&mut machine, "ADD", vec![reg("R0"), imm("4")])?;
    assert_eq!(machine.get("R0"), 5);
    Ok(())
}

#[test]
fn pc_reads_ahead() -> Result<()> {
    let mut machine = Machine::new();
    run(&mut machine, "ADD", vec![reg("R0"), reg("PC"), imm("4")])?;
    assert_eq!(machine.get("R0"), 0x10c);
    Ok(())
}

#[test]
fn pc_write_jumps() -> Result<()> {
    let mut machine = Machine::new().register("LR", 0x200);
    let reason = machine.run(&[
        instruction(0x100, "MOV", vec![reg("PC"), reg("LR")]),
        instruction(0x104, "MOV", vec![reg("R0"), imm("1")]),
        instruction(0x200, "MOV", vec![reg("R1"), imm("2")]),
    ])?;

    assert_eq!(reason, StopReason::EndOfProgram);
    assert_eq!(machine.get("R0"), 0);
    assert_eq!(machine.get("R1"), 2);
    Ok(())
}

#[test]
fn untouched_registers() -> Result<()> {
    let mut machine = Machine::new()
        .register("R1", 3)
        .register("R5", 0x5555)
        .flag("Q", true);
    run(&mut machine, "ADDS", vec![reg("R0"), reg("R1"), imm("2")])?;

    assert_eq!(machine.get("R5"), 0x5555);
    assert!(machine.flag_value("Q"));
    assert_eq!(machine.get("R0"), 5);
    Ok(())
}

proptest! {
    #[test]
    fn adds_flags(x: u32, y: u32) {
        let mut machine = Machine::new().register("R1", x.into()).register("R2", y.into());
        run(&mut machine, "ADDS", vec![reg("R0"), reg("R1"), reg("R2")]).unwrap();

        let (result, carry) = x.overflowing_add(y);
        prop_assert_eq!(machine.get("R0"), u64::from(result));
        prop_assert_eq!(machine.flag_value("C"), carry);
        prop_assert_eq!(machine.flag_value("V"), (x as i32).overflowing_add(y as i32).1);
        prop_assert_eq!(machine.flag_value("N"), (result as i32) < 0);
        prop_assert_eq!(machine.flag_value("Z"), result == 0);
    }

    #[test]
    fn subs_flags(x: u32, y: u32) {
        let mut machine = Machine::new().register("R1", x.into()).register("R2", y.into());
        run(&mut machine, "SUBS", vec![reg("R0"), reg("R1"), reg("R2")]).unwrap();

        let result = x.wrapping_sub(y);
        prop_assert_eq!(machine.get("R0"), u64::from(result));
        prop_assert_eq!(machine.flag_value("C"), x >= y);
        prop_assert_eq!(machine.flag_value("V"), (x as i32).overflowing_sub(y as i32).1);
        prop_assert_eq!(machine.flag_value("Z"), x == y);
    }
}
