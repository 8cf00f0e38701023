use reil::cpu::arm::SATURATION;
use reil::{OperandSize, ReilOpcode};

use super::operands;
use super::{flag, one_bit, signed_word, word, write_register, ArmInstruction, WORD};
use crate::environment::TranslationContext;
use crate::translator::{Error, Result};

pub(crate) fn nop(context: &mut TranslationContext, instruction: &ArmInstruction<'_>) -> Result<()> {
    instruction.expect_operands(0)?;
    context.nop()
}

/// Supervisor calls transfer control to the operating system, which is not modeled.
pub(crate) fn supervisor_call(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
) -> Result<()> {
    if instruction.operands.len() > 1 {
        return Err(Error::UnsupportedOperandShape(format!(
            "{} expects at most 1 operand",
            instruction.mnemonic.base
        )));
    }

    context.unknown()
}

/// `QADD` and `QSUB`: signed 32-bit arithmetic clamped to the representable range. Saturation
/// sets the sticky Q flag.
pub(crate) fn saturating(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
) -> Result<()> {
    instruction.expect_operands(3)?;
    let rd = operands::register(instruction.operand(0)?)?;
    let x = instruction.read_register(&operands::register(instruction.operand(1)?)?)?;
    let y = instruction.read_register(&operands::register(instruction.operand(2)?)?)?;

    let (result, overflow) = match instruction.mnemonic.base {
        "QADD" => {
            let result = context.binary(ReilOpcode::Add, &x, &y, WORD)?;
            let x_changed = context.binary(ReilOpcode::Xor, &x, &result, WORD)?;
            let y_changed = context.binary(ReilOpcode::Xor, &y, &result, WORD)?;
            let overflow = context.binary(ReilOpcode::And, &x_changed, &y_changed, WORD)?;
            (result, overflow)
        }
        "QSUB" => {
            let result = context.binary(ReilOpcode::Sub, &x, &y, WORD)?;
            let signs_differ = context.binary(ReilOpcode::Xor, &x, &y, WORD)?;
            let x_changed = context.binary(ReilOpcode::Xor, &x, &result, WORD)?;
            let overflow = context.binary(ReilOpcode::And, &signs_differ, &x_changed, WORD)?;
            (result, overflow)
        }
        base => {
            return Err(Error::InternalTranslation(format!(
                "{base} is not a saturating instruction"
            )))
        }
    };
    let overflow = context.binary(
        ReilOpcode::Bsh,
        &overflow,
        &signed_word(-31)?,
        OperandSize::Byte,
    )?;

    // Overflow towards positive saturates to 0x7fffffff and towards negative to 0x80000000,
    // which is 0x7fffffff plus the sign of the first operand
    let sign = context.binary(ReilOpcode::Bsh, &x, &signed_word(-31)?, WORD)?;
    let saturated = context.binary(ReilOpcode::Add, &word(0x7fff_ffff)?, &sign, WORD)?;

    let select = context.binary(ReilOpcode::Sub, &word(0)?, &overflow, WORD)?;
    let keep = context.binary(ReilOpcode::Xor, &select, &word(0xffff_ffff)?, WORD)?;
    let clamped = context.binary(ReilOpcode::And, &saturated, &select, WORD)?;
    let unclamped = context.binary(ReilOpcode::And, &result, &keep, WORD)?;
    let value = context.binary(ReilOpcode::Or, &clamped, &unclamped, WORD)?;

    let no_overflow = context.is_zero(&overflow)?;
    let done = context.new_label();
    context.jump_if(&no_overflow, done)?;
    context.store_register(&one_bit(true)?, &flag(SATURATION)?)?;
    context.bind(done)?;

    write_register(context, &rd, &value)
}
