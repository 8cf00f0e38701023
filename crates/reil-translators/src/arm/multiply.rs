//! Multiply and multiply-accumulate instructions.

use reil::cpu::arm::CARRY;
use reil::{OperandSize, ReilOpcode};

use super::operands;
use super::{
    flag, set_negative_zero, sign_extend, signed_word, word, write_register, ArmInstruction, WORD,
};
use crate::environment::TranslationContext;
use crate::translator::{Error, Result};

fn registers<const N: usize>(instruction: &ArmInstruction<'_>) -> Result<[String; N]> {
    instruction.expect_operands(N)?;

    let mut registers: [String; N] = std::array::from_fn(|_| String::new());
    for (index, register) in registers.iter_mut().enumerate() {
        *register = operands::register(instruction.operand(index)?)?;
    }

    Ok(registers)
}

pub(crate) fn translate(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
) -> Result<()> {
    match instruction.mnemonic.base {
        "MUL" => {
            let [rd, rm, rs] = registers::<3>(instruction)?;
            multiply(context, instruction, &rd, &rm, &rs, None)
        }
        "MLA" => {
            let [rd, rm, rs, rn] = registers::<4>(instruction)?;
            multiply(context, instruction, &rd, &rm, &rs, Some(&rn))
        }
        "UMULL" => long_multiply(context, instruction, false, false),
        "SMULL" => long_multiply(context, instruction, true, false),
        "UMLAL" => long_multiply(context, instruction, false, true),
        "SMLAL" => long_multiply(context, instruction, true, true),
        base => Err(Error::InternalTranslation(format!(
            "{base} is not a multiply instruction"
        ))),
    }
}

/// `rd = rm * rs (+ rn)` truncated to 32 bits.
fn multiply(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
    rd: &str,
    rm: &str,
    rs: &str,
    accumulate: Option<&str>,
) -> Result<()> {
    let rm = instruction.read_register(rm)?;
    let rs = instruction.read_register(rs)?;

    let result = match accumulate {
        Some(rn) => {
            let product = context.binary(ReilOpcode::Mul, &rm, &rs, OperandSize::Qword)?;
            let rn = instruction.read_register(rn)?;
            context.binary(ReilOpcode::Add, &product, &rn, WORD)?
        }
        None => context.binary(ReilOpcode::Mul, &rm, &rs, WORD)?,
    };

    if instruction.mnemonic.set_flags {
        set_negative_zero(context, &result, WORD)?;
        context.undefine(&flag(CARRY)?)?;
    }

    write_register(context, rd, &result)
}

/// `rdhi:rdlo = rm * rs (+ rdhi:rdlo)` with a 64-bit result.
fn long_multiply(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
    signed: bool,
    accumulate: bool,
) -> Result<()> {
    let qword = OperandSize::Qword;
    let [rd_lo, rd_hi, rm, rs] = registers::<4>(instruction)?;

    let mut rm = instruction.read_register(&rm)?;
    let mut rs = instruction.read_register(&rs)?;
    if signed {
        rm = sign_extend(context, &rm, WORD, qword)?;
        rs = sign_extend(context, &rs, WORD, qword)?;
    }

    let mut result = context.binary(ReilOpcode::Mul, &rm, &rs, qword)?;
    if accumulate {
        let high = instruction.read_register(&rd_hi)?;
        let low = instruction.read_register(&rd_lo)?;
        let high = context.binary(ReilOpcode::Bsh, &high, &word(32)?, qword)?;
        let accumulator = context.binary(ReilOpcode::Or, &high, &low, qword)?;
        result = context.binary(ReilOpcode::Add, &result, &accumulator, qword)?;
    }

    if instruction.mnemonic.set_flags {
        set_negative_zero(context, &result, qword)?;
    }

    let low = context.resize(&result, WORD)?;
    let high = context.binary(ReilOpcode::Bsh, &result, &signed_word(-32)?, WORD)?;
    write_register(context, &rd_lo, &low)?;
    write_register(context, &rd_hi, &high)
}
