//! Data processing instructions.

use reil::cpu::arm::{CARRY, OVERFLOW};
use reil::{OperandSize, ReilOpcode, ReilOperand};

use super::operands::{self, Operand2};
use super::shifter::{self, ShifterOutput};
use super::{
    flag, one_bit, set_negative_zero, signed_word, word, write_register, ArmInstruction, WORD,
};
use crate::environment::TranslationContext;
use crate::translator::{Error, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Operation {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

impl Operation {
    fn from_mnemonic(base: &str) -> Option<Self> {
        let operation = match base {
            "AND" => Self::And,
            "EOR" => Self::Eor,
            "SUB" => Self::Sub,
            "RSB" => Self::Rsb,
            "ADD" => Self::Add,
            "ADC" => Self::Adc,
            "SBC" => Self::Sbc,
            "RSC" => Self::Rsc,
            "TST" => Self::Tst,
            "TEQ" => Self::Teq,
            "CMP" => Self::Cmp,
            "CMN" => Self::Cmn,
            "ORR" => Self::Orr,
            "MOV" => Self::Mov,
            "BIC" => Self::Bic,
            "MVN" => Self::Mvn,
            _ => return None,
        };

        Some(operation)
    }

    /// Operations that only update flags.
    fn is_comparison(self) -> bool {
        matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }

    /// Operations with a single source operand.
    fn is_move(self) -> bool {
        matches!(self, Self::Mov | Self::Mvn)
    }

    /// Operations whose flags come from an addition rather than the shifter.
    fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Sub
                | Self::Rsb
                | Self::Add
                | Self::Adc
                | Self::Sbc
                | Self::Rsc
                | Self::Cmp
                | Self::Cmn
        )
    }
}

/// Operand layout after decoding the operand trees.
struct Operands {
    destination: Option<String>,
    source: Option<ReilOperand>,
    operand2: Operand2,
}

fn decode_operands(instruction: &ArmInstruction<'_>, operation: Operation) -> Result<Operands> {
    let count = instruction.operands.len();
    if operation.is_comparison() {
        instruction.expect_operands(2)?;
        return Ok(Operands {
            destination: None,
            source: Some(instruction.read_register(&operands::register(instruction.operand(0)?)?)?),
            operand2: operands::operand2(instruction.operand(1)?)?,
        });
    }

    if operation.is_move() {
        instruction.expect_operands(2)?;
        return Ok(Operands {
            destination: Some(operands::register(instruction.operand(0)?)?),
            source: None,
            operand2: operands::operand2(instruction.operand(1)?)?,
        });
    }

    // The two operand form uses the destination as the first source
    let source_index = match count {
        2 => 0,
        _ => {
            instruction.expect_operands(3)?;
            1
        }
    };

    let destination = operands::register(instruction.operand(0)?)?;
    let source = operands::register(instruction.operand(source_index)?)?;
    Ok(Operands {
        destination: Some(destination),
        source: Some(instruction.read_register(&source)?),
        operand2: operands::operand2(instruction.operand(count - 1)?)?,
    })
}

pub(crate) fn translate(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
) -> Result<()> {
    let operation = Operation::from_mnemonic(instruction.mnemonic.base).ok_or_else(|| {
        Error::InternalTranslation(format!(
            "{} is not a data processing instruction",
            instruction.mnemonic.base
        ))
    })?;

    let set_flags = instruction.mnemonic.set_flags || operation.is_comparison();
    let Operands {
        destination,
        source,
        operand2,
    } = decode_operands(instruction, operation)?;

    let shifter_carry = set_flags && !operation.is_arithmetic();
    let ShifterOutput {
        value: operand2,
        carry: shifter_carry,
    } = shifter::lower_operand2(context, instruction, &operand2, shifter_carry)?;

    let source = || {
        source.clone().ok_or_else(|| {
            Error::InternalTranslation(format!(
                "{} requires a source register",
                instruction.mnemonic.base
            ))
        })
    };

    let result = if operation.is_arithmetic() {
        let (x, y, carry_in) = arithmetic_inputs(context, operation, source()?, operand2)?;
        let sum = add_with_carry(context, &x, &y, carry_in.as_ref(), set_flags)?;
        if set_flags {
            set_negative_zero(context, &sum, WORD)?;
        }
        sum
    } else {
        let result = logical(context, operation, source, &operand2)?;
        if set_flags {
            set_negative_zero(context, &result, WORD)?;
            if let Some(carry) = shifter_carry {
                context.store_register(&carry, &flag(CARRY)?)?;
            }
        }
        result
    };

    match destination {
        Some(destination) if !operation.is_comparison() => {
            write_register(context, &destination, &result)
        }
        _ => Ok(()),
    }
}

fn invert(context: &mut TranslationContext, value: &ReilOperand) -> Result<ReilOperand> {
    context.binary(ReilOpcode::Xor, value, &word(0xffff_ffff)?, WORD)
}

/// Express the operation as `x + y + carry_in`.
fn arithmetic_inputs(
    context: &mut TranslationContext,
    operation: Operation,
    source: ReilOperand,
    operand2: ReilOperand,
) -> Result<(ReilOperand, ReilOperand, Option<ReilOperand>)> {
    let carry = flag(CARRY)?;
    let inputs = match operation {
        Operation::Add | Operation::Cmn => (source, operand2, None),
        Operation::Adc => (source, operand2, Some(carry)),
        Operation::Sub | Operation::Cmp => {
            let inverted = invert(context, &operand2)?;
            (source, inverted, Some(one_bit(true)?))
        }
        Operation::Sbc => {
            let inverted = invert(context, &operand2)?;
            (source, inverted, Some(carry))
        }
        Operation::Rsb => {
            let inverted = invert(context, &source)?;
            (operand2, inverted, Some(one_bit(true)?))
        }
        Operation::Rsc => {
            let inverted = invert(context, &source)?;
            (operand2, inverted, Some(carry))
        }
        _ => {
            return Err(Error::InternalTranslation(format!(
                "{operation:?} is not an arithmetic operation"
            )))
        }
    };

    Ok(inputs)
}

/// Compute `x + y + carry_in` and return the 32-bit result. When `set_flags` is set, C receives
/// bit 32 of the full sum and V the signed overflow `((x ^ r) & (y ^ r)) >> 31`.
pub(crate) fn add_with_carry(
    context: &mut TranslationContext,
    x: &ReilOperand,
    y: &ReilOperand,
    carry_in: Option<&ReilOperand>,
    set_flags: bool,
) -> Result<ReilOperand> {
    let qword = OperandSize::Qword;
    let mut sum = context.binary(ReilOpcode::Add, x, y, qword)?;
    if let Some(carry_in) = carry_in {
        sum = context.binary(ReilOpcode::Add, &sum, carry_in, qword)?;
    }
    let result = context.resize(&sum, WORD)?;

    if set_flags {
        context.emit(
            ReilOpcode::Bsh,
            sum,
            signed_word(-32)?,
            flag(CARRY)?,
        )?;

        let x_changed = context.binary(ReilOpcode::Xor, x, &result, WORD)?;
        let y_changed = context.binary(ReilOpcode::Xor, y, &result, WORD)?;
        let both = context.binary(ReilOpcode::And, &x_changed, &y_changed, WORD)?;
        context.emit(
            ReilOpcode::Bsh,
            both,
            signed_word(-31)?,
            flag(OVERFLOW)?,
        )?;
    }

    Ok(result)
}

fn logical(
    context: &mut TranslationContext,
    operation: Operation,
    source: impl Fn() -> Result<ReilOperand>,
    operand2: &ReilOperand,
) -> Result<ReilOperand> {
    match operation {
        Operation::And | Operation::Tst => {
            context.binary(ReilOpcode::And, &source()?, operand2, WORD)
        }
        Operation::Eor | Operation::Teq => {
            context.binary(ReilOpcode::Xor, &source()?, operand2, WORD)
        }
        Operation::Orr => context.binary(ReilOpcode::Or, &source()?, operand2, WORD),
        Operation::Bic => {
            let inverted = invert(context, operand2)?;
            context.binary(ReilOpcode::And, &source()?, &inverted, WORD)
        }
        Operation::Mov => Ok(operand2.clone()),
        Operation::Mvn => invert(context, operand2),
        _ => Err(Error::InternalTranslation(format!(
            "{operation:?} is not a logical operation"
        ))),
    }
}
