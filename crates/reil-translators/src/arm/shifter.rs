//! Lowering of the ARM barrel shifter.
//!
//! Shifts are computed in a qword so that the bit shifted out remains available as the carry:
//! left shifts leave it at bit 32, right shifts operate on the value placed in the upper half and
//! leave it at bit 31. Amounts of 32 or more fall out of the computation naturally.

use reil::cpu::arm::CARRY;
use reil::{OperandSize, ReilOpcode, ReilOperand};

use super::operands::{Operand2, Shift, ShiftAmount, ShiftKind};
use super::{flag, signed_word, word, ArmInstruction, WORD};
use crate::environment::TranslationContext;
use crate::translator::Result;

pub(crate) struct ShifterOutput {
    pub value: ReilOperand,

    /// Carry out of the shifter. `None` leaves C unchanged.
    pub carry: Option<ReilOperand>,
}

impl ShifterOutput {
    fn unchanged(value: ReilOperand) -> Self {
        Self { value, carry: None }
    }
}

/// Lower the flexible second operand. The carry is only computed when `carry_out` is set.
pub(crate) fn lower_operand2(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
    operand: &Operand2,
    carry_out: bool,
) -> Result<ShifterOutput> {
    match operand {
        Operand2::Immediate(value) => {
            let value = u64::from(*value);
            // Immediates wider than 8 bits are encoded with a rotation which updates C
            let carry = if carry_out && value > 0xff {
                Some(ReilOperand::literal((value >> 31) & 1, OperandSize::Byte)?)
            } else {
                None
            };

            Ok(ShifterOutput {
                value: word(value)?,
                carry,
            })
        }
        Operand2::Register {
            register,
            shift: None,
        } => Ok(ShifterOutput::unchanged(instruction.read_register(register)?)),
        Operand2::Register {
            register,
            shift: Some(shift),
        } => {
            let value = instruction.read_register(register)?;
            lower_shift(context, instruction, &value, shift, carry_out)
        }
    }
}

/// Shift `value` as described by `shift`.
pub(crate) fn lower_shift(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
    value: &ReilOperand,
    shift: &Shift,
    carry_out: bool,
) -> Result<ShifterOutput> {
    if shift.kind == ShiftKind::Rrx {
        return rotate_extended(context, value, carry_out);
    }

    match &shift.amount {
        ShiftAmount::Immediate(0) => Ok(ShifterOutput::unchanged(value.clone())),
        ShiftAmount::Immediate(amount) => {
            shift_by(context, shift.kind, value, &word((*amount).into())?, carry_out)
        }
        ShiftAmount::Register(register) => {
            let register = instruction.read_register(register)?;
            let amount = context.binary(ReilOpcode::And, &register, &word(0xff)?, WORD)?;
            let mut output = shift_by(context, shift.kind, value, &amount, carry_out)?;

            // A zero amount leaves C unchanged
            if let Some(computed) = output.carry.take() {
                let byte = OperandSize::Byte;
                let carry = flag(CARRY)?;
                let zero_amount = context.is_zero(&amount)?;
                let shifted = context.is_zero(&zero_amount)?;
                let kept = context.binary(ReilOpcode::And, &zero_amount, &carry, byte)?;
                let produced = context.binary(ReilOpcode::And, &shifted, &computed, byte)?;
                output.carry = Some(context.binary(ReilOpcode::Or, &kept, &produced, byte)?);
            }

            Ok(output)
        }
    }
}

/// Negate a shift amount so that `bsh` shifts right.
fn negate(context: &mut TranslationContext, amount: &ReilOperand) -> Result<ReilOperand> {
    match amount {
        ReilOperand::Literal { value, .. } => signed_word(-(*value as i64)),
        _ => context.binary(ReilOpcode::Sub, &word(0)?, amount, WORD),
    }
}

fn shift_by(
    context: &mut TranslationContext,
    kind: ShiftKind,
    value: &ReilOperand,
    amount: &ReilOperand,
    carry_out: bool,
) -> Result<ShifterOutput> {
    match kind {
        ShiftKind::Lsl => shift_left(context, value, amount, carry_out),
        ShiftKind::Lsr => shift_right(context, value, amount, carry_out),
        ShiftKind::Asr => arithmetic_shift_right(context, value, amount, carry_out),
        ShiftKind::Ror => rotate_right(context, value, amount, carry_out),
        ShiftKind::Rrx => rotate_extended(context, value, carry_out),
    }
}

fn shift_left(
    context: &mut TranslationContext,
    value: &ReilOperand,
    amount: &ReilOperand,
    carry_out: bool,
) -> Result<ShifterOutput> {
    let wide = context.binary(ReilOpcode::Bsh, value, amount, OperandSize::Qword)?;
    let result = context.resize(&wide, WORD)?;

    let carry = if carry_out {
        let byte = OperandSize::Byte;
        let high = context.binary(ReilOpcode::Bsh, &wide, &signed_word(-32)?, byte)?;
        Some(context.binary(ReilOpcode::And, &high, &ReilOperand::literal(1, byte)?, byte)?)
    } else {
        None
    };

    Ok(ShifterOutput {
        value: result,
        carry,
    })
}

fn shift_right(
    context: &mut TranslationContext,
    value: &ReilOperand,
    amount: &ReilOperand,
    carry_out: bool,
) -> Result<ShifterOutput> {
    let qword = OperandSize::Qword;
    let upper = context.binary(ReilOpcode::Bsh, value, &word(32)?, qword)?;
    let right = negate(context, amount)?;
    let shifted = context.binary(ReilOpcode::Bsh, &upper, &right, qword)?;
    let result = context.binary(ReilOpcode::Bsh, &shifted, &signed_word(-32)?, WORD)?;

    let carry = if carry_out {
        let byte = OperandSize::Byte;
        let last = context.binary(ReilOpcode::Bsh, &shifted, &signed_word(-31)?, byte)?;
        Some(context.binary(ReilOpcode::And, &last, &ReilOperand::literal(1, byte)?, byte)?)
    } else {
        None
    };

    Ok(ShifterOutput {
        value: result,
        carry,
    })
}

/// `((value ^ m) >> amount) ^ m` where `m` is all ones for negative values.
fn arithmetic_shift_right(
    context: &mut TranslationContext,
    value: &ReilOperand,
    amount: &ReilOperand,
    carry_out: bool,
) -> Result<ShifterOutput> {
    let sign = context.binary(ReilOpcode::Bsh, value, &signed_word(-31)?, WORD)?;
    let mask = context.binary(ReilOpcode::Sub, &word(0)?, &sign, WORD)?;
    let flipped = context.binary(ReilOpcode::Xor, value, &mask, WORD)?;

    let shifted = shift_right(context, &flipped, amount, carry_out)?;
    let result = context.binary(ReilOpcode::Xor, &shifted.value, &mask, WORD)?;
    let carry = match shifted.carry {
        Some(carry) => Some(context.binary(
            ReilOpcode::Xor,
            &carry,
            &sign,
            OperandSize::Byte,
        )?),
        None => None,
    };

    Ok(ShifterOutput {
        value: result,
        carry,
    })
}

fn rotate_right(
    context: &mut TranslationContext,
    value: &ReilOperand,
    amount: &ReilOperand,
    carry_out: bool,
) -> Result<ShifterOutput> {
    let (rotation, left_amount) = match amount {
        ReilOperand::Literal { value, .. } => {
            let rotation = value & 31;
            (word(rotation)?, word(32 - rotation)?)
        }
        _ => {
            let rotation = context.binary(ReilOpcode::And, amount, &word(31)?, WORD)?;
            let left_amount = context.binary(ReilOpcode::Sub, &word(32)?, &rotation, WORD)?;
            (rotation, left_amount)
        }
    };

    let right_amount = negate(context, &rotation)?;
    let right = context.binary(ReilOpcode::Bsh, value, &right_amount, WORD)?;
    let left = context.binary(ReilOpcode::Bsh, value, &left_amount, WORD)?;
    let result = context.binary(ReilOpcode::Or, &right, &left, WORD)?;

    let carry = if carry_out {
        Some(context.binary(
            ReilOpcode::Bsh,
            &result,
            &signed_word(-31)?,
            OperandSize::Byte,
        )?)
    } else {
        None
    };

    Ok(ShifterOutput {
        value: result,
        carry,
    })
}

/// Rotate right by one through the carry flag.
fn rotate_extended(
    context: &mut TranslationContext,
    value: &ReilOperand,
    carry_out: bool,
) -> Result<ShifterOutput> {
    let high = context.binary(ReilOpcode::Bsh, &flag(CARRY)?, &word(31)?, WORD)?;
    let low = context.binary(ReilOpcode::Bsh, value, &signed_word(-1)?, WORD)?;
    let result = context.binary(ReilOpcode::Or, &high, &low, WORD)?;

    let carry = if carry_out {
        Some(context.binary(
            ReilOpcode::And,
            value,
            &ReilOperand::literal(1, OperandSize::Byte)?,
            OperandSize::Byte,
        )?)
    } else {
        None
    };

    Ok(ShifterOutput {
        value: result,
        carry,
    })
}
