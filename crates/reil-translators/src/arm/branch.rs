use reil::{ReilAddress, ReilOpcode};

use super::operands;
use super::{jump_to, one_bit, word, write_register, ArmInstruction, WORD};
use crate::environment::TranslationContext;
use crate::translator::{Error, Result};

/// Offset of the return address stored by `BL`.
const LINK_OFFSET: u64 = 4;

pub(crate) fn translate(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
) -> Result<()> {
    instruction.expect_operands(1)?;

    match instruction.mnemonic.base {
        "B" => branch(context, instruction),
        "BL" => {
            let link = instruction.address.wrapping_add(LINK_OFFSET) & 0xffff_ffff;
            write_register(context, "LR", &word(link)?)?;
            branch(context, instruction)
        }
        "BX" => {
            let register = operands::register(instruction.operand(0)?)?;
            let target = instruction.read_register(&register)?;

            // Bit 0 selects the instruction set and is not part of the address
            let target = context.binary(ReilOpcode::And, &target, &word(0xffff_fffe)?, WORD)?;
            jump_to(context, &target)
        }
        base => Err(Error::InternalTranslation(format!(
            "{base} is not a branch instruction"
        ))),
    }
}

/// Branch to an absolute immediate target.
fn branch(context: &mut TranslationContext, instruction: &ArmInstruction<'_>) -> Result<()> {
    let target = operands::immediate(instruction.operand(0)?)?;
    let target = u64::try_from(target).map_err(|_| {
        Error::UnsupportedOperandShape(format!("branch target {target} is negative"))
    })?;

    let target = TranslationContext::address_literal(ReilAddress::new(target, 0))?;
    context.jump(&one_bit(true)?, &target)
}
