//! Single register loads and stores.
//!
//! The offset address is computed before the access so that writeback always derives from the
//! original base register. Writeback is emitted after the access, except for loads into PC where
//! the jump must come last.

use reil::cpu::arm::ArmPolicy;
use reil::cpu::CpuPolicy;
use reil::{OperandSize, ReilOpcode, ReilOperand};

use super::operands::{self, Indexing, MemoryOperand, Offset};
use super::shifter;
use super::{sign_extend, word, write_register, ArmInstruction, WORD};
use crate::environment::TranslationContext;
use crate::translator::{Error, Result};

#[derive(Debug, Copy, Clone)]
struct Access {
    load: bool,
    size: OperandSize,
    signed: bool,
}

impl Access {
    fn from_mnemonic(base: &str) -> Option<Self> {
        let (load, size, signed) = match base {
            "LDR" => (true, OperandSize::Dword, false),
            "LDRB" => (true, OperandSize::Byte, false),
            "LDRH" => (true, OperandSize::Word, false),
            "LDRSB" => (true, OperandSize::Byte, true),
            "LDRSH" => (true, OperandSize::Word, true),
            "STR" => (false, OperandSize::Dword, false),
            "STRB" => (false, OperandSize::Byte, false),
            "STRH" => (false, OperandSize::Word, false),
            _ => return None,
        };

        Some(Self { load, size, signed })
    }
}

pub(crate) fn translate(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
) -> Result<()> {
    let access = Access::from_mnemonic(instruction.mnemonic.base).ok_or_else(|| {
        Error::InternalTranslation(format!(
            "{} is not a load or store instruction",
            instruction.mnemonic.base
        ))
    })?;

    instruction.expect_operands(2)?;
    let register = operands::register(instruction.operand(0)?)?;
    let memory = operands::memory(instruction.operand(1)?)?;

    let base = instruction.read_register(&memory.base)?;
    let offset_address = offset_address(context, instruction, &memory, &base)?;
    let address = match memory.indexing {
        Indexing::PostIndexed => &base,
        Indexing::Offset | Indexing::PreIndexed => &offset_address,
    };
    let writeback = match memory.indexing {
        Indexing::Offset => None,
        Indexing::PreIndexed | Indexing::PostIndexed => Some(&offset_address),
    };

    if access.load {
        let loaded = context.load(address, access.size)?;
        let value = match (access.size, access.signed) {
            (WORD, _) => loaded,
            (size, true) => sign_extend(context, &loaded, size, WORD)?,
            (_, false) => context.resize(&loaded, WORD)?,
        };

        if register == ArmPolicy.program_counter() {
            if let Some(writeback) = writeback {
                write_register(context, &memory.base, writeback)?;
            }
            return write_register(context, &register, &value);
        }

        write_register(context, &register, &value)?;
    } else {
        let mut value = instruction.read_register(&register)?;
        if access.size != WORD {
            value = truncate(context, &value, access.size)?;
        }
        context.store_memory(&value, address)?;
    }

    match writeback {
        Some(writeback) => write_register(context, &memory.base, writeback),
        None => Ok(()),
    }
}

fn truncate(
    context: &mut TranslationContext,
    value: &ReilOperand,
    size: OperandSize,
) -> Result<ReilOperand> {
    match value {
        ReilOperand::Literal { value, .. } => {
            Ok(ReilOperand::literal(value & size.mask() as u64, size)?)
        }
        _ => context.resize(value, size),
    }
}

/// Base register combined with the offset.
fn offset_address(
    context: &mut TranslationContext,
    instruction: &ArmInstruction<'_>,
    memory: &MemoryOperand,
    base: &ReilOperand,
) -> Result<ReilOperand> {
    let (opcode, offset) = match &memory.offset {
        Offset::Immediate(0) => return Ok(base.clone()),
        Offset::Immediate(offset) => {
            let opcode = if *offset < 0 {
                ReilOpcode::Sub
            } else {
                ReilOpcode::Add
            };
            let magnitude = u32::try_from(offset.unsigned_abs()).map_err(|_| {
                Error::UnsupportedOperandShape(format!("offset {offset} exceeds 32 bits"))
            })?;
            (opcode, word(magnitude.into())?)
        }
        Offset::Register {
            register,
            shift,
            subtract,
        } => {
            let mut offset = instruction.read_register(register)?;
            if let Some(shift) = shift {
                offset = shifter::lower_shift(context, instruction, &offset, shift, false)?.value;
            }

            let opcode = if *subtract {
                ReilOpcode::Sub
            } else {
                ReilOpcode::Add
            };
            (opcode, offset)
        }
    };

    context.binary(opcode, base, &offset, WORD)
}
