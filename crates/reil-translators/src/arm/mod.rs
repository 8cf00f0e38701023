//! Translators for 32-bit ARM.
//!
//! Mnemonics are decoded as `<base>[S][<cond>]` or `<base>[<cond>][S]`. Instructions with a
//! condition other than `AL` evaluate the condition first and jump over the body to a trailing
//! `nop` when it does not hold.

use reil::cpu::arm::{ArmPolicy, Condition, NEGATIVE, ZERO};
use reil::cpu::CpuPolicy;
use reil::{OperandSize, ReilAddress, ReilOpcode, ReilOperand};

use crate::environment::TranslationContext;
use crate::translator::{Error, Result, Translator, TranslatorLibrary};
use crate::tree::{Instruction, OperandTree};

mod branch;
mod condition;
mod data;
mod memory;
mod misc;
mod multiply;
pub(crate) mod operands;
mod shifter;

/// Width of ARM registers.
pub(crate) const WORD: OperandSize = OperandSize::Dword;

/// Offset of the value read from PC relative to the instruction address.
const PC_READ_OFFSET: u64 = 8;

type TranslateFn = fn(&mut TranslationContext, &ArmInstruction<'_>) -> Result<()>;

/// Whether a mnemonic accepts the `S` suffix.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum FlagSuffix {
    Never,
    Optional,

    /// Flags are always set. The suffix is accepted but redundant.
    Implied,
}

#[derive(Copy, Clone)]
struct ArmEntry {
    translate: TranslateFn,
    suffix: FlagSuffix,
}

/// A decoded ARM mnemonic.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ArmMnemonic {
    pub base: &'static str,
    pub condition: Condition,
    pub set_flags: bool,
}

/// An ARM instruction with its mnemonic decoded.
pub(crate) struct ArmInstruction<'a> {
    pub address: u64,
    pub mnemonic: ArmMnemonic,
    pub operands: &'a [OperandTree],
}

impl ArmInstruction<'_> {
    pub fn expect_operands(&self, count: usize) -> Result<()> {
        if self.operands.len() != count {
            return Err(Error::UnsupportedOperandShape(format!(
                "{} expects {count} operand(s), found {}",
                self.mnemonic.base,
                self.operands.len()
            )));
        }

        Ok(())
    }

    pub fn operand(&self, index: usize) -> Result<&OperandTree> {
        self.operands.get(index).ok_or_else(|| {
            Error::InternalTranslation(format!(
                "{} has no operand {index}",
                self.mnemonic.base
            ))
        })
    }

    /// Value of an ARM register as an operand. Reads of PC produce the instruction address + 8.
    pub fn read_register(&self, name: &str) -> Result<ReilOperand> {
        if name == ArmPolicy.program_counter() {
            let value = self.address.wrapping_add(PC_READ_OFFSET) & 0xffff_ffff;
            return word(value);
        }

        Ok(ReilOperand::register(name, WORD)?)
    }
}

pub(crate) fn word(value: u64) -> Result<ReilOperand> {
    Ok(ReilOperand::literal(value, WORD)?)
}

pub(crate) fn signed_word(value: i64) -> Result<ReilOperand> {
    Ok(ReilOperand::signed_literal(value, WORD)?)
}

pub(crate) fn flag(name: &str) -> Result<ReilOperand> {
    Ok(ReilOperand::register(name, OperandSize::Byte)?)
}

pub(crate) fn one_bit(value: bool) -> Result<ReilOperand> {
    Ok(ReilOperand::literal(value.into(), OperandSize::Byte)?)
}

/// Write an ARM register. Writes to PC end with a jump to the written value.
pub(crate) fn write_register(
    context: &mut TranslationContext,
    name: &str,
    value: &ReilOperand,
) -> Result<()> {
    context.store_register(value, &ReilOperand::register(name, WORD)?)?;
    if name == ArmPolicy.program_counter() {
        jump_to(context, value)?;
    }

    Ok(())
}

/// Unconditionally jump to the first REIL instruction of the native address held in `target`.
pub(crate) fn jump_to(context: &mut TranslationContext, target: &ReilOperand) -> Result<()> {
    let target = match target {
        ReilOperand::Literal { value, .. } => {
            TranslationContext::address_literal(ReilAddress::new(*value, 0))?
        }
        _ => context.binary(
            ReilOpcode::Bsh,
            target,
            &word(ReilAddress::SUB_INDEX_BITS.into())?,
            OperandSize::Qword,
        )?,
    };

    context.jump(&one_bit(true)?, &target)
}

/// Sign extend `value` from `from` to `to` using shifts and a subtraction.
pub(crate) fn sign_extend(
    context: &mut TranslationContext,
    value: &ReilOperand,
    from: OperandSize,
    to: OperandSize,
) -> Result<ReilOperand> {
    let sign_shift = -i64::from(from.bits() - 1);
    let sign = context.binary(ReilOpcode::Bsh, value, &signed_word(sign_shift)?, to)?;
    let fill = context.binary(ReilOpcode::Sub, &ReilOperand::literal(0, to)?, &sign, to)?;
    let high = context.binary(ReilOpcode::Bsh, &fill, &word(from.bits().into())?, to)?;
    context.binary(ReilOpcode::Or, value, &high, to)
}

/// Set N from the most significant bit of `result` and Z from whether it is zero.
pub(crate) fn set_negative_zero(
    context: &mut TranslationContext,
    result: &ReilOperand,
    size: OperandSize,
) -> Result<()> {
    let sign_shift = -i64::from(size.bits() - 1);
    context.emit(
        ReilOpcode::Bsh,
        result.clone(),
        signed_word(sign_shift)?,
        flag(NEGATIVE)?,
    )?;
    context.emit(
        ReilOpcode::Bisz,
        result.clone(),
        ReilOperand::Empty,
        flag(ZERO)?,
    )
}

/// Translator for 32-bit ARM instructions.
#[derive(Clone)]
pub struct ArmTranslator {
    library: TranslatorLibrary<ArmEntry>,
}

impl Default for ArmTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArmTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmTranslator")
            .field("mnemonics", &self.library.len())
            .finish()
    }
}

impl ArmTranslator {
    pub fn new() -> Self {
        let mut library = TranslatorLibrary::new();
        let mut register = |mnemonics: &[&'static str], translate: TranslateFn, suffix| {
            for &mnemonic in mnemonics {
                library.register(mnemonic, ArmEntry { translate, suffix });
            }
        };

        register(
            &[
                "AND", "EOR", "SUB", "RSB", "ADD", "ADC", "SBC", "RSC", "ORR", "MOV", "BIC", "MVN",
            ],
            data::translate,
            FlagSuffix::Optional,
        );
        register(
            &["TST", "TEQ", "CMP", "CMN"],
            data::translate,
            FlagSuffix::Implied,
        );
        register(
            &["MUL", "MLA", "UMULL", "SMULL", "UMLAL", "SMLAL"],
            multiply::translate,
            FlagSuffix::Optional,
        );
        register(
            &["LDR", "LDRB", "LDRH", "LDRSB", "LDRSH", "STR", "STRB", "STRH"],
            memory::translate,
            FlagSuffix::Never,
        );
        register(&["B", "BL", "BX"], branch::translate, FlagSuffix::Never);
        register(&["QADD", "QSUB"], misc::saturating, FlagSuffix::Never);
        register(&["NOP"], misc::nop, FlagSuffix::Never);
        register(&["SVC", "SWI"], misc::supervisor_call, FlagSuffix::Never);

        Self { library }
    }

    /// Mnemonics with a registered translator, excluding suffixes.
    pub fn mnemonics(&self) -> Vec<&'static str> {
        self.library.mnemonics_longest_first()
    }

    /// Split a mnemonic into its base, condition and flag suffix.
    pub fn decode(&self, mnemonic: &str) -> Result<ArmMnemonic> {
        self.decode_entry(mnemonic).map(|(_, mnemonic)| mnemonic)
    }

    fn decode_entry(&self, mnemonic: &str) -> Result<(ArmEntry, ArmMnemonic)> {
        let upper = mnemonic.trim().to_ascii_uppercase();

        for base in self.library.mnemonics_longest_first() {
            let Some(suffix) = upper.strip_prefix(base) else {
                continue;
            };
            let Some(&entry) = self.library.get(base) else {
                continue;
            };

            if let Some((set_flags, condition)) = parse_suffix(suffix, entry.suffix) {
                return Ok((
                    entry,
                    ArmMnemonic {
                        base,
                        condition,
                        set_flags,
                    },
                ));
            }
        }

        Err(Error::UnsupportedMnemonic(mnemonic.to_string()))
    }
}

/// Parse the flag and condition suffixes following a base mnemonic.
fn parse_suffix(suffix: &str, flags: FlagSuffix) -> Option<(bool, Condition)> {
    let allows_s = flags != FlagSuffix::Never;
    let condition = |text: &str| text.parse::<Condition>().ok();

    let (set_flags, condition) = if suffix.is_empty() {
        (false, Condition::Al)
    } else if let Some(condition) = condition(suffix) {
        (false, condition)
    } else if !allows_s {
        return None;
    } else if suffix == "S" {
        (true, Condition::Al)
    } else if let Some(condition) = suffix.strip_prefix('S').and_then(condition) {
        (true, condition)
    } else {
        (true, suffix.strip_suffix('S').and_then(condition)?)
    };

    Some((set_flags || flags == FlagSuffix::Implied, condition))
}

impl Translator for ArmTranslator {
    fn lower(&self, context: &mut TranslationContext, instruction: &dyn Instruction) -> Result<()> {
        let (entry, mnemonic) = self.decode_entry(instruction.mnemonic())?;
        let arm = ArmInstruction {
            address: instruction.address(),
            mnemonic,
            operands: instruction.operands(),
        };

        let skip = match mnemonic.condition {
            Condition::Al => None,
            required => {
                let holds = condition::lower(context, required)?;
                let fails = context.is_zero(&holds)?;
                let label = context.new_label();
                context.jump_if(&fails, label)?;
                Some(label)
            }
        };

        (entry.translate)(context, &arm)?;

        if let Some(label) = skip {
            context.bind(label)?;
            context.nop()?;
        }

        Ok(())
    }
}
