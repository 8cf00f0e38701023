use std::collections::BTreeMap;

use reil::ReilInstruction;
use tracing::debug;

use crate::environment::TranslationContext;
use crate::tree::Instruction;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The operands do not have a shape the translator understands.
    #[error("unsupported operand shape: {0}")]
    UnsupportedOperandShape(String),

    /// An invariant was violated while emitting REIL.
    #[error("internal translation error: {0}")]
    InternalTranslation(String),

    /// No translator is registered for the mnemonic.
    #[error("unsupported mnemonic {0:?}")]
    UnsupportedMnemonic(String),

    #[error(transparent)]
    Operand(#[from] reil::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Lowers native instructions into REIL.
pub trait Translator {
    /// Emit the REIL sequence for the instruction into the context. The context has already been
    /// reset for the instruction address.
    fn lower(&self, context: &mut TranslationContext, instruction: &dyn Instruction) -> Result<()>;

    /// Translate the instruction and append the resulting REIL sequence to `output`. Nothing is
    /// appended if translation fails.
    fn translate(
        &self,
        context: &mut TranslationContext,
        instruction: &dyn Instruction,
        output: &mut Vec<ReilInstruction>,
    ) -> Result<()> {
        context.begin(instruction.address());
        self.lower(context, instruction)?;
        let instructions = context.finish()?;

        debug!(
            address = instruction.address(),
            mnemonic = instruction.mnemonic(),
            count = instructions.len(),
            "translated native instruction"
        );
        output.extend(instructions);
        Ok(())
    }
}

/// Registry mapping upper-case mnemonics to translation entries.
#[derive(Debug, Clone)]
pub struct TranslatorLibrary<T> {
    translators: BTreeMap<&'static str, T>,
}

impl<T> Default for TranslatorLibrary<T> {
    fn default() -> Self {
        Self {
            translators: Default::default(),
        }
    }
}

impl<T> TranslatorLibrary<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a translator, returning the translator previously registered for the mnemonic.
    pub fn register(&mut self, mnemonic: &'static str, translator: T) -> Option<T> {
        self.translators.insert(mnemonic, translator)
    }

    pub fn get(&self, mnemonic: &str) -> Option<&T> {
        self.translators.get(mnemonic)
    }

    /// Registered mnemonics, longest first. Architectures whose mnemonics carry suffixes match
    /// in this order so that a longer mnemonic is never mistaken for a shorter one plus suffix.
    pub fn mnemonics_longest_first(&self) -> Vec<&'static str> {
        let mut mnemonics: Vec<_> = self.translators.keys().copied().collect();
        mnemonics.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        mnemonics
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }
}
