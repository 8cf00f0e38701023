//! This crate lowers native instructions into REIL. A native instruction is presented as a
//! mnemonic together with operand trees produced by a disassembler front-end, and each
//! [translator::Translator] emits the REIL sequence reproducing its architectural effect.
//!
//! ### Translation context
//!
//! Every translation runs inside a [environment::TranslationContext] which assigns REIL addresses,
//! allocates temporary registers and resolves intra-instruction jumps. The context is reset at
//! the start of each translation, so translating the same instruction twice produces identical
//! output.
//!
//! ### Architectures
//!
//! * [arm::ArmTranslator] handles 32-bit ARM data processing, multiply, load/store, branch and
//!   saturating instructions with conditional execution.

/// ARM instruction translators.
pub mod arm;

/// Module for the per-translation emission state.
pub mod environment;

/// Translator contract and mnemonic registry.
pub mod translator;

/// Operand tree abstraction consumed by translators.
pub mod tree;

pub use environment::{Label, TranslationContext};
pub use translator::{Error, Result, Translator, TranslatorLibrary};
pub use tree::{ExpressionType, Instruction, NativeInstruction, OperandNode, OperandTree};

#[cfg(test)]
mod test_fixture;

#[cfg(test)]
mod tests;
