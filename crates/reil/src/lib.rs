//! This crate defines the REIL (Reverse Engineering Intermediate Language) data model. Native
//! instructions are lowered into short sequences of REIL instructions that capture the full
//! semantics of the native instruction using a small set of opcodes.
//!
//! ### Instructions
//!
//! A [ReilInstruction] is an [ReilOpcode] with three operands. The first two operands are inputs
//! and the third operand is the output, with the exception of [ReilOpcode::Stm] and
//! [ReilOpcode::Jcc] whose third operand is an address. Every instruction is located at a
//! [ReilAddress] which identifies both the native instruction it was translated from and its
//! position within that translation.
//!
//! ### CPU policies
//!
//! The [cpu::CpuPolicy] trait describes the register file, flags, and condition codes of a native
//! architecture. Both translation and interpretation consult the policy rather than hardcoding
//! architecture details.

/// Per-architecture descriptions of registers, flags and condition codes.
pub mod cpu;

mod instruction;
mod opcode;
mod operand;
mod value;

pub use instruction::*;
pub use opcode::*;
pub use operand::*;
pub use value::*;

/// Errors raised while constructing or inspecting REIL values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An operand, operand size, or instruction shape is not valid.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// The textual opcode does not name a REIL opcode.
    #[error("unknown opcode {0:?}")]
    UnknownOpcode(String),

    /// The condition code symbol is not known to the CPU policy.
    #[error("unknown condition code {0:?}")]
    UnknownCondition(String),

    /// A flag required to evaluate a condition has no defined value.
    #[error("flag {0} is not defined")]
    UndefinedFlag(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
