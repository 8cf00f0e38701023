use reil::cpu::arm::{Condition, Predicate};
use reil::{OperandSize, ReilOpcode, ReilOperand};

use super::{flag, one_bit};
use crate::environment::TranslationContext;
use crate::translator::Result;

/// Lower a condition code to a byte operand that is 1 when the condition holds and 0 otherwise.
pub(crate) fn lower(context: &mut TranslationContext, condition: Condition) -> Result<ReilOperand> {
    lower_predicate(context, &condition.predicate())
}

fn lower_predicate(
    context: &mut TranslationContext,
    predicate: &Predicate,
) -> Result<ReilOperand> {
    let (opcode, lhs, rhs) = match predicate {
        Predicate::True => return one_bit(true),
        Predicate::Flag(name) => return flag(name),
        Predicate::Not(inner) => {
            let inner = lower_predicate(context, inner)?;
            return context.is_zero(&inner);
        }
        Predicate::And(lhs, rhs) => (ReilOpcode::And, lhs, rhs),
        Predicate::Or(lhs, rhs) => (ReilOpcode::Or, lhs, rhs),
        Predicate::Xor(lhs, rhs) => (ReilOpcode::Xor, lhs, rhs),
    };

    let lhs = lower_predicate(context, lhs)?;
    let rhs = lower_predicate(context, rhs)?;
    context.binary(opcode, &lhs, &rhs, OperandSize::Byte)
}
