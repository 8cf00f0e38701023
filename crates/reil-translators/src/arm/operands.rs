//! Typed views of ARM operand trees.

use reil::cpu::arm::ArmPolicy;
use reil::cpu::CpuPolicy;

use crate::translator::{Error, Result};
use crate::tree::{ExpressionType, OperandNode, OperandTree};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
    Rrx,
}

impl ShiftKind {
    fn from_operator(operator: &str) -> Option<Self> {
        match operator.to_ascii_uppercase().as_str() {
            "LSL" | "ASL" => Some(Self::Lsl),
            "LSR" => Some(Self::Lsr),
            "ASR" => Some(Self::Asr),
            "ROR" => Some(Self::Ror),
            "RRX" => Some(Self::Rrx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum ShiftAmount {
    Immediate(u32),

    /// The low byte of the register is the amount.
    Register(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Shift {
    pub kind: ShiftKind,
    pub amount: ShiftAmount,
}

/// The flexible second operand of data processing instructions.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Operand2 {
    Immediate(u32),
    Register {
        register: String,
        shift: Option<Shift>,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Offset {
    Immediate(i64),
    Register {
        register: String,
        shift: Option<Shift>,
        subtract: bool,
    },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Indexing {
    /// `[Rn, offset]`
    Offset,

    /// `[Rn, offset]!`
    PreIndexed,

    /// `[Rn], offset`
    PostIndexed,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct MemoryOperand {
    pub base: String,
    pub offset: Offset,
    pub indexing: Indexing,
}

fn unsupported(node: &OperandNode, expected: &str) -> Error {
    Error::UnsupportedOperandShape(format!("expected {expected}, found {node}"))
}

/// Skip the size prefix at the root of an operand, if present.
fn strip_size_prefix(node: &OperandNode) -> Result<&OperandNode> {
    match (node.kind, node.children.as_slice()) {
        (ExpressionType::SizePrefix, [child]) => Ok(child),
        (ExpressionType::SizePrefix, _) => Err(unsupported(node, "a single sized operand")),
        _ => Ok(node),
    }
}

fn register_node(node: &OperandNode) -> Result<String> {
    if node.kind != ExpressionType::Register || !node.children.is_empty() {
        return Err(unsupported(node, "a register"));
    }

    ArmPolicy
        .canonical_register(&node.value)
        .map(str::to_string)
        .ok_or_else(|| Error::UnsupportedOperandShape(format!("unknown register {}", node.value)))
}

fn immediate_node(node: &OperandNode) -> Result<i64> {
    if node.kind != ExpressionType::ImmediateInteger || !node.children.is_empty() {
        return Err(unsupported(node, "an immediate"));
    }

    parse_immediate(&node.value)
}

/// Parse an immediate in decimal or `0x` hexadecimal notation with optional `#` and `-`
/// prefixes.
pub(crate) fn parse_immediate(text: &str) -> Result<i64> {
    let invalid = || Error::UnsupportedOperandShape(format!("invalid immediate {text:?}"));

    let digits = text.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    let (negative, digits) = match digits.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, digits),
    };

    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse::<u64>(),
    }
    .map_err(|_| invalid())?;

    let value = i64::try_from(magnitude).map_err(|_| invalid())?;
    Ok(if negative { -value } else { value })
}

/// Immediate as a 32-bit pattern. Negative values are accepted in two's complement.
fn word_immediate(value: i64, node: &OperandNode) -> Result<u32> {
    if let Ok(value) = u32::try_from(value) {
        return Ok(value);
    }

    i32::try_from(value)
        .map(|value| value as u32)
        .map_err(|_| unsupported(node, "a 32-bit immediate"))
}

pub(crate) fn register(tree: &OperandTree) -> Result<String> {
    register_node(strip_size_prefix(&tree.root)?)
}

pub(crate) fn immediate(tree: &OperandTree) -> Result<i64> {
    immediate_node(strip_size_prefix(&tree.root)?)
}

fn shift_amount(node: &OperandNode) -> Result<ShiftAmount> {
    match node.kind {
        ExpressionType::Register => Ok(ShiftAmount::Register(register_node(node)?)),
        ExpressionType::ImmediateInteger => {
            let amount = immediate_node(node)?;
            u32::try_from(amount)
                .ok()
                .filter(|amount| *amount <= 32)
                .map(ShiftAmount::Immediate)
                .ok_or_else(|| unsupported(node, "a shift amount between 0 and 32"))
        }
        _ => Err(unsupported(node, "a shift amount")),
    }
}

/// A register optionally shifted by an operator node.
fn shifted_register(node: &OperandNode) -> Result<(String, Option<Shift>)> {
    if node.kind == ExpressionType::Register {
        return Ok((register_node(node)?, None));
    }

    if node.kind != ExpressionType::Operator {
        return Err(unsupported(node, "a register or shifted register"));
    }

    let kind = ShiftKind::from_operator(&node.value)
        .ok_or_else(|| unsupported(node, "a shift operator"))?;

    match (kind, node.children.as_slice()) {
        (ShiftKind::Rrx, [register]) => Ok((
            register_node(register)?,
            Some(Shift {
                kind,
                amount: ShiftAmount::Immediate(1),
            }),
        )),
        (ShiftKind::Rrx, _) => Err(unsupported(node, "RRX applied to a register")),
        (_, [register, amount]) => Ok((
            register_node(register)?,
            Some(Shift {
                kind,
                amount: shift_amount(amount)?,
            }),
        )),
        _ => Err(unsupported(node, "a shift of a register by an amount")),
    }
}

pub(crate) fn operand2(tree: &OperandTree) -> Result<Operand2> {
    let node = strip_size_prefix(&tree.root)?;
    match node.kind {
        ExpressionType::ImmediateInteger => {
            let value = immediate_node(node)?;
            Ok(Operand2::Immediate(word_immediate(value, node)?))
        }
        _ => {
            let (register, shift) = shifted_register(node)?;
            Ok(Operand2::Register { register, shift })
        }
    }
}

fn offset(node: &OperandNode, subtract: bool) -> Result<Offset> {
    match (node.kind, node.value.as_str(), node.children.as_slice()) {
        (ExpressionType::ImmediateInteger, _, _) => {
            let value = immediate_node(node)?;
            Ok(Offset::Immediate(if subtract { -value } else { value }))
        }
        (ExpressionType::Operator, "-", [negated]) => offset(negated, !subtract),
        (ExpressionType::Operator, "+", [inner]) => offset(inner, subtract),
        _ => {
            let (register, shift) = shifted_register(node)?;
            Ok(Offset::Register {
                register,
                shift,
                subtract,
            })
        }
    }
}

/// Base register and offset of the expression inside a memory dereference.
fn address_expression(node: &OperandNode) -> Result<(String, Offset)> {
    match (node.kind, node.value.as_str(), node.children.as_slice()) {
        (ExpressionType::Register, _, _) => Ok((register_node(node)?, Offset::Immediate(0))),
        (ExpressionType::Operator, operator @ ("+" | "-"), [base, rhs]) => {
            Ok((register_node(base)?, offset(rhs, operator == "-")?))
        }
        _ => Err(unsupported(node, "a base register with an optional offset")),
    }
}

fn dereference(node: &OperandNode) -> Result<&OperandNode> {
    match (node.kind, node.children.as_slice()) {
        (ExpressionType::MemoryDereference, [address]) => Ok(address),
        _ => Err(unsupported(node, "a memory dereference")),
    }
}

pub(crate) fn memory(tree: &OperandTree) -> Result<MemoryOperand> {
    let node = strip_size_prefix(&tree.root)?;
    match (node.kind, node.value.as_str(), node.children.as_slice()) {
        (ExpressionType::MemoryDereference, _, _) => {
            let (base, offset) = address_expression(dereference(node)?)?;
            Ok(MemoryOperand {
                base,
                offset,
                indexing: Indexing::Offset,
            })
        }
        (ExpressionType::Operator, "!", [inner]) => {
            let (base, offset) = address_expression(dereference(inner)?)?;
            Ok(MemoryOperand {
                base,
                offset,
                indexing: Indexing::PreIndexed,
            })
        }
        (ExpressionType::Operator, ",", [inner, rhs]) => {
            let base = register_node(dereference(inner)?)?;
            Ok(MemoryOperand {
                base,
                offset: offset(rhs, false)?,
                indexing: Indexing::PostIndexed,
            })
        }
        _ => Err(unsupported(node, "a memory operand")),
    }
}
