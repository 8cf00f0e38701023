/// Kind of an [OperandNode].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ExpressionType {
    /// A register name, e.g. `R1`.
    Register,

    /// An integer in decimal or `0x` hexadecimal notation, optionally prefixed by `#` or `-`.
    ImmediateInteger,

    /// A memory access of the address described by its child.
    MemoryDereference,

    /// An operator applied to its children, e.g. `+`, `,`, `!` or a shift such as `LSL`.
    Operator,

    /// The access width of its child in the form `b<bytes>`, e.g. `b4`.
    SizePrefix,
}

/// A node of an operand tree as produced by a disassembler front-end.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct OperandNode {
    pub kind: ExpressionType,
    pub value: String,
    pub children: Vec<OperandNode>,
}

impl OperandNode {
    pub fn new(kind: ExpressionType, value: impl Into<String>, children: Vec<OperandNode>) -> Self {
        Self {
            kind,
            value: value.into(),
            children,
        }
    }

    pub fn register(name: impl Into<String>) -> Self {
        Self::new(ExpressionType::Register, name, Vec::new())
    }

    pub fn immediate(value: impl Into<String>) -> Self {
        Self::new(ExpressionType::ImmediateInteger, value, Vec::new())
    }

    pub fn memory_dereference(address: OperandNode) -> Self {
        Self::new(ExpressionType::MemoryDereference, "[", vec![address])
    }

    pub fn operator(operator: impl Into<String>, children: Vec<OperandNode>) -> Self {
        Self::new(ExpressionType::Operator, operator, children)
    }

    pub fn size_prefix(size: impl Into<String>, child: OperandNode) -> Self {
        Self::new(ExpressionType::SizePrefix, size, vec![child])
    }

    pub fn child(&self, index: usize) -> Option<&OperandNode> {
        self.children.get(index)
    }
}

impl std::fmt::Display for OperandNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind, self.children.as_slice()) {
            (ExpressionType::SizePrefix, [child]) => write!(f, "{} {child}", self.value),
            (ExpressionType::MemoryDereference, [child]) => write!(f, "[{child}]"),
            (ExpressionType::Operator, [child]) if self.value == "!" => write!(f, "{child}!"),
            (ExpressionType::Operator, [child]) if self.value.len() == 1 => {
                write!(f, "{}{child}", self.value)
            }
            (ExpressionType::Operator, [child]) => write!(f, "{child} {}", self.value),
            (ExpressionType::Operator, [lhs, rhs]) if self.value == "," => {
                write!(f, "{lhs}, {rhs}")
            }
            (ExpressionType::Operator, [lhs, rhs]) if self.value.len() == 1 => {
                write!(f, "{lhs}{}{rhs}", self.value)
            }
            (ExpressionType::Operator, [lhs, rhs]) => write!(f, "{lhs} {} {rhs}", self.value),
            (_, children) => {
                f.write_str(&self.value)?;
                for child in children {
                    write!(f, " {child}")?;
                }
                Ok(())
            }
        }
    }
}

/// The tree describing a single operand of a native instruction.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct OperandTree {
    pub root: OperandNode,
}

impl OperandTree {
    pub fn new(root: OperandNode) -> Self {
        Self { root }
    }
}

impl std::fmt::Display for OperandTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.root.fmt(f)
    }
}

/// A disassembled native instruction.
pub trait Instruction {
    /// Address of the instruction in the native address space.
    fn address(&self) -> u64;

    fn mnemonic(&self) -> &str;

    fn operands(&self) -> &[OperandTree];
}

/// Plain [Instruction] implementation for callers that build operand trees directly.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct NativeInstruction {
    pub address: u64,
    pub mnemonic: String,
    pub operands: Vec<OperandTree>,
}

impl NativeInstruction {
    pub fn new(address: u64, mnemonic: impl Into<String>, operands: Vec<OperandTree>) -> Self {
        Self {
            address,
            mnemonic: mnemonic.into(),
            operands,
        }
    }
}

impl Instruction for NativeInstruction {
    fn address(&self) -> u64 {
        self.address
    }

    fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    fn operands(&self) -> &[OperandTree] {
        &self.operands
    }
}

impl std::fmt::Display for NativeInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:#x}] {}", self.address, self.mnemonic)?;
        for (index, operand) in self.operands.iter().enumerate() {
            let separator = if index == 0 { " " } else { ", " };
            write!(f, "{separator}{operand}")?;
        }

        Ok(())
    }
}
