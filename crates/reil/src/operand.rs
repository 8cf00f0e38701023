use crate::{Error, Result};

/// The width of a REIL operand. The width determines how many bits of a value participate in an
/// operation and how results are masked.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum OperandSize {
    Byte,
    Word,
    Dword,
    Qword,
}

impl OperandSize {
    pub const fn bits(self) -> u32 {
        match self {
            OperandSize::Byte => 8,
            OperandSize::Word => 16,
            OperandSize::Dword => 32,
            OperandSize::Qword => 64,
        }
    }

    pub const fn bytes(self) -> usize {
        (self.bits() / u8::BITS) as usize
    }

    /// Bitmask covering every bit of this size.
    pub const fn mask(self) -> u128 {
        u128::MAX >> (u128::BITS - self.bits())
    }

    /// Mask with only the most significant bit of this size set.
    pub const fn sign_bit(self) -> u128 {
        1 << (self.bits() - 1)
    }

    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            8 => Ok(OperandSize::Byte),
            16 => Ok(OperandSize::Word),
            32 => Ok(OperandSize::Dword),
            64 => Ok(OperandSize::Qword),
            _ => Err(Error::InvalidOperand(format!(
                "unsupported operand width of {bits} bits"
            ))),
        }
    }

    pub fn from_bytes(bytes: usize) -> Result<Self> {
        u32::try_from(bytes)
            .ok()
            .and_then(|bytes| bytes.checked_mul(u8::BITS))
            .ok_or_else(|| {
                Error::InvalidOperand(format!("unsupported operand width of {bytes} bytes"))
            })
            .and_then(Self::from_bits)
    }

    /// The next wider size, used to hold carries out of this size.
    pub fn wider(self) -> Option<Self> {
        match self {
            OperandSize::Byte => Some(OperandSize::Word),
            OperandSize::Word => Some(OperandSize::Dword),
            OperandSize::Dword => Some(OperandSize::Qword),
            OperandSize::Qword => None,
        }
    }
}

impl std::fmt::Display for OperandSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperandSize::Byte => "byte",
            OperandSize::Word => "word",
            OperandSize::Dword => "dword",
            OperandSize::Qword => "qword",
        };
        f.write_str(name)
    }
}

/// Parses either a size name (`dword`) or a disassembler size prefix giving the width in bytes
/// (`b4`).
impl std::str::FromStr for OperandSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "byte" => Ok(OperandSize::Byte),
            "word" => Ok(OperandSize::Word),
            "dword" => Ok(OperandSize::Dword),
            "qword" => Ok(OperandSize::Qword),
            _ => lower
                .strip_prefix('b')
                .and_then(|bytes| bytes.parse::<usize>().ok())
                .ok_or_else(|| Error::InvalidOperand(format!("unknown operand size {s:?}")))
                .and_then(Self::from_bytes),
        }
    }
}

/// An operand of a [crate::ReilInstruction].
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub enum ReilOperand {
    /// The operand slot is unused.
    #[default]
    Empty,

    /// An integer constant. [crate::ReilInstruction::validate] rejects values that do not fit
    /// in the declared size.
    Literal { value: u64, size: OperandSize },

    /// A native or temporary register.
    Register { name: String, size: OperandSize },
}

impl ReilOperand {
    /// Create an integer literal. Fails if the value does not fit in the given size.
    pub fn literal(value: u64, size: OperandSize) -> Result<Self> {
        if u128::from(value) & size.mask() != u128::from(value) {
            return Err(Error::InvalidOperand(format!(
                "literal {value:#x} does not fit in a {size}"
            )));
        }

        Ok(Self::Literal { value, size })
    }

    /// Create an integer literal from a signed value, stored in two's complement. Fails if the
    /// value is outside the signed range of the given size.
    pub fn signed_literal(value: i64, size: OperandSize) -> Result<Self> {
        let min = -(1i128 << (size.bits() - 1));
        let max = (1i128 << (size.bits() - 1)) - 1;
        if !(min..=max).contains(&i128::from(value)) {
            return Err(Error::InvalidOperand(format!(
                "signed literal {value} does not fit in a {size}"
            )));
        }

        // Two's complement truncation to the operand width
        let bits = (i128::from(value) as u128) & size.mask();
        Ok(Self::Literal {
            value: bits as u64,
            size,
        })
    }

    pub fn register(name: impl Into<String>, size: OperandSize) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidOperand(format!(
                "invalid register name {name:?}"
            )));
        }

        Ok(Self::Register { name, size })
    }

    pub fn size(&self) -> Option<OperandSize> {
        match self {
            ReilOperand::Empty => None,
            ReilOperand::Literal { size, .. } | ReilOperand::Register { size, .. } => Some(*size),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ReilOperand::Empty)
    }

    pub fn register_name(&self) -> Option<&str> {
        match self {
            ReilOperand::Register { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn literal_value(&self) -> Option<u64> {
        match self {
            ReilOperand::Literal { value, .. } => Some(*value),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReilOperand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReilOperand::Empty => f.write_str("empty"),
            ReilOperand::Literal { value, size } => write!(f, "{size} {value:#x}"),
            ReilOperand::Register { name, size } => write!(f, "{size} {name}"),
        }
    }
}
