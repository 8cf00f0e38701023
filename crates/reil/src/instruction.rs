use crate::{Error, ReilOpcode, ReilOperand, Result};

/// Location of a REIL instruction. The native address identifies the native instruction the REIL
/// instruction was translated from, and the sub-index is its position within that translation.
///
/// The encoded form is `(native << 8) | sub`, so at most 256 REIL instructions can be produced
/// for a single native instruction. Ordering matches the encoded ordering.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ReilAddress {
    native: u64,
    sub: u8,
}

impl ReilAddress {
    pub const SUB_INDEX_BITS: u32 = u8::BITS;

    pub fn new(native: u64, sub: u8) -> Self {
        Self { native, sub }
    }

    pub fn native(&self) -> u64 {
        self.native
    }

    pub fn sub(&self) -> u8 {
        self.sub
    }

    pub fn encoded(&self) -> u128 {
        (u128::from(self.native) << Self::SUB_INDEX_BITS) | u128::from(self.sub)
    }

    pub fn from_encoded(encoded: u128) -> Result<Self> {
        let native = u64::try_from(encoded >> Self::SUB_INDEX_BITS).map_err(|_| {
            Error::InvalidOperand(format!(
                "encoded address {encoded:#x} exceeds the native address range"
            ))
        })?;

        Ok(Self {
            native,
            sub: (encoded & 0xff) as u8,
        })
    }

    /// The next sub-index of the same native instruction, if one exists.
    pub fn next_sub(&self) -> Option<Self> {
        self.sub.checked_add(1).map(|sub| Self {
            native: self.native,
            sub,
        })
    }
}

impl std::fmt::Display for ReilAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}.{:02x}", self.native, self.sub)
    }
}

/// A single REIL instruction.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ReilInstruction {
    pub address: ReilAddress,
    pub opcode: ReilOpcode,
    pub first: ReilOperand,
    pub second: ReilOperand,
    pub third: ReilOperand,
}

impl ReilInstruction {
    /// Create a new instruction after confirming the operands are permitted for the opcode.
    pub fn new(
        address: ReilAddress,
        opcode: ReilOpcode,
        first: ReilOperand,
        second: ReilOperand,
        third: ReilOperand,
    ) -> Result<Self> {
        let instruction = Self {
            address,
            opcode,
            first,
            second,
            third,
        };
        instruction.validate()?;
        Ok(instruction)
    }

    pub fn operands(&self) -> [&ReilOperand; 3] {
        [&self.first, &self.second, &self.third]
    }

    /// Check the operand shape required by the opcode and that every literal fits its size. See
    /// [ReilOpcode] for the meaning of the operands of each opcode.
    pub fn validate(&self) -> Result<()> {
        use OperandRule::*;

        let rules = match self.opcode {
            opcode if opcode.is_binary() => [Value, Value, Register],
            ReilOpcode::Bisz | ReilOpcode::Str | ReilOpcode::Ldm => [Value, Empty, Register],
            ReilOpcode::Stm | ReilOpcode::Jcc => [Value, Empty, Value],
            ReilOpcode::Undef => [Empty, Empty, Register],
            _ => [Empty, Empty, Empty],
        };

        for (index, (operand, rule)) in self.operands().into_iter().zip(rules).enumerate() {
            let permitted = match rule {
                Empty => operand.is_empty(),
                Value => !operand.is_empty(),
                Register => operand.register_name().is_some(),
            };

            if !permitted {
                return Err(Error::InvalidOperand(format!(
                    "{opcode} at {address} does not permit {operand} as operand {position}",
                    opcode = self.opcode,
                    address = self.address,
                    position = index + 1,
                )));
            }

            if let ReilOperand::Literal { value, size } = operand {
                if u128::from(*value) & size.mask() != u128::from(*value) {
                    return Err(Error::InvalidOperand(format!(
                        "literal {value:#x} does not fit in a {size} at {address}",
                        address = self.address,
                    )));
                }
            }
        }

        Ok(())
    }
}

#[derive(Copy, Clone)]
enum OperandRule {
    Empty,
    Value,
    Register,
}

impl std::fmt::Display for ReilInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} [{}, {}, {}]",
            self.address, self.opcode, self.first, self.second, self.third
        )
    }
}
