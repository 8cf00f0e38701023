use crate::Error;

/// The complete set of REIL opcodes. Every native instruction is expressible as a sequence of
/// these operations.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ReilOpcode {
    /// Unsigned addition: `op3 = op1 + op2`.
    Add,

    /// Bitwise and: `op3 = op1 & op2`.
    And,

    /// Boolean is-zero: `op3 = (op1 == 0) ? 1 : 0`.
    Bisz,

    /// Logical shift of `op1` by `op2`. The shift amount is read as a signed value of its own
    /// width. Positive amounts shift left, negative amounts shift right.
    Bsh,

    /// Unsigned division: `op3 = op1 / op2`.
    Div,

    /// Conditional jump to `op3` when `op1` is non-zero.
    Jcc,

    /// Load `size(op3)` bytes from the memory address `op1` into `op3`.
    Ldm,

    /// Unsigned modulo: `op3 = op1 % op2`.
    Mod,

    /// Unsigned multiplication: `op3 = op1 * op2`.
    Mul,

    /// No operation.
    Nop,

    /// Bitwise or: `op3 = op1 | op2`.
    Or,

    /// Store `size(op1)` bytes of `op1` to the memory address `op3`.
    Stm,

    /// Store `op1` into the register `op3`.
    Str,

    /// Unsigned subtraction: `op3 = op1 - op2`.
    Sub,

    /// Marks the register `op3` as holding an architecturally undefined value.
    Undef,

    /// Marks an instruction whose effect is not modeled.
    Unkn,

    /// Bitwise exclusive-or: `op3 = op1 ^ op2`.
    Xor,
}

impl ReilOpcode {
    pub const ALL: [ReilOpcode; 17] = [
        ReilOpcode::Add,
        ReilOpcode::And,
        ReilOpcode::Bisz,
        ReilOpcode::Bsh,
        ReilOpcode::Div,
        ReilOpcode::Jcc,
        ReilOpcode::Ldm,
        ReilOpcode::Mod,
        ReilOpcode::Mul,
        ReilOpcode::Nop,
        ReilOpcode::Or,
        ReilOpcode::Stm,
        ReilOpcode::Str,
        ReilOpcode::Sub,
        ReilOpcode::Undef,
        ReilOpcode::Unkn,
        ReilOpcode::Xor,
    ];

    pub fn mnemonic(&self) -> &'static str {
        match self {
            ReilOpcode::Add => "add",
            ReilOpcode::And => "and",
            ReilOpcode::Bisz => "bisz",
            ReilOpcode::Bsh => "bsh",
            ReilOpcode::Div => "div",
            ReilOpcode::Jcc => "jcc",
            ReilOpcode::Ldm => "ldm",
            ReilOpcode::Mod => "mod",
            ReilOpcode::Mul => "mul",
            ReilOpcode::Nop => "nop",
            ReilOpcode::Or => "or",
            ReilOpcode::Stm => "stm",
            ReilOpcode::Str => "str",
            ReilOpcode::Sub => "sub",
            ReilOpcode::Undef => "undef",
            ReilOpcode::Unkn => "unkn",
            ReilOpcode::Xor => "xor",
        }
    }

    /// Opcodes that compute `op3` from the two inputs `op1` and `op2`.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            ReilOpcode::Add
                | ReilOpcode::And
                | ReilOpcode::Bsh
                | ReilOpcode::Div
                | ReilOpcode::Mod
                | ReilOpcode::Mul
                | ReilOpcode::Or
                | ReilOpcode::Sub
                | ReilOpcode::Xor
        )
    }
}

impl std::fmt::Display for ReilOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl std::str::FromStr for ReilOpcode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ReilOpcode::ALL
            .into_iter()
            .find(|opcode| opcode.mnemonic() == lower)
            .ok_or_else(|| Error::UnknownOpcode(s.to_string()))
    }
}
