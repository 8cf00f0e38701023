//! 32-bit ARM register file and condition codes.

use super::{CpuPolicy, FlagSource, RegisterSpec};
use crate::{Error, OperandSize, Result};

pub const CARRY: &str = "C";
pub const NEGATIVE: &str = "N";
pub const ZERO: &str = "Z";
pub const OVERFLOW: &str = "V";
pub const SATURATION: &str = "Q";

const REGISTERS: [RegisterSpec; 16] = [
    RegisterSpec::new("R0", OperandSize::Dword),
    RegisterSpec::new("R1", OperandSize::Dword),
    RegisterSpec::new("R2", OperandSize::Dword),
    RegisterSpec::new("R3", OperandSize::Dword),
    RegisterSpec::new("R4", OperandSize::Dword),
    RegisterSpec::new("R5", OperandSize::Dword),
    RegisterSpec::new("R6", OperandSize::Dword),
    RegisterSpec::new("R7", OperandSize::Dword),
    RegisterSpec::new("R8", OperandSize::Dword),
    RegisterSpec::new("R9", OperandSize::Dword),
    RegisterSpec::new("R10", OperandSize::Dword),
    RegisterSpec::new("R11", OperandSize::Dword),
    RegisterSpec::new("R12", OperandSize::Dword),
    RegisterSpec::new("SP", OperandSize::Dword),
    RegisterSpec::new("LR", OperandSize::Dword),
    RegisterSpec::new("PC", OperandSize::Dword),
];

const FLAGS: [&str; 5] = [CARRY, NEGATIVE, ZERO, OVERFLOW, SATURATION];

/// CPU policy for 32-bit ARM.
#[derive(Debug, Copy, Clone, Default)]
pub struct ArmPolicy;

impl CpuPolicy for ArmPolicy {
    fn name(&self) -> &'static str {
        "ARM"
    }

    fn registers(&self) -> &[RegisterSpec] {
        &REGISTERS
    }

    fn flags(&self) -> &[&'static str] {
        &FLAGS
    }

    fn program_counter(&self) -> &'static str {
        "PC"
    }

    fn address_size(&self) -> OperandSize {
        OperandSize::Dword
    }

    fn evaluate_condition(&self, symbol: &str, flags: &dyn FlagSource) -> Result<bool> {
        let condition: Condition = symbol.parse()?;
        condition.evaluate(|flag| {
            flags
                .flag(flag)
                .ok_or_else(|| Error::UndefinedFlag(flag.to_string()))
        })
    }

    fn canonical_register(&self, name: &str) -> Option<&'static str> {
        let alias = match name.to_ascii_uppercase().as_str() {
            "R13" => Some("SP"),
            "R14" => Some("LR"),
            "R15" => Some("PC"),
            "SB" => Some("R9"),
            "SL" => Some("R10"),
            "FP" => Some("R11"),
            "IP" => Some("R12"),
            _ => None,
        };

        alias.or_else(|| {
            REGISTERS
                .iter()
                .map(|register| register.name)
                .chain(FLAGS)
                .find(|candidate| candidate.eq_ignore_ascii_case(name))
        })
    }
}

/// ARM condition codes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Condition {
    /// Equal: `Z`
    Eq,
    /// Not equal: `!Z`
    Ne,
    /// Carry set / unsigned higher or same: `C`
    Cs,
    /// Carry clear / unsigned lower: `!C`
    Cc,
    /// Negative: `N`
    Mi,
    /// Positive or zero: `!N`
    Pl,
    /// Overflow: `V`
    Vs,
    /// No overflow: `!V`
    Vc,
    /// Unsigned higher: `C & !Z`
    Hi,
    /// Unsigned lower or same: `!C | Z`
    Ls,
    /// Signed greater than or equal: `N == V`
    Ge,
    /// Signed less than: `N != V`
    Lt,
    /// Signed greater than: `!Z & N == V`
    Gt,
    /// Signed less than or equal: `Z | N != V`
    Le,
    /// Always
    Al,
}

impl Condition {
    pub const ALL: [Condition; 15] = [
        Condition::Eq,
        Condition::Ne,
        Condition::Cs,
        Condition::Cc,
        Condition::Mi,
        Condition::Pl,
        Condition::Vs,
        Condition::Vc,
        Condition::Hi,
        Condition::Ls,
        Condition::Ge,
        Condition::Lt,
        Condition::Gt,
        Condition::Le,
        Condition::Al,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Condition::Eq => "EQ",
            Condition::Ne => "NE",
            Condition::Cs => "CS",
            Condition::Cc => "CC",
            Condition::Mi => "MI",
            Condition::Pl => "PL",
            Condition::Vs => "VS",
            Condition::Vc => "VC",
            Condition::Hi => "HI",
            Condition::Ls => "LS",
            Condition::Ge => "GE",
            Condition::Lt => "LT",
            Condition::Gt => "GT",
            Condition::Le => "LE",
            Condition::Al => "AL",
        }
    }

    /// The flag expression that decides whether the condition holds.
    pub fn predicate(&self) -> Predicate {
        use Predicate::*;

        let signs_differ = || Xor(Box::new(Flag(NEGATIVE)), Box::new(Flag(OVERFLOW)));
        let not = |predicate: Predicate| Not(Box::new(predicate));

        match self {
            Condition::Eq => Flag(ZERO),
            Condition::Ne => not(Flag(ZERO)),
            Condition::Cs => Flag(CARRY),
            Condition::Cc => not(Flag(CARRY)),
            Condition::Mi => Flag(NEGATIVE),
            Condition::Pl => not(Flag(NEGATIVE)),
            Condition::Vs => Flag(OVERFLOW),
            Condition::Vc => not(Flag(OVERFLOW)),
            Condition::Hi => And(Box::new(Flag(CARRY)), Box::new(not(Flag(ZERO)))),
            Condition::Ls => Or(Box::new(not(Flag(CARRY))), Box::new(Flag(ZERO))),
            Condition::Ge => not(signs_differ()),
            Condition::Lt => signs_differ(),
            Condition::Gt => And(Box::new(not(Flag(ZERO))), Box::new(not(signs_differ()))),
            Condition::Le => Or(Box::new(Flag(ZERO)), Box::new(signs_differ())),
            Condition::Al => True,
        }
    }

    /// Evaluate the condition. Only the flags the condition depends on are requested.
    pub fn evaluate(&self, flag: impl FnMut(&'static str) -> Result<bool>) -> Result<bool> {
        self.predicate().evaluate(flag)
    }
}

/// Boolean expression over flag values.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Predicate {
    True,
    Flag(&'static str),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Xor(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn evaluate(&self, mut flag: impl FnMut(&'static str) -> Result<bool>) -> Result<bool> {
        self.evaluate_with(&mut flag)
    }

    fn evaluate_with(
        &self,
        flag: &mut impl FnMut(&'static str) -> Result<bool>,
    ) -> Result<bool> {
        let result = match self {
            Predicate::True => true,
            Predicate::Flag(name) => flag(*name)?,
            Predicate::Not(inner) => !inner.evaluate_with(flag)?,
            Predicate::And(lhs, rhs) => lhs.evaluate_with(flag)? && rhs.evaluate_with(flag)?,
            Predicate::Or(lhs, rhs) => lhs.evaluate_with(flag)? || rhs.evaluate_with(flag)?,
            Predicate::Xor(lhs, rhs) => lhs.evaluate_with(flag)? != rhs.evaluate_with(flag)?,
        };

        Ok(result)
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "HS" => return Ok(Condition::Cs),
            "LO" => return Ok(Condition::Cc),
            _ => (),
        }

        Condition::ALL
            .into_iter()
            .find(|condition| condition.symbol() == upper)
            .ok_or_else(|| Error::UnknownCondition(s.to_string()))
    }
}
