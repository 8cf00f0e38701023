use crate::{OperandSize, Result};

pub mod arm;

/// A native register and its natural width.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RegisterSpec {
    pub name: &'static str,
    pub size: OperandSize,
}

impl RegisterSpec {
    pub const fn new(name: &'static str, size: OperandSize) -> Self {
        Self { name, size }
    }
}

/// Source of current flag values for condition evaluation. A flag that has never been defined
/// reports `None`.
pub trait FlagSource {
    fn flag(&self, name: &str) -> Option<bool>;
}

impl FlagSource for std::collections::BTreeMap<String, bool> {
    fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).copied()
    }
}

impl FlagSource for std::collections::HashMap<String, bool> {
    fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).copied()
    }
}

/// Description of a native architecture. Translators and the interpreter only consult this
/// trait, so supporting another architecture only requires another implementation.
pub trait CpuPolicy {
    /// Architecture name, e.g. `ARM`.
    fn name(&self) -> &'static str;

    /// The general purpose and special registers of the architecture, excluding flags.
    fn registers(&self) -> &[RegisterSpec];

    /// Flag registers. Flags are single bit values stored in byte sized registers.
    fn flags(&self) -> &[&'static str];

    /// Name of the program counter register.
    fn program_counter(&self) -> &'static str;

    /// Natural width of a memory address.
    fn address_size(&self) -> OperandSize;

    /// Evaluate the condition code `symbol` against the current flags.
    fn evaluate_condition(&self, symbol: &str, flags: &dyn FlagSource) -> Result<bool>;

    /// Resolve a register name, including any aliases, to the name used by this policy.
    fn canonical_register(&self, name: &str) -> Option<&'static str> {
        self.registers()
            .iter()
            .map(|register| register.name)
            .chain(self.flags().iter().copied())
            .find(|candidate| candidate.eq_ignore_ascii_case(name))
    }

    fn register_size(&self, name: &str) -> Option<OperandSize> {
        if let Some(register) = self.registers().iter().find(|r| r.name == name) {
            return Some(register.size);
        }

        self.flags()
            .contains(&name)
            .then_some(OperandSize::Byte)
    }

    /// Whether the name is a register or flag of the architecture, as opposed to a temporary
    /// register introduced during translation.
    fn is_native_register(&self, name: &str) -> bool {
        self.register_size(name).is_some()
    }

    fn is_flag(&self, name: &str) -> bool {
        self.flags().contains(&name)
    }
}
