use std::collections::BTreeMap;

use reil::cpu::{CpuPolicy, FlagSource};
use reil::{OperandSize, ReilAddress, Value};

use crate::mem::Memory;

/// Whether a register holds a value produced by execution.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RegisterStatus {
    Defined,
    Undefined,
}

/// The content of a register: a sized value together with its definedness.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RegisterValue {
    pub value: Value,
    pub status: RegisterStatus,
}

impl RegisterValue {
    pub fn defined(value: Value) -> Self {
        Self {
            value,
            status: RegisterStatus::Defined,
        }
    }

    pub fn undefined(size: OperandSize) -> Self {
        Self {
            value: Value::zero(size),
            status: RegisterStatus::Undefined,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.status == RegisterStatus::Defined
    }
}

/// Registers, memory, and program counter of a single interpretation run.
#[derive(Debug, Clone, Default)]
pub struct MachineState {
    registers: BTreeMap<String, RegisterValue>,
    memory: Memory,
    program_counter: ReilAddress,
}

impl MachineState {
    pub fn new(memory: Memory) -> Self {
        Self {
            registers: Default::default(),
            memory,
            program_counter: Default::default(),
        }
    }

    pub fn register(&self, name: &str) -> Option<&RegisterValue> {
        self.registers.get(name)
    }

    /// The value of a register if it is defined.
    pub fn register_value(&self, name: &str) -> Option<u64> {
        self.registers
            .get(name)
            .filter(|register| register.is_defined())
            .map(|register| register.value.value())
    }

    pub fn set_register(&mut self, name: impl Into<String>, register: RegisterValue) {
        self.registers.insert(name.into(), register);
    }

    /// Mark a register as holding an undefined value of the given size.
    pub fn undefine_register(&mut self, name: impl Into<String>, size: OperandSize) {
        self.registers
            .insert(name.into(), RegisterValue::undefined(size));
    }

    /// Every register with a defined value, including temporary registers.
    pub fn defined_registers(&self) -> impl Iterator<Item = (&str, &RegisterValue)> {
        self.registers
            .iter()
            .filter(|(_, register)| register.is_defined())
            .map(|(name, register)| (name.as_str(), register))
    }

    /// Defined registers that belong to the architecture described by the policy.
    pub fn native_registers<'a>(
        &'a self,
        policy: &'a impl CpuPolicy,
    ) -> impl Iterator<Item = (&'a str, &'a RegisterValue)> {
        self.defined_registers()
            .filter(move |(name, _)| policy.is_native_register(name))
    }

    /// The value of a flag register if it is defined.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.register_value(name).map(|value| value != 0)
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn program_counter(&self) -> ReilAddress {
        self.program_counter
    }

    pub fn set_program_counter(&mut self, address: ReilAddress) {
        self.program_counter = address;
    }
}

impl FlagSource for MachineState {
    fn flag(&self, name: &str) -> Option<bool> {
        MachineState::flag(self, name)
    }
}
