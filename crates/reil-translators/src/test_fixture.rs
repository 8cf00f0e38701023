use reil::cpu::arm::ArmPolicy;
use reil::cpu::CpuPolicy;
use reil::{OperandSize, ReilInstruction};
use reil_interpreter::{
    InterpreterConfig, RegisterStatus, ReilInterpreter, ReilProgram, StopReason,
};

use crate::arm::ArmTranslator;
use crate::environment::TranslationContext;
use crate::translator::{Result, Translator};
use crate::tree::{NativeInstruction, OperandNode, OperandTree};

pub fn reg_node(name: &str) -> OperandNode {
    OperandNode::register(name)
}

pub fn imm_node(value: &str) -> OperandNode {
    OperandNode::immediate(value)
}

fn sized(node: OperandNode) -> OperandTree {
    OperandTree::new(OperandNode::size_prefix("b4", node))
}

pub fn reg(name: &str) -> OperandTree {
    sized(OperandNode::register(name))
}

pub fn imm(value: &str) -> OperandTree {
    sized(OperandNode::immediate(value))
}

/// `Rm, <shift> #amount` or `Rm, <shift> Rs`
pub fn shifted(name: &str, shift: &str, amount: OperandNode) -> OperandTree {
    sized(OperandNode::operator(
        shift,
        vec![OperandNode::register(name), amount],
    ))
}

pub fn rrx(name: &str) -> OperandTree {
    sized(OperandNode::operator("RRX", vec![OperandNode::register(name)]))
}

/// `[Rn]`
pub fn deref(base: &str) -> OperandTree {
    sized(OperandNode::memory_dereference(OperandNode::register(base)))
}

fn address(base: &str, operator: &str, offset: OperandNode) -> OperandNode {
    OperandNode::memory_dereference(OperandNode::operator(
        operator,
        vec![OperandNode::register(base), offset],
    ))
}

/// `[Rn, offset]`
pub fn offset(base: &str, offset: OperandNode) -> OperandTree {
    sized(address(base, "+", offset))
}

/// `[Rn, -offset]`
pub fn negative_offset(base: &str, offset: OperandNode) -> OperandTree {
    sized(address(base, "-", offset))
}

/// `[Rn, offset]!`
pub fn pre_indexed(base: &str, offset: OperandNode) -> OperandTree {
    sized(OperandNode::operator("!", vec![address(base, "+", offset)]))
}

/// `[Rn], offset`
pub fn post_indexed(base: &str, offset: OperandNode) -> OperandTree {
    sized(OperandNode::operator(
        ",",
        vec![
            OperandNode::memory_dereference(OperandNode::register(base)),
            offset,
        ],
    ))
}

pub fn instruction(address: u64, mnemonic: &str, operands: Vec<OperandTree>) -> NativeInstruction {
    NativeInstruction::new(address, mnemonic, operands)
}

pub fn translate(instruction: &NativeInstruction) -> Result<Vec<ReilInstruction>> {
    let mut output = Vec::new();
    ArmTranslator::new().translate(&mut TranslationContext::new(), instruction, &mut output)?;
    Ok(output)
}

/// ARM machine with every register and flag defined.
pub struct Machine {
    pub interpreter: ReilInterpreter<ArmPolicy>,
}

impl Machine {
    pub fn new() -> Self {
        let mut interpreter = ReilInterpreter::new(ArmPolicy, InterpreterConfig::default());
        let policy = ArmPolicy;
        for register in policy.registers() {
            if register.name != policy.program_counter() {
                interpreter
                    .set_register(register.name, 0, register.size, RegisterStatus::Defined)
                    .unwrap();
            }
        }
        for flag in policy.flags() {
            interpreter
                .set_register(flag, 0, OperandSize::Byte, RegisterStatus::Defined)
                .unwrap();
        }

        Self { interpreter }
    }

    pub fn register(mut self, name: &str, value: u64) -> Self {
        self.interpreter
            .set_register(name, value, OperandSize::Dword, RegisterStatus::Defined)
            .unwrap();
        self
    }

    pub fn flag(mut self, name: &str, value: bool) -> Self {
        self.interpreter
            .set_register(name, value.into(), OperandSize::Byte, RegisterStatus::Defined)
            .unwrap();
        self
    }

    pub fn memory(mut self, address: u64, value: u64, size: usize) -> Self {
        self.interpreter.set_memory(address, value, size).unwrap();
        self
    }

    /// Translate and execute the instructions starting at the first one.
    pub fn run(&mut self, instructions: &[NativeInstruction]) -> Result<StopReason> {
        let translator = ArmTranslator::new();
        let mut context = TranslationContext::new();
        let mut output = Vec::new();
        for instruction in instructions {
            translator.translate(&mut context, instruction, &mut output)?;
        }

        let program = ReilProgram::new(output).expect("translation produced a valid program");
        let start = instructions.first().map(|i| i.address).unwrap_or_default();
        let termination = self
            .interpreter
            .interpret(&program, start, Some(10_000))
            .expect("interpretation succeeded");
        Ok(termination.reason)
    }

    pub fn get(&self, name: &str) -> u64 {
        self.interpreter
            .register_value(name)
            .unwrap_or_else(|| panic!("register {name} is not defined"))
    }

    pub fn flag_value(&self, name: &str) -> bool {
        self.get(name) != 0
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.interpreter.register_value(name).is_some()
    }
}
