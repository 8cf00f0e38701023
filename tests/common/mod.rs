#![allow(dead_code)]

use reil::cpu::arm::ArmPolicy;
use reil::cpu::CpuPolicy;
use reil::{OperandSize, ReilInstruction};
use reil_interpreter::{
    ExecutionHandler, InterpreterConfig, MachineState, RegisterStatus, ReilInterpreter,
    ReilProgram, Termination,
};
use reil_translators::arm::ArmTranslator;
use reil_translators::{NativeInstruction, OperandNode, OperandTree, TranslationContext, Translator};

/// Install a subscriber honoring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
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

pub fn shifted(name: &str, shift: &str, amount: &str) -> OperandTree {
    let amount = if amount.starts_with('R') {
        OperandNode::register(amount)
    } else {
        OperandNode::immediate(amount)
    };

    sized(OperandNode::operator(
        shift,
        vec![OperandNode::register(name), amount],
    ))
}

pub fn deref(base: &str) -> OperandTree {
    sized(OperandNode::memory_dereference(OperandNode::register(base)))
}

fn address(base: &str, offset: &str) -> OperandNode {
    let (operator, offset) = match offset.strip_prefix('-') {
        Some(offset) if offset.starts_with('R') => ("-", offset),
        _ => ("+", offset),
    };
    let offset = if offset.starts_with('R') {
        OperandNode::register(offset)
    } else {
        OperandNode::immediate(offset)
    };

    OperandNode::memory_dereference(OperandNode::operator(
        operator,
        vec![OperandNode::register(base), offset],
    ))
}

/// `[Rn, offset]`
pub fn offset(base: &str, offset: &str) -> OperandTree {
    sized(address(base, offset))
}

/// `[Rn, Rm, <shift> #amount]`
pub fn scaled_offset(base: &str, index: &str, shift: &str, amount: &str) -> OperandTree {
    let index = OperandNode::operator(
        shift,
        vec![OperandNode::register(index), OperandNode::immediate(amount)],
    );

    sized(OperandNode::memory_dereference(OperandNode::operator(
        "+",
        vec![OperandNode::register(base), index],
    )))
}

/// `[Rn, offset]!`
pub fn pre_indexed(base: &str, offset: &str) -> OperandTree {
    sized(OperandNode::operator("!", vec![address(base, offset)]))
}

/// `[Rn], offset`
pub fn post_indexed(base: &str, offset: &str) -> OperandTree {
    sized(OperandNode::operator(
        ",",
        vec![
            OperandNode::memory_dereference(OperandNode::register(base)),
            OperandNode::immediate(offset),
        ],
    ))
}

/// Lay out instructions four bytes apart starting at `base`.
pub fn assemble(
    base: u64,
    instructions: Vec<(&str, Vec<OperandTree>)>,
) -> Vec<NativeInstruction> {
    instructions
        .into_iter()
        .enumerate()
        .map(|(index, (mnemonic, operands))| {
            NativeInstruction::new(base + 4 * index as u64, mnemonic, operands)
        })
        .collect()
}

pub fn translate(instructions: &[NativeInstruction]) -> Vec<ReilInstruction> {
    let translator = ArmTranslator::new();
    let mut context = TranslationContext::new();
    let mut output = Vec::new();
    for instruction in instructions {
        translator
            .translate(&mut context, instruction, &mut output)
            .unwrap_or_else(|err| panic!("failed to translate {instruction}: {err}"));
    }

    output
}

/// Counts the native instructions entered during interpretation.
#[derive(Default)]
pub struct NativeCounter {
    pub visited: Vec<u64>,
}

impl ExecutionHandler for NativeCounter {
    fn native_instruction(&mut self, _state: &MachineState, address: u64) {
        self.visited.push(address);
    }
}

pub struct Processor {
    pub interpreter: ReilInterpreter<ArmPolicy, NativeCounter>,
}

impl Processor {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Processor {
            interpreter: ReilInterpreter::with_handler(ArmPolicy, config, Default::default()),
        }
    }

    /// Define every register other than the program counter, and every flag, as zero.
    pub fn init_registers(&mut self) {
        let policy = ArmPolicy;
        for register in policy.registers() {
            if register.name != policy.program_counter() {
                self.write_register(register.name, 0);
            }
        }

        for flag in policy.flags() {
            self.write_flag(flag, false);
        }
    }

    pub fn write_register(&mut self, name: &str, value: u64) {
        self.interpreter
            .set_register(name, value, OperandSize::Dword, RegisterStatus::Defined)
            .unwrap_or_else(|err| panic!("failed to write {name}: {err}"));
    }

    pub fn write_flag(&mut self, name: &str, value: bool) {
        self.interpreter
            .set_register(name, value.into(), OperandSize::Byte, RegisterStatus::Defined)
            .unwrap_or_else(|err| panic!("failed to write {name}: {err}"));
    }

    pub fn write_memory(&mut self, address: u64, value: u64, size: usize) {
        self.interpreter
            .set_memory(address, value, size)
            .expect("failed to write memory");
    }

    pub fn read_register(&self, name: &str) -> u64 {
        self.interpreter
            .register_value(name)
            .unwrap_or_else(|| panic!("register {name} is not defined"))
    }

    pub fn read_flag(&self, name: &str) -> bool {
        self.interpreter
            .flag(name)
            .unwrap_or_else(|| panic!("flag {name} is not defined"))
    }

    pub fn read_memory(&self, address: u64, size: OperandSize) -> u64 {
        self.interpreter
            .state()
            .memory()
            .read(address, size)
            .expect("failed to read memory")
            .value()
    }

    pub fn visited(&self) -> &[u64] {
        &self.interpreter.handler().visited
    }

    /// Translate the instructions and run them from the first one.
    pub fn execute(
        &mut self,
        instructions: &[NativeInstruction],
    ) -> reil_interpreter::Result<Termination> {
        let program = ReilProgram::new(translate(instructions))?;
        let start = instructions.first().map(|i| i.address).unwrap_or_default();
        self.interpreter.interpret(&program, start, Some(100_000))
    }

    pub fn run(&mut self, instructions: &[NativeInstruction]) -> Termination {
        self.execute(instructions)
            .unwrap_or_else(|err| panic!("failed to interpret: {err}"))
    }
}
