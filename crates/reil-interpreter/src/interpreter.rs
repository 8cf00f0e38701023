use reil::cpu::CpuPolicy;
use reil::{OperandSize, ReilAddress, ReilInstruction, ReilOpcode, ReilOperand, Value};
use tracing::{debug, trace, warn};

use crate::mem::{self, Endianness, Memory, UnwrittenMemory};
use crate::program::ReilProgram;
use crate::state::{MachineState, RegisterStatus, RegisterValue};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error occurred while accessing a memory location.
    #[error(transparent)]
    MemoryAccess(#[from] mem::Error),

    /// A value could not be represented as a REIL operand or address.
    #[error(transparent)]
    Operand(#[from] reil::Error),

    /// There is no instruction at the requested address.
    #[error("no instruction at address {0}")]
    InvalidAddress(ReilAddress),

    /// A register was read before it was defined.
    #[error("register {register} read by {instruction} is not defined")]
    UndefinedRegisterAccess {
        register: String,
        instruction: Box<ReilInstruction>,
    },

    /// The instruction performed an arithmetic operation with no result.
    #[error("arithmetic error in {instruction}: {kind}")]
    Arithmetic {
        instruction: Box<ReilInstruction>,
        kind: ArithmeticError,
    },

    /// The operands of the instruction are not permitted for its opcode.
    #[error("illegal instruction {instruction}: {reason}")]
    IllegalInstruction {
        instruction: Box<ReilInstruction>,
        reason: String,
    },
}

#[derive(thiserror::Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo by zero")]
    ModuloByZero,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Behavior when an instruction reads a register that is undefined or was never written.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum UndefinedRegisters {
    /// The read fails with [Error::UndefinedRegisterAccess].
    #[default]
    Fail,

    /// The read produces zero and the result of the instruction is marked undefined. Memory
    /// accesses and jumps still require defined operands.
    Propagate,
}

/// Configuration of a [ReilInterpreter].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct InterpreterConfig {
    pub endianness: Endianness,
    pub unwritten_memory: UnwrittenMemory,
    pub undefined_registers: UndefinedRegisters,
}

impl InterpreterConfig {
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_unwritten_memory(mut self, unwritten_memory: UnwrittenMemory) -> Self {
        self.unwritten_memory = unwritten_memory;
        self
    }

    pub fn with_undefined_registers(mut self, undefined_registers: UndefinedRegisters) -> Self {
        self.undefined_registers = undefined_registers;
        self
    }
}

/// Describes which instruction should be executed next.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ControlFlow {
    /// The next REIL instruction. This is either the next sub-index of the current native
    /// instruction or, if this was the last one, the first REIL instruction of the next native
    /// instruction.
    #[default]
    NextInstruction,

    /// Execution should continue at the given address.
    Jump(ReilAddress),
}

/// Why an interpretation run stopped.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StopReason {
    /// The last instruction of the program was executed without jumping.
    EndOfProgram,

    /// A jump targeted the first instruction of a native address outside of the program.
    LeftProgram(u64),

    /// The requested number of steps were executed.
    StepLimit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Termination {
    pub reason: StopReason,

    /// Number of REIL instructions executed.
    pub steps: u64,
}

/// Observer of interpretation progress.
pub trait ExecutionHandler {
    /// Execution is entering the first REIL instruction of a native instruction.
    fn native_instruction(&mut self, _state: &MachineState, _address: u64) {}

    /// The instruction was executed and the state reflects its effects.
    fn executed(&mut self, _state: &MachineState, _instruction: &ReilInstruction) {}
}

#[derive(Debug, Copy, Clone, Default)]
pub struct NoHandler;

impl ExecutionHandler for NoHandler {}

/// A resolved input operand.
#[derive(Debug, Copy, Clone)]
struct Input {
    value: Value,
    status: RegisterStatus,
}

/// Executes REIL programs against a [MachineState].
#[derive(Debug, Clone)]
pub struct ReilInterpreter<P: CpuPolicy, H: ExecutionHandler = NoHandler> {
    policy: P,
    config: InterpreterConfig,
    state: MachineState,
    handler: H,
}

impl<P: CpuPolicy> ReilInterpreter<P, NoHandler> {
    pub fn new(policy: P, config: InterpreterConfig) -> Self {
        Self::with_handler(policy, config, NoHandler)
    }
}

impl<P: CpuPolicy, H: ExecutionHandler> ReilInterpreter<P, H> {
    pub fn with_handler(policy: P, config: InterpreterConfig, handler: H) -> Self {
        let memory = Memory::new(config.endianness, config.unwritten_memory);
        Self {
            policy,
            config,
            state: MachineState::new(memory),
            handler,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    pub fn into_state(self) -> MachineState {
        self.state
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Set a register value. Native register names are resolved through the CPU policy, other
    /// names are treated as temporary registers.
    pub fn set_register(
        &mut self,
        name: &str,
        value: u64,
        size: OperandSize,
        status: RegisterStatus,
    ) -> Result<()> {
        if u128::from(value) & !size.mask() != 0 {
            return Err(reil::Error::InvalidOperand(format!(
                "value {value:#x} for register {name} does not fit in a {size}"
            ))
            .into());
        }

        let name = self.policy.canonical_register(name).unwrap_or(name);
        let register = match status {
            RegisterStatus::Defined => RegisterValue::defined(Value::new(value.into(), size)),
            RegisterStatus::Undefined => RegisterValue::undefined(size),
        };
        self.state.set_register(name, register);
        Ok(())
    }

    /// Write `size` bytes of `value` to memory using the configured endianness.
    pub fn set_memory(&mut self, address: u64, value: u64, size: usize) -> Result<()> {
        let size = OperandSize::from_bytes(size)?;
        if u128::from(value) & !size.mask() != 0 {
            return Err(reil::Error::InvalidOperand(format!(
                "value {value:#x} does not fit in a {size}"
            ))
            .into());
        }

        self.state
            .memory_mut()
            .write(address, Value::new(value.into(), size))?;
        Ok(())
    }

    /// The value of a register if it is defined.
    pub fn register_value(&self, name: &str) -> Option<u64> {
        let name = self.policy.canonical_register(name).unwrap_or(name);
        self.state.register_value(name)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.state.flag(name)
    }

    /// Evaluate a condition code of the architecture against the current flags.
    pub fn evaluate_condition(&self, symbol: &str) -> Result<bool> {
        Ok(self.policy.evaluate_condition(symbol, &self.state)?)
    }

    /// Defined registers of the architecture, excluding temporary registers.
    pub fn native_registers(&self) -> impl Iterator<Item = (&str, &RegisterValue)> {
        self.state.native_registers(&self.policy)
    }

    /// Number of bytes written to memory.
    pub fn memory_size(&self) -> usize {
        self.state.memory().len()
    }

    /// Interpret the program starting at the first REIL instruction of the native address
    /// `start`. Execution continues until the program ends, a jump leaves the program, or
    /// `step_limit` instructions have been executed.
    pub fn interpret(
        &mut self,
        program: &ReilProgram,
        start: u64,
        step_limit: Option<u64>,
    ) -> Result<Termination> {
        let start = ReilAddress::new(start, 0);
        if program.instruction(start).is_none() {
            return Err(Error::InvalidAddress(start));
        }

        debug!(start = %start, instructions = program.len(), "interpreting");
        self.state.set_program_counter(start);

        let mut steps = 0;
        let reason = loop {
            if step_limit.is_some_and(|limit| steps >= limit) {
                break StopReason::StepLimit;
            }

            let address = self.state.program_counter();
            let instruction = program
                .instruction(address)
                .ok_or(Error::InvalidAddress(address))?;

            if address.sub() == 0 {
                self.enter_native_instruction(address.native());
            }

            let control_flow = self.execute(instruction)?;
            steps += 1;
            self.handler.executed(&self.state, instruction);

            let next = match control_flow {
                ControlFlow::NextInstruction => {
                    let next_sub = address
                        .next_sub()
                        .filter(|next| program.instruction(*next).is_some());
                    match next_sub {
                        Some(next) => next,
                        None => match program.next_native(address.native()) {
                            Some(native) => ReilAddress::new(native, 0),
                            None => break StopReason::EndOfProgram,
                        },
                    }
                }
                ControlFlow::Jump(target) if program.instruction(target).is_some() => target,
                ControlFlow::Jump(target)
                    if target.sub() == 0 && !program.contains_native(target.native()) =>
                {
                    self.state.set_program_counter(target);
                    self.write_program_counter(target.native());
                    break StopReason::LeftProgram(target.native());
                }
                ControlFlow::Jump(target) => return Err(Error::InvalidAddress(target)),
            };

            self.state.set_program_counter(next);
        };

        debug!(?reason, steps, "interpretation stopped");
        Ok(Termination { reason, steps })
    }

    /// Execute a single REIL instruction and report where execution continues.
    pub fn execute(&mut self, instruction: &ReilInstruction) -> Result<ControlFlow> {
        trace!(%instruction, "executing");
        instruction
            .validate()
            .map_err(|err| illegal_instruction(instruction, err.to_string()))?;

        match instruction.opcode {
            ReilOpcode::Add => {
                self.binary_op(instruction, |x, y| Ok(x.unsigned().wrapping_add(y.unsigned())))?
            }
            ReilOpcode::Sub => {
                self.binary_op(instruction, |x, y| Ok(x.unsigned().wrapping_sub(y.unsigned())))?
            }
            ReilOpcode::Mul => {
                self.binary_op(instruction, |x, y| Ok(x.unsigned().wrapping_mul(y.unsigned())))?
            }
            ReilOpcode::Div => self.binary_op(instruction, |x, y| {
                x.unsigned()
                    .checked_div(y.unsigned())
                    .ok_or(ArithmeticError::DivisionByZero)
            })?,
            ReilOpcode::Mod => self.binary_op(instruction, |x, y| {
                x.unsigned()
                    .checked_rem(y.unsigned())
                    .ok_or(ArithmeticError::ModuloByZero)
            })?,
            ReilOpcode::And => {
                self.binary_op(instruction, |x, y| Ok(x.unsigned() & y.unsigned()))?
            }
            ReilOpcode::Or => self.binary_op(instruction, |x, y| Ok(x.unsigned() | y.unsigned()))?,
            ReilOpcode::Xor => {
                self.binary_op(instruction, |x, y| Ok(x.unsigned() ^ y.unsigned()))?
            }
            ReilOpcode::Bsh => self.binary_op(instruction, |x, y| Ok(shift(x, y)))?,
            ReilOpcode::Bisz => {
                let input = self.read(instruction, &instruction.first)?;
                let result = u128::from(input.value.is_zero());
                self.write_register(&instruction.third, result, input.status);
            }
            ReilOpcode::Str => {
                let input = self.read(instruction, &instruction.first)?;
                self.write_register(&instruction.third, input.value.unsigned(), input.status);
            }
            ReilOpcode::Ldm => self.load(instruction)?,
            ReilOpcode::Stm => self.store(instruction)?,
            ReilOpcode::Jcc => return self.conditional_jump(instruction),
            ReilOpcode::Undef => {
                let (name, size) = output_register(&instruction.third);
                self.state.undefine_register(name, size);
            }
            ReilOpcode::Nop => (),
            ReilOpcode::Unkn => {
                warn!(%instruction, "executing instruction with unknown effect");
            }
        }

        Ok(ControlFlow::NextInstruction)
    }

    fn enter_native_instruction(&mut self, native: u64) {
        self.write_program_counter(native);
        self.handler.native_instruction(&self.state, native);
    }

    fn write_program_counter(&mut self, native: u64) {
        let pc = self.policy.program_counter();
        let size = self
            .policy
            .register_size(pc)
            .unwrap_or_else(|| self.policy.address_size());
        self.state
            .set_register(pc, RegisterValue::defined(Value::new(native.into(), size)));
    }

    /// Compute `op3 = f(op1, op2)` at full precision. The result is masked to the size of `op3`.
    fn binary_op(
        &mut self,
        instruction: &ReilInstruction,
        f: impl FnOnce(Value, Value) -> std::result::Result<u128, ArithmeticError>,
    ) -> Result<()> {
        let lhs = self.read(instruction, &instruction.first)?;
        let rhs = self.read(instruction, &instruction.second)?;
        let status = combined_status(lhs.status, rhs.status);

        let result = f(lhs.value, rhs.value);
        match (result, status) {
            (Ok(result), _) => self.write_register(&instruction.third, result, status),

            // Operands derived from undefined registers read as zero, so an arithmetic error is
            // an artifact of the undefined input rather than of the program
            (Err(_), RegisterStatus::Undefined) => {
                self.write_register(&instruction.third, 0, RegisterStatus::Undefined)
            }
            (Err(kind), RegisterStatus::Defined) => {
                return Err(Error::Arithmetic {
                    instruction: Box::new(instruction.clone()),
                    kind,
                })
            }
        }

        Ok(())
    }

    /// Load `size(op3)` bytes from the address in `op1`.
    fn load(&mut self, instruction: &ReilInstruction) -> Result<()> {
        let address = self.read_defined(instruction, &instruction.first)?;
        let (_, size) = output_register(&instruction.third);
        let value = self.state.memory().read(address.value(), size)?;
        self.write_register(
            &instruction.third,
            value.unsigned(),
            RegisterStatus::Defined,
        );
        Ok(())
    }

    /// Store `op1` at its own size to the address in `op3`.
    fn store(&mut self, instruction: &ReilInstruction) -> Result<()> {
        let value = self.read_defined(instruction, &instruction.first)?;
        let address = self.read_defined(instruction, &instruction.third)?;
        self.state.memory_mut().write(address.value(), value)?;
        Ok(())
    }

    /// Jump to the encoded REIL address in `op3` if `op1` is non-zero.
    fn conditional_jump(&mut self, instruction: &ReilInstruction) -> Result<ControlFlow> {
        let condition = self.read_defined(instruction, &instruction.first)?;
        if condition.is_zero() {
            return Ok(ControlFlow::NextInstruction);
        }

        let target = self.read_defined(instruction, &instruction.third)?;
        let target = ReilAddress::from_encoded(target.unsigned())?;
        trace!(%target, "jump taken");
        Ok(ControlFlow::Jump(target))
    }

    fn read(&self, instruction: &ReilInstruction, operand: &ReilOperand) -> Result<Input> {
        match operand {
            ReilOperand::Literal { value, size } => Ok(Input {
                value: Value::new((*value).into(), *size),
                status: RegisterStatus::Defined,
            }),
            ReilOperand::Register { name, size } => {
                match (self.state.register(name), self.config.undefined_registers) {
                    (Some(register), _) if register.is_defined() => Ok(Input {
                        // Registers are read at the size of the operand
                        value: register.value.resize(*size),
                        status: RegisterStatus::Defined,
                    }),
                    (_, UndefinedRegisters::Propagate) => Ok(Input {
                        value: Value::zero(*size),
                        status: RegisterStatus::Undefined,
                    }),
                    (_, UndefinedRegisters::Fail) => Err(Error::UndefinedRegisterAccess {
                        register: name.clone(),
                        instruction: Box::new(instruction.clone()),
                    }),
                }
            }
            ReilOperand::Empty => Err(illegal_instruction(
                instruction,
                "empty operand cannot be read".to_string(),
            )),
        }
    }

    /// Read an operand that must be defined regardless of the undefined register policy.
    fn read_defined(&self, instruction: &ReilInstruction, operand: &ReilOperand) -> Result<Value> {
        let input = self.read(instruction, operand)?;
        match input.status {
            RegisterStatus::Defined => Ok(input.value),
            RegisterStatus::Undefined => Err(Error::UndefinedRegisterAccess {
                register: operand.register_name().unwrap_or_default().to_string(),
                instruction: Box::new(instruction.clone()),
            }),
        }
    }

    fn write_register(&mut self, output: &ReilOperand, value: u128, status: RegisterStatus) {
        let (name, size) = output_register(output);
        let register = match status {
            RegisterStatus::Defined => RegisterValue::defined(Value::new(value, size)),
            RegisterStatus::Undefined => RegisterValue::undefined(size),
        };
        self.state.set_register(name, register);
    }
}

/// Extension for reading values as full precision integers.
trait Unsigned {
    fn unsigned(&self) -> u128;
}

impl Unsigned for Value {
    fn unsigned(&self) -> u128 {
        self.value().into()
    }
}

/// Logical shift of `value` by the signed `amount`. Shifts beyond the computation width produce
/// zero.
fn shift(value: Value, amount: Value) -> u128 {
    let value = value.unsigned();
    let amount = amount.signed_value();
    let distance = u32::try_from(amount.unsigned_abs()).ok();

    if amount >= 0 {
        distance.and_then(|n| value.checked_shl(n)).unwrap_or(0)
    } else {
        distance.and_then(|n| value.checked_shr(n)).unwrap_or(0)
    }
}

fn combined_status(lhs: RegisterStatus, rhs: RegisterStatus) -> RegisterStatus {
    if lhs == RegisterStatus::Defined && rhs == RegisterStatus::Defined {
        RegisterStatus::Defined
    } else {
        RegisterStatus::Undefined
    }
}

/// Name and size of an output register. Instructions are validated before execution so the
/// output of a register-producing opcode is always a register.
fn output_register(output: &ReilOperand) -> (&str, OperandSize) {
    match output {
        ReilOperand::Register { name, size } => (name, *size),
        ReilOperand::Literal { size, .. } => ("", *size),
        ReilOperand::Empty => ("", OperandSize::Byte),
    }
}

fn illegal_instruction(instruction: &ReilInstruction, reason: String) -> Error {
    Error::IllegalInstruction {
        instruction: Box::new(instruction.clone()),
        reason,
    }
}
