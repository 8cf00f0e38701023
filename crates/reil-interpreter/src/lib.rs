//! This crate executes REIL instructions against a [state::MachineState]. The machine state holds
//! sized registers with definedness tracking and a sparse, byte-addressable memory.
//!
//! ### Interpreter
//!
//! The [interpreter::ReilInterpreter] walks a [program::ReilProgram], one REIL instruction per
//! step, starting at the first REIL instruction of a native address. Execution stops when the
//! program is exhausted, when a jump leaves the program, or when the step limit is reached.
//!
//! The [interpreter::ExecutionHandler] trait may be implemented to observe execution. For example,
//! a handler can record the sequence of native instructions visited during a run.

/// REIL interpretation module.
pub mod interpreter;

/// Module for storing byte values at memory addresses.
pub mod mem;

/// Module for grouping REIL instructions by the native instruction they were translated from.
pub mod program;

/// Module holding the registers and memory mutated by the interpreter.
pub mod state;

pub use interpreter::{
    ArithmeticError, ControlFlow, Error, ExecutionHandler, InterpreterConfig, NoHandler,
    ReilInterpreter, Result, StopReason, Termination, UndefinedRegisters,
};
pub use mem::{Endianness, Memory, UnwrittenMemory};
pub use program::ReilProgram;
pub use state::{MachineState, RegisterStatus, RegisterValue};
