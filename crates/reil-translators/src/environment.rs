use reil::{OperandSize, ReilAddress, ReilInstruction, ReilOpcode, ReilOperand};

use crate::translator::{Error, Result};

/// Maximum number of REIL instructions a single native instruction may produce.
pub const MAX_INSTRUCTIONS: usize = 1 << ReilAddress::SUB_INDEX_BITS;

/// A position within the instructions of the current translation. Labels are created before
/// they are bound so that forward jumps can be emitted.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Label(usize);

/// Emission state for the translation of a single native instruction.
#[derive(Debug, Clone, Default)]
pub struct TranslationContext {
    address: u64,
    instructions: Vec<ReilInstruction>,
    next_temporary: usize,
    labels: Vec<Option<u8>>,

    /// Jump instructions whose targets are patched once labels are bound
    fixups: Vec<(usize, Label)>,
}

impl TranslationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the context for the native instruction at the given address.
    pub fn begin(&mut self, address: u64) {
        self.address = address;
        self.instructions.clear();
        self.next_temporary = 0;
        self.labels.clear();
        self.fixups.clear();
    }

    /// Native address of the instruction being translated.
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Number of instructions emitted so far.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Allocate a new temporary register.
    pub fn temporary(&mut self, size: OperandSize) -> Result<ReilOperand> {
        let name = format!("t{}", self.next_temporary);
        self.next_temporary += 1;
        Ok(ReilOperand::register(name, size)?)
    }

    /// Emit an instruction at the next sub-index.
    pub fn emit(
        &mut self,
        opcode: ReilOpcode,
        first: ReilOperand,
        second: ReilOperand,
        third: ReilOperand,
    ) -> Result<()> {
        let sub = u8::try_from(self.instructions.len()).map_err(|_| {
            Error::InternalTranslation(format!(
                "instruction at {:#x} requires more than {MAX_INSTRUCTIONS} REIL instructions",
                self.address
            ))
        })?;

        let address = ReilAddress::new(self.address, sub);
        let instruction = ReilInstruction::new(address, opcode, first, second, third)
            .map_err(|err| Error::InternalTranslation(err.to_string()))?;
        self.instructions.push(instruction);
        Ok(())
    }

    /// Emit `opcode lhs, rhs` into a new temporary of the given size and return the temporary.
    pub fn binary(
        &mut self,
        opcode: ReilOpcode,
        lhs: &ReilOperand,
        rhs: &ReilOperand,
        size: OperandSize,
    ) -> Result<ReilOperand> {
        let output = self.temporary(size)?;
        self.emit(opcode, lhs.clone(), rhs.clone(), output.clone())?;
        Ok(output)
    }

    /// Emit `bisz input` into a new byte temporary.
    pub fn is_zero(&mut self, input: &ReilOperand) -> Result<ReilOperand> {
        let output = self.temporary(OperandSize::Byte)?;
        self.emit(
            ReilOpcode::Bisz,
            input.clone(),
            ReilOperand::Empty,
            output.clone(),
        )?;
        Ok(output)
    }

    /// Copy `input` into `output`, truncating or zero extending to the output size.
    pub fn store_register(&mut self, input: &ReilOperand, output: &ReilOperand) -> Result<()> {
        self.emit(
            ReilOpcode::Str,
            input.clone(),
            ReilOperand::Empty,
            output.clone(),
        )
    }

    /// Copy `input` into a new temporary of the given size.
    pub fn resize(&mut self, input: &ReilOperand, size: OperandSize) -> Result<ReilOperand> {
        let output = self.temporary(size)?;
        self.store_register(input, &output)?;
        Ok(output)
    }

    /// Load `size` bytes from `address` into a new temporary.
    pub fn load(&mut self, address: &ReilOperand, size: OperandSize) -> Result<ReilOperand> {
        let output = self.temporary(size)?;
        self.emit(
            ReilOpcode::Ldm,
            address.clone(),
            ReilOperand::Empty,
            output.clone(),
        )?;
        Ok(output)
    }

    /// Store `value` at its own size to `address`.
    pub fn store_memory(&mut self, value: &ReilOperand, address: &ReilOperand) -> Result<()> {
        self.emit(
            ReilOpcode::Stm,
            value.clone(),
            ReilOperand::Empty,
            address.clone(),
        )
    }

    pub fn undefine(&mut self, register: &ReilOperand) -> Result<()> {
        self.emit(
            ReilOpcode::Undef,
            ReilOperand::Empty,
            ReilOperand::Empty,
            register.clone(),
        )
    }

    pub fn nop(&mut self) -> Result<()> {
        self.emit(
            ReilOpcode::Nop,
            ReilOperand::Empty,
            ReilOperand::Empty,
            ReilOperand::Empty,
        )
    }

    pub fn unknown(&mut self) -> Result<()> {
        self.emit(
            ReilOpcode::Unkn,
            ReilOperand::Empty,
            ReilOperand::Empty,
            ReilOperand::Empty,
        )
    }

    /// Jump to the encoded REIL address held in `target` if `condition` is non-zero.
    pub fn jump(&mut self, condition: &ReilOperand, target: &ReilOperand) -> Result<()> {
        self.emit(
            ReilOpcode::Jcc,
            condition.clone(),
            ReilOperand::Empty,
            target.clone(),
        )
    }

    /// Literal holding the encoded form of a REIL address.
    pub fn address_literal(address: ReilAddress) -> Result<ReilOperand> {
        let encoded = u64::try_from(address.encoded()).map_err(|_| {
            Error::InternalTranslation(format!(
                "encoded address of {address} does not fit in a qword"
            ))
        })?;
        Ok(ReilOperand::literal(encoded, OperandSize::Qword)?)
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind the label to the next instruction emitted.
    pub fn bind(&mut self, label: Label) -> Result<()> {
        let sub = u8::try_from(self.instructions.len()).map_err(|_| {
            Error::InternalTranslation(format!(
                "label bound beyond {MAX_INSTRUCTIONS} REIL instructions"
            ))
        })?;

        match self.labels.get_mut(label.0) {
            Some(slot @ None) => {
                *slot = Some(sub);
                Ok(())
            }
            Some(Some(_)) => Err(Error::InternalTranslation(format!(
                "label {} is already bound",
                label.0
            ))),
            None => Err(Error::InternalTranslation(format!(
                "label {} was not created by this context",
                label.0
            ))),
        }
    }

    /// Jump forward to the label if `condition` is non-zero. The target is resolved by
    /// [Self::finish].
    pub fn jump_if(&mut self, condition: &ReilOperand, label: Label) -> Result<()> {
        let placeholder = Self::address_literal(ReilAddress::new(self.address, 0))?;
        self.fixups.push((self.instructions.len(), label));
        self.jump(condition, &placeholder)
    }

    /// Resolve label jumps and take the emitted instructions. Fails if a label is unbound or
    /// bound past the last instruction.
    pub fn finish(&mut self) -> Result<Vec<ReilInstruction>> {
        for &(index, label) in &self.fixups {
            let sub = self
                .labels
                .get(label.0)
                .copied()
                .flatten()
                .ok_or_else(|| {
                    Error::InternalTranslation(format!("label {} was never bound", label.0))
                })?;

            if usize::from(sub) >= self.instructions.len() {
                return Err(Error::InternalTranslation(format!(
                    "label {} is bound past the last instruction",
                    label.0
                )));
            }

            let target = Self::address_literal(ReilAddress::new(self.address, sub))?;
            match self.instructions.get_mut(index) {
                Some(instruction) => instruction.third = target,
                None => {
                    return Err(Error::InternalTranslation(format!(
                        "jump {index} to label {} does not exist",
                        label.0
                    )))
                }
            }
        }

        self.fixups.clear();
        self.labels.clear();
        Ok(std::mem::take(&mut self.instructions))
    }
}
