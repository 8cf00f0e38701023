use std::collections::BTreeMap;

use reil::{ReilAddress, ReilInstruction};

use crate::interpreter::{Error, Result};

/// REIL instructions grouped by the native instruction they were translated from. Every block
/// holds the sub-indices `0..n` in order, so a [ReilAddress] indexes directly into its block.
#[derive(Debug, Clone, Default)]
pub struct ReilProgram {
    blocks: BTreeMap<u64, Vec<ReilInstruction>>,
}

impl ReilProgram {
    pub fn new(instructions: impl IntoIterator<Item = ReilInstruction>) -> Result<Self> {
        let mut blocks: BTreeMap<u64, Vec<ReilInstruction>> = BTreeMap::new();
        for instruction in instructions {
            blocks
                .entry(instruction.address.native())
                .or_default()
                .push(instruction);
        }

        for block in blocks.values_mut() {
            block.sort_by_key(|instruction| instruction.address);

            for (index, instruction) in block.iter().enumerate() {
                if usize::from(instruction.address.sub()) != index {
                    return Err(Error::InvalidAddress(instruction.address));
                }
            }
        }

        Ok(Self { blocks })
    }

    /// The instruction at the given address, if one exists.
    pub fn instruction(&self, address: ReilAddress) -> Option<&ReilInstruction> {
        self.blocks
            .get(&address.native())
            .and_then(|block| block.get(usize::from(address.sub())))
    }

    pub fn block(&self, native_address: u64) -> Option<&[ReilInstruction]> {
        self.blocks.get(&native_address).map(Vec::as_slice)
    }

    pub fn contains_native(&self, native_address: u64) -> bool {
        self.blocks.contains_key(&native_address)
    }

    /// The first native address strictly after the given one.
    pub fn next_native(&self, native_address: u64) -> Option<u64> {
        self.blocks
            .range(native_address.checked_add(1)?..)
            .next()
            .map(|(&address, _)| address)
    }

    pub fn native_addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.keys().copied()
    }

    /// Number of REIL instructions across all blocks.
    pub fn len(&self) -> usize {
        self.blocks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl std::fmt::Display for ReilProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for instruction in self.blocks.values().flatten() {
            writeln!(f, "{instruction}")?;
        }

        Ok(())
    }
}
