use std::collections::BTreeMap;

use reil::{OperandSize, Value};

/// Memory result type
pub type Result<T> = std::result::Result<T, Error>;

/// Possible memory errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// There is no data defined at a particular address
    #[error("data not defined at {address:#x} + {relative_offset}")]
    UndefinedData { address: u64, relative_offset: usize },

    /// The arguments provided for a given request are invalid
    #[error("arguments provided are not valid: {0}")]
    InvalidArguments(String),
}

/// Byte order used to assemble multi-byte values.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Behavior when reading a byte that has never been written.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum UnwrittenMemory {
    /// Reads of unwritten bytes fail with [Error::UndefinedData].
    #[default]
    Fail,

    /// Reads of unwritten bytes return the given byte.
    Fill(u8),
}

/// Sparse byte-addressable memory. Multi-byte accesses are decomposed into single byte accesses
/// assembled according to the endianness chosen at construction. Alignment is not enforced.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    endianness: Endianness,
    unwritten: UnwrittenMemory,
    data: BTreeMap<u64, u8>,
}

impl Memory {
    pub fn new(endianness: Endianness, unwritten: UnwrittenMemory) -> Self {
        Self {
            endianness,
            unwritten,
            data: Default::default(),
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Number of bytes that have been written.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over every written byte in address order.
    pub fn bytes(&self) -> impl Iterator<Item = (u64, u8)> + '_ {
        self.data.iter().map(|(&address, &byte)| (address, byte))
    }

    /// Read a single byte, applying the unwritten memory policy.
    pub fn read_byte(&self, address: u64) -> Result<u8> {
        match (self.data.get(&address), self.unwritten) {
            (Some(&byte), _) => Ok(byte),
            (None, UnwrittenMemory::Fill(byte)) => Ok(byte),
            (None, UnwrittenMemory::Fail) => Err(Error::UndefinedData {
                address,
                relative_offset: 0,
            }),
        }
    }

    pub fn write_byte(&mut self, address: u64, byte: u8) {
        self.data.insert(address, byte);
    }

    /// Read `len` bytes in address order.
    pub fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        Self::check_range(address, len)?;

        (0..len)
            .map(|relative_offset| {
                // Range was checked above so this cannot overflow
                let byte_address = address + relative_offset as u64;
                self.read_byte(byte_address)
                    .map_err(|_| Error::UndefinedData {
                        address,
                        relative_offset,
                    })
            })
            .collect()
    }

    pub fn write_bytes(&mut self, address: u64, data: &[u8]) -> Result<()> {
        Self::check_range(address, data.len())?;

        let mut offset = address;
        for &byte in data {
            self.data.insert(offset, byte);
            offset = offset.wrapping_add(1);
        }

        Ok(())
    }

    /// Read a value of the given size.
    pub fn read(&self, address: u64, size: OperandSize) -> Result<Value> {
        let bytes = self.read_bytes(address, size.bytes())?;
        let assemble = |value: u128, &byte: &u8| (value << u8::BITS) | u128::from(byte);
        let value = match self.endianness {
            Endianness::Little => bytes.iter().rev().fold(0, assemble),
            Endianness::Big => bytes.iter().fold(0, assemble),
        };

        Ok(Value::new(value, size))
    }

    /// Write a value at its own size.
    pub fn write(&mut self, address: u64, value: Value) -> Result<()> {
        let bytes = value.value().to_le_bytes();
        let mut bytes = bytes[..value.size().bytes()].to_vec();
        if self.endianness == Endianness::Big {
            bytes.reverse();
        }

        self.write_bytes(address, &bytes)
    }

    fn check_range(address: u64, len: usize) -> Result<()> {
        // The last byte accessed is address + len - 1
        let overflows = len
            .checked_sub(1)
            .and_then(|last| u64::try_from(last).ok())
            .map(|last| address.checked_add(last).is_none())
            .unwrap_or(false);

        if overflows {
            Err(Error::InvalidArguments(format!(
                "access of {len} byte(s) overflows address {address:#x}"
            )))
        } else {
            Ok(())
        }
    }
}
