use crate::OperandSize;

/// An integer value of a known [OperandSize]. Construction masks the input to the size, so a value
/// never carries bits beyond its width.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Value {
    value: u64,
    size: OperandSize,
}

impl Value {
    /// Create a value from a full precision result, discarding every bit beyond the size.
    pub fn new(value: u128, size: OperandSize) -> Self {
        Self {
            value: (value & size.mask()) as u64,
            size,
        }
    }

    pub fn zero(size: OperandSize) -> Self {
        Self { value: 0, size }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn size(&self) -> OperandSize {
        self.size
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    pub fn is_negative(&self) -> bool {
        u128::from(self.value) & self.size.sign_bit() != 0
    }

    /// Two's complement interpretation of the value at its size.
    pub fn signed_value(&self) -> i64 {
        if self.size == OperandSize::Qword {
            return self.value as i64;
        }

        if self.is_negative() {
            (self.value | (u64::MAX << self.size.bits())) as i64
        } else {
            self.value as i64
        }
    }

    /// Reinterpret the value at a different size, zero extending or truncating as necessary.
    pub fn resize(&self, size: OperandSize) -> Self {
        Self::new(self.value.into(), size)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:#0width$x}",
            self.value,
            // Each byte is represented by 2 hex characters plus the 0x prefix
            width = 2 * self.size.bytes() + 2
        )
    }
}

macro_rules! impl_from_value {
    ($type:ty, $size:expr) => {
        impl From<$type> for Value {
            fn from(value: $type) -> Self {
                Value::new(value.into(), $size)
            }
        }

        impl TryFrom<Value> for $type {
            type Error = std::num::TryFromIntError;
            fn try_from(value: Value) -> Result<Self, Self::Error> {
                <$type>::try_from(value.value())
            }
        }
    };
}

impl_from_value!(u8, OperandSize::Byte);
impl_from_value!(u16, OperandSize::Word);
impl_from_value!(u32, OperandSize::Dword);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::new(value.into(), OperandSize::Qword)
    }
}

impl From<Value> for u64 {
    fn from(value: Value) -> Self {
        value.value()
    }
}
