//! Seven-bit address and size arithmetic.
//!
//! Devices in this family encode addresses and sizes as big-endian base-128
//! numbers: every byte carries seven significant bits so the value can travel
//! inside a SysEx payload. These helpers map such digit strings to and from a
//! flat linear offset.

use std::fmt::{self, Display, Formatter};

use crate::{CodecError, DefinitionError};

/// Largest address width used by any supported device.
pub const MAX_ADDRESS_BYTES: usize = 4;
/// Largest size-field width used by any supported device.
pub const MAX_SIZE_BYTES: usize = 4;
/// Radix of one seven-bit digit.
pub const SEVEN_BIT_RADIX: u32 = 0x80;
/// Mask of the significant bits in one seven-bit digit.
pub const SEVEN_BIT_MASK: u8 = 0x7F;

/// Number of seven-bit bytes a device uses to encode an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressWidth {
    /// Three-byte addresses (MT-32, D-110 and other early models).
    Three,
    /// Four-byte addresses (JV, XV and later models).
    Four,
}

impl AddressWidth {
    /// Converts a byte count into an address width.
    #[must_use]
    pub const fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            _ => None,
        }
    }

    /// Returns the number of address bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Three => 3,
            Self::Four => 4,
        }
    }

    /// Returns the number of distinct linear offsets this width can address.
    #[must_use]
    pub const fn capacity(self) -> u32 {
        digit_capacity(self.bytes())
    }
}

/// Returns `128^digits`, the count of values expressible in `digits` bytes.
#[must_use]
pub const fn digit_capacity(digits: usize) -> u32 {
    let mut capacity = 1u32;
    let mut index = 0;
    while index < digits {
        capacity *= SEVEN_BIT_RADIX;
        index += 1;
    }
    capacity
}

/// Interprets `address` as a big-endian base-128 number.
///
/// Bytes are expected to be masked to seven bits already and the slice to
/// hold at most [`MAX_ADDRESS_BYTES`] digits.
#[must_use]
pub const fn address_to_linear(address: &[u8]) -> u32 {
    let mut linear = 0u32;
    let mut index = 0;
    while index < address.len() {
        linear = linear * SEVEN_BIT_RADIX + address[index] as u32;
        index += 1;
    }
    linear
}

/// Decomposes `offset` into `width` base-128 digits, most significant first.
///
/// # Errors
///
/// Returns [`CodecError::NotRepresentable`] when `offset` needs more digits
/// than `width` provides.
pub fn linear_to_address(offset: u32, width: AddressWidth) -> Result<Address, CodecError> {
    let mut digits = [0u8; MAX_ADDRESS_BYTES];
    encode_digits(offset, &mut digits[..width.bytes()])?;
    Ok(Address { digits, width })
}

/// Interprets a size field using the same base-128 encoding as addresses.
#[must_use]
pub const fn size_to_number(size: &[u8]) -> u32 {
    address_to_linear(size)
}

/// Encodes `number` as a size field of `width` seven-bit bytes.
///
/// # Errors
///
/// Returns [`CodecError::NotRepresentable`] when `number` needs more than
/// `width` digits or `width` exceeds [`MAX_SIZE_BYTES`].
pub fn number_to_size(number: u32, width: usize) -> Result<Vec<u8>, CodecError> {
    if width == 0 || width > MAX_SIZE_BYTES {
        return Err(CodecError::NotRepresentable {
            value: number,
            digits: width,
        });
    }
    let mut digits = vec![0u8; width];
    encode_digits(number, &mut digits)?;
    Ok(digits)
}

fn encode_digits(value: u32, out: &mut [u8]) -> Result<(), CodecError> {
    let mut rest = value;
    for digit in out.iter_mut().rev() {
        #[allow(clippy::cast_possible_truncation)]
        {
            *digit = (rest % SEVEN_BIT_RADIX) as u8;
        }
        rest /= SEVEN_BIT_RADIX;
    }
    if rest == 0 {
        Ok(())
    } else {
        Err(CodecError::NotRepresentable {
            value,
            digits: out.len(),
        })
    }
}

/// A device memory address of three or four seven-bit bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(try_from = "Vec<u8>", into = "Vec<u8>")
)]
pub struct Address {
    digits: [u8; MAX_ADDRESS_BYTES],
    width: AddressWidth,
}

impl Address {
    /// Builds an address from raw bytes.
    ///
    /// Returns `None` unless `bytes` holds three or four values in `0..=7Fh`.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let width = AddressWidth::from_bytes(bytes.len())?;
        if bytes.iter().any(|byte| *byte > SEVEN_BIT_MASK) {
            return None;
        }
        let mut digits = [0u8; MAX_ADDRESS_BYTES];
        digits[..bytes.len()].copy_from_slice(bytes);
        Some(Self { digits, width })
    }

    /// Decodes a linear offset into an address of the given width.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotRepresentable`] when `offset` does not fit.
    pub fn from_linear(offset: u32, width: AddressWidth) -> Result<Self, CodecError> {
        linear_to_address(offset, width)
    }

    /// Returns the address width.
    #[must_use]
    pub const fn width(&self) -> AddressWidth {
        self.width
    }

    /// Returns the address bytes, most significant first.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.digits[..self.width.bytes()]
    }

    /// Returns the linear offset this address encodes.
    #[must_use]
    pub fn to_linear(&self) -> u32 {
        address_to_linear(self.as_bytes())
    }

    /// Returns the address `delta` linear steps further on.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotRepresentable`] when the result leaves the
    /// address space.
    pub fn offset_by(&self, delta: u32) -> Result<Self, CodecError> {
        let linear = self
            .to_linear()
            .checked_add(delta)
            .ok_or(CodecError::NotRepresentable {
                value: u32::MAX,
                digits: self.width.bytes(),
            })?;
        linear_to_address(linear, self.width)
    }
}

impl TryFrom<Vec<u8>> for Address {
    type Error = DefinitionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_slice(&bytes).ok_or(DefinitionError::InvalidAddress(bytes))
    }
}

impl From<Address> for Vec<u8> {
    fn from(address: Address) -> Self {
        address.as_bytes().to_vec()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, byte) in self.as_bytes().iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        write!(f, "h")
    }
}
