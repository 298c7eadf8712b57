//! SysEx envelope framing for address-block messages.
//!
//! Every message has the shape
//! `F0h <manufacturer> <device id> <model id...> <command> <address...>
//! <payload...> <checksum> F7h`. The address width and the presence of the
//! checksum are device constants, never inferred from the message.

use crate::address::{Address, AddressWidth, SEVEN_BIT_MASK};
use crate::checksum::ChecksumRule;
use crate::CodecError;

/// Start of a System Exclusive message.
pub const SYSEX_START: u8 = 0xF0;
/// End of a System Exclusive message.
pub const SYSEX_END: u8 = 0xF7;

/// Manufacturer identifier byte.
pub type ManufacturerId = u8;
/// Roland's manufacturer identifier.
pub const MF_ID_ROLAND: ManufacturerId = 0x41;
/// Universal non-real-time SysEx identifier.
pub const MF_ID_UNIVERSAL_NON_REAL_TIME: ManufacturerId = 0x7E;

/// Device identifier addressing every unit on the cable.
pub const DV_ID_ALL_CALL: u8 = 0x7F;

/// Address-block command byte.
pub type CommandId = u8;
/// "Request data 1" aka "RQ1".
pub const CM_ID_RQ1: CommandId = 0x11;
/// "Data set 1" aka "DT1".
pub const CM_ID_DT1: CommandId = 0x12;

/// Universal "General Information" sub-ID.
pub const UNIVERSAL_GENERAL_INFORMATION: u8 = 0x06;
/// Universal identity request sub-ID.
pub const UNIVERSAL_IDENTITY_REQUEST: u8 = 0x01;
/// Universal identity reply sub-ID.
pub const UNIVERSAL_IDENTITY_REPLY: u8 = 0x02;

/// Splits a byte stream into complete `F0h ... F7h` messages.
///
/// Bytes outside an envelope are skipped; an unterminated trailing message is
/// dropped.
#[must_use]
pub fn split_messages(stream: &[u8]) -> Vec<&[u8]> {
    let mut messages = Vec::new();
    let mut start = None;
    for (index, byte) in stream.iter().enumerate() {
        match *byte {
            SYSEX_START => start = Some(index),
            SYSEX_END => {
                if let Some(begin) = start.take() {
                    messages.push(&stream[begin..=index]);
                }
            }
            _ => {}
        }
    }
    messages
}

/// Returns the bytes between `F0h` and `F7h`, rejecting anything with the
/// high bit set in between.
///
/// # Errors
///
/// Returns [`CodecError::NotSysEx`] for a missing envelope and
/// [`CodecError::HighBitSet`] for an invalid data byte.
pub fn sysex_body(message: &[u8]) -> Result<&[u8], CodecError> {
    let &[SYSEX_START, ref body @ .., SYSEX_END] = message else {
        return Err(CodecError::NotSysEx);
    };
    if let Some((position, byte)) = body
        .iter()
        .enumerate()
        .find(|(_, byte)| **byte > SEVEN_BIT_MASK)
    {
        return Err(CodecError::HighBitSet {
            position: position + 1,
            byte: *byte,
        });
    }
    Ok(body)
}

/// Manufacturer and model bytes that identify one device family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DeviceIdentity {
    /// Manufacturer byte following `F0h`.
    pub manufacturer_id: ManufacturerId,
    /// Model identifier bytes following the device id.
    pub model_id: Vec<u8>,
    /// Family code reported in a universal identity reply, when the device
    /// answers identity requests.
    pub device_family: Option<[u8; 2]>,
}

impl DeviceIdentity {
    /// Creates a Roland identity.
    #[must_use]
    pub fn roland(model_id: &[u8], device_family: Option<[u8; 2]>) -> Self {
        Self {
            manufacturer_id: MF_ID_ROLAND,
            model_id: model_id.to_vec(),
            device_family,
        }
    }

    /// Number of header bytes between `F0h` and the command byte.
    #[must_use]
    pub fn header_len(&self) -> usize {
        2 + self.model_id.len()
    }
}

/// One decoded wire unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressedMessage {
    /// Device id from the header.
    pub device_id: u8,
    /// Command byte, usually [`CM_ID_RQ1`] or [`CM_ID_DT1`].
    pub command: CommandId,
    /// Target or source address.
    pub address: Address,
    /// Data bytes (for requests, the encoded size).
    pub payload: Vec<u8>,
}

impl AddressedMessage {
    /// Creates a "Data set 1" message.
    #[must_use]
    pub const fn data_set(device_id: u8, address: Address, payload: Vec<u8>) -> Self {
        Self {
            device_id,
            command: CM_ID_DT1,
            address,
            payload,
        }
    }

    /// Creates a "Request data 1" message carrying an encoded size.
    #[must_use]
    pub const fn request(device_id: u8, address: Address, size: Vec<u8>) -> Self {
        Self {
            device_id,
            command: CM_ID_RQ1,
            address,
            payload: size,
        }
    }

    /// Linear offset of the first payload byte.
    #[must_use]
    pub fn linear(&self) -> u32 {
        self.address.to_linear()
    }
}

/// Per-device framing constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framing {
    /// Header bytes expected on every message.
    pub identity: DeviceIdentity,
    /// Address width used by every message of the device.
    pub address_width: AddressWidth,
    /// Checksum rule.
    pub checksum: ChecksumRule,
}

impl Framing {
    /// Serializes `message` into a complete SysEx message.
    #[must_use]
    pub fn encode(&self, message: &AddressedMessage) -> Vec<u8> {
        let address = message.address.as_bytes();
        let mut out = Vec::with_capacity(
            self.identity.header_len()
                + address.len()
                + message.payload.len()
                + self.checksum.trailer_len()
                + 3,
        );
        out.push(SYSEX_START);
        out.push(self.identity.manufacturer_id);
        out.push(message.device_id & SEVEN_BIT_MASK);
        out.extend_from_slice(&self.identity.model_id);
        out.push(message.command);
        let checksum_start = out.len();
        out.extend_from_slice(address);
        out.extend_from_slice(&message.payload);
        if let Some(checksum) = self.checksum.compute(&out[checksum_start..]) {
            out.push(checksum);
        }
        out.push(SYSEX_END);
        out
    }

    /// Parses and validates one complete SysEx message.
    ///
    /// The device id is reported but not checked, replies may come from any
    /// unit number.
    ///
    /// # Errors
    ///
    /// Recognition errors ([`CodecError::NotSysEx`], [`CodecError::ForeignDevice`])
    /// when the message is not ours; structural errors for truncation,
    /// high-bit bytes or a checksum mismatch.
    pub fn decode(&self, message: &[u8]) -> Result<AddressedMessage, CodecError> {
        let &[SYSEX_START, ref body @ .., SYSEX_END] = message else {
            return Err(CodecError::NotSysEx);
        };
        let model_len = self.identity.model_id.len();
        let &[manufacturer_id, device_id, ref rest @ ..] = body else {
            return Err(CodecError::ForeignDevice);
        };
        if manufacturer_id != self.identity.manufacturer_id
            || rest.get(..model_len) != Some(self.identity.model_id.as_slice())
        {
            return Err(CodecError::ForeignDevice);
        }
        let body = sysex_body(message)?;

        let rest = &body[2 + model_len..];
        let address_len = self.address_width.bytes();
        let trailer_len = self.checksum.trailer_len();
        let &[command, ref rest @ ..] = rest else {
            return Err(CodecError::Truncated);
        };
        if rest.len() < address_len + trailer_len {
            return Err(CodecError::Truncated);
        }
        let (checked, trailer) = rest.split_at(rest.len() - trailer_len);
        if let (Some(expected), &[found]) = (self.checksum.compute(checked), trailer) {
            if expected != found {
                return Err(CodecError::ChecksumMismatch { expected, found });
            }
        }
        let (address, payload) = checked.split_at(address_len);
        let address = Address::from_slice(address).ok_or(CodecError::Truncated)?;

        Ok(AddressedMessage {
            device_id,
            command,
            address,
            payload: payload.to_vec(),
        })
    }
}
