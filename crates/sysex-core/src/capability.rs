//! Capability interfaces a librarian host queries explicitly.
//!
//! An item is the concatenation of its complete SysEx messages, one per
//! block. Recognition functions return `bool`/`Option` and never fail;
//! operations that can violate a caller contract return `Result`.

use crate::assembly::{DumpPart, ItemAssembly};
use crate::session::{Channel, DeviceSession};
use crate::CodecError;

/// Finding a device on the cable.
pub trait DeviceDetect {
    /// Message that makes a device on `channel` reply.
    fn build_device_detect(&self, channel: Channel) -> Vec<u8>;

    /// Channel reported by a detect reply, or `None` when the reply is not
    /// from this device.
    fn channel_from_detect_reply(&self, message: &[u8]) -> Option<Channel>;

    /// Returns `true` when the detect message must be sent on every channel
    /// separately.
    fn needs_channel_specific_detection(&self) -> bool;

    /// How long the host waits for a detect reply.
    fn detect_wait_milliseconds(&self) -> u32;
}

/// Reading and writing the temporary edit buffer.
pub trait EditBufferCapable {
    /// Requests for every block of the edit buffer.
    ///
    /// # Errors
    ///
    /// Returns a contract error when a request cannot be encoded.
    fn build_edit_buffer_request(
        &self,
        session: &DeviceSession,
    ) -> Result<Vec<Vec<u8>>, CodecError>;

    /// Returns `true` for a complete, valid edit buffer item.
    fn is_edit_buffer_dump(&self, item: &[u8]) -> bool;

    /// Checks whether `message` is the next block of `assembly`.
    fn is_part_of_edit_buffer_dump(&self, message: &[u8], assembly: &ItemAssembly) -> DumpPart;

    /// Re-addresses an edit buffer or program item as an edit buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotAnItemDump`] when `item` is neither.
    fn convert_to_edit_buffer(&self, item: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Reading and writing stored programs.
pub trait ProgramDumpCapable {
    /// Requests for every block of program `program_index`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ItemIndexOutOfRange`] for an unknown slot.
    fn build_program_dump_request(
        &self,
        session: &DeviceSession,
        program_index: usize,
    ) -> Result<Vec<Vec<u8>>, CodecError>;

    /// Returns `true` for a complete, valid program item.
    fn is_single_program_dump(&self, item: &[u8]) -> bool;

    /// Checks whether `message` is the next block of `assembly`.
    fn is_part_of_program_dump(&self, message: &[u8], assembly: &ItemAssembly) -> DumpPart;

    /// Stored slot of a program item.
    fn program_index(&self, item: &[u8]) -> Option<usize>;

    /// Re-addresses an edit buffer or program item to slot `target_index`.
    ///
    /// Only address and checksum bytes change.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotAnItemDump`] when `item` is neither and
    /// [`CodecError::ItemIndexOutOfRange`] for an unknown target slot.
    fn convert_to_program_dump(
        &self,
        item: &[u8],
        target_index: usize,
    ) -> Result<Vec<u8>, CodecError>;
}

/// Receiving whole banks as address-tagged fragments.
pub trait BankDumpCapable {
    /// Request for the whole program memory.
    ///
    /// # Errors
    ///
    /// Returns a contract error when the span does not fit the size field.
    fn build_bank_dump_request(&self, session: &DeviceSession) -> Result<Vec<u8>, CodecError>;

    /// Returns `true` for a data message inside program memory.
    fn is_part_of_bank_dump(&self, message: &[u8]) -> bool;

    /// Returns `true` once every program byte has been received.
    fn is_bank_dump_finished(&self, messages: &[Vec<u8>]) -> bool;

    /// Program items rebuilt from the fragments, one per complete slot.
    fn extract_items_from_bank(&self, messages: &[Vec<u8>]) -> Vec<Vec<u8>>;
}

/// Reading and writing item names.
pub trait ItemNaming {
    /// Name stored in the item, trailing spaces trimmed.
    fn name_from_item(&self, item: &[u8]) -> Option<String>;

    /// Item with its name replaced and checksums recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NameNotSupported`] when the device stores no
    /// name and [`CodecError::NotAnItemDump`] for foreign data.
    fn rename_item(&self, item: &[u8], name: &str) -> Result<Vec<u8>, CodecError>;
}

/// Content hashing for duplicate detection.
pub trait ItemFingerprint {
    /// Hash of the item payload ignoring name, addresses and checksums.
    fn fingerprint(&self, item: &[u8]) -> Option<String>;
}

/// A registered device adaptation.
///
/// Capabilities are discovered through the `as_*` queries; each returns
/// `None` when the device lacks the feature.
pub trait Adaptation: DeviceDetect + Send + Sync {
    /// Name shown to the user.
    fn name(&self) -> &str;

    /// Edit buffer support.
    fn as_edit_buffer(&self) -> Option<&dyn EditBufferCapable> {
        None
    }

    /// Stored program support.
    fn as_program_dump(&self) -> Option<&dyn ProgramDumpCapable> {
        None
    }

    /// Bank dump support.
    fn as_bank_dump(&self) -> Option<&dyn BankDumpCapable> {
        None
    }

    /// Name support.
    fn as_naming(&self) -> Option<&dyn ItemNaming> {
        None
    }

    /// Fingerprint support.
    fn as_fingerprint(&self) -> Option<&dyn ItemFingerprint> {
        None
    }
}
