//! Address-block SysEx codec for MIDI librarian device adaptations.

/// Error taxonomy for codec operations and device tables.
pub mod error;
pub use error::{CodecError, DefinitionError, ErrorClass};

/// Seven-bit address and size arithmetic.
pub mod address;
pub use address::{
    address_to_linear, digit_capacity, linear_to_address, number_to_size, size_to_number,
    Address, AddressWidth, MAX_ADDRESS_BYTES, MAX_SIZE_BYTES, SEVEN_BIT_MASK, SEVEN_BIT_RADIX,
};

/// Checksum rules.
pub mod checksum;
pub use checksum::{checksum_is_valid, roland_checksum, ChecksumRule};

/// SysEx envelope framing and message encoding.
pub mod wire;
pub use wire::{
    split_messages, sysex_body, AddressedMessage, CommandId, DeviceIdentity, Framing,
    ManufacturerId, CM_ID_DT1, CM_ID_RQ1, DV_ID_ALL_CALL, MF_ID_ROLAND,
    MF_ID_UNIVERSAL_NON_REAL_TIME, SYSEX_END, SYSEX_START,
};

/// Block and dataset descriptors.
pub mod dataset;
pub use dataset::{
    BlockDescriptor, BlockLocation, BlockSize, BlockSpec, ByteRange, Dataset, DatasetSpec,
    NameField,
};

/// Caller-owned session state.
pub mod session;
pub use session::{Channel, DeviceSession, CHANNEL_COUNT, DEFAULT_DEVICE_ID_BASE};

/// Capability traits queried by the host.
pub mod capability;
pub use capability::{
    Adaptation, BankDumpCapable, DeviceDetect, EditBufferCapable, ItemFingerprint, ItemNaming,
    ProgramDumpCapable,
};

/// Multi-message item accumulation.
pub mod assembly;
pub use assembly::{AssemblyState, DumpPart, ItemAssembly};

/// Bank dump reassembly into a linear memory image.
pub mod reassembler;
pub use reassembler::{BulkReassembler, LinearMemoryImage, UNWRITTEN};

/// Item content fingerprints.
pub mod fingerprint;
pub use fingerprint::{fnv1a_64, payload_fingerprint};

/// Device codec bound to an identity and its datasets.
pub mod codec;
pub use codec::{
    DetectMethod, DeviceSpec, MemoryKind, ParsedItem, RequestMode, RolandCodec,
    DEFAULT_DETECT_WAIT_MILLISECONDS,
};

/// Ordered backward-compatibility chains.
pub mod compat;
pub use compat::{ChainMatch, ChainVariant, CompatChain};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
