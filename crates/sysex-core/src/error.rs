use thiserror::Error;

/// Handling classes used to decide how a codec failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorClass {
    /// Message belongs to another device or dataset. Expected while probing.
    Recognition,
    /// Message claims to be ours but its content is damaged.
    Structural,
    /// Caller asked for something that contradicts the message identity.
    Contract,
}

/// Failures raised while parsing, validating or converting SysEx data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum CodecError {
    /// Data is not framed by `F0h ... F7h`.
    #[error("not a system exclusive message")]
    NotSysEx,
    /// Manufacturer or model bytes do not match this device.
    #[error("message belongs to another device")]
    ForeignDevice,
    /// Command byte is not the one this operation expects.
    #[error("unexpected command {0:#04x}")]
    UnexpectedCommand(u8),
    /// Address lies outside the span of the dataset being checked.
    #[error("address {linear:#x} is outside the dataset")]
    AddressOutsideDataset {
        /// Linear offset decoded from the message address.
        linear: u32,
    },
    /// Header matched but the message is too short to hold address and checksum.
    #[error("message is too short for its header")]
    Truncated,
    /// A byte between the envelope markers uses the high bit.
    #[error("byte {byte:#04x} at position {position} has the high bit set")]
    HighBitSet {
        /// Position inside the message.
        position: usize,
        /// Offending byte value.
        byte: u8,
    },
    /// Trailing checksum does not cancel out the address and payload sum.
    #[error("checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over address and payload.
        expected: u8,
        /// Checksum carried by the message.
        found: u8,
    },
    /// Address is inside the dataset but does not start any declared block.
    #[error("address {linear:#x} does not start a known block")]
    UnknownBlockAddress {
        /// Linear offset decoded from the message address.
        linear: u32,
    },
    /// Block arrived in a position other than the one expected.
    #[error("expected block {expected}, found block {found}")]
    BlockOutOfOrder {
        /// Block index the item needs next.
        expected: usize,
        /// Block index the message carries.
        found: usize,
    },
    /// Message belongs to a different item than the preceding messages.
    #[error("expected item {expected}, found item {found}")]
    ItemMismatch {
        /// Item index established by the first message.
        expected: usize,
        /// Item index of the offending message.
        found: usize,
    },
    /// Payload length disagrees with the declared block size.
    #[error("payload of {found} bytes does not match block size {expected}")]
    PayloadSizeMismatch {
        /// Declared block size.
        expected: usize,
        /// Payload length carried by the message.
        found: usize,
    },
    /// Item data ended before every block was present.
    #[error("item has {found} of {expected} blocks")]
    IncompleteItem {
        /// Number of blocks the dataset declares.
        expected: usize,
        /// Number of messages found.
        found: usize,
    },
    /// Conversion source is neither an edit buffer nor a program dump.
    #[error("data is neither an edit buffer nor a program dump")]
    NotAnItemDump,
    /// Item index is beyond the dataset's repeat count.
    #[error("item index {index} is out of range for {count} items")]
    ItemIndexOutOfRange {
        /// Requested item index.
        index: usize,
        /// Number of items in the dataset.
        count: usize,
    },
    /// Conversion source address does not align with an item boundary.
    #[error("address does not align with an item boundary")]
    UnalignedItemAddress,
    /// Number cannot be written with the available seven-bit digits.
    #[error("value {value:#x} cannot be encoded in {digits} seven-bit bytes")]
    NotRepresentable {
        /// Value that overflowed.
        value: u32,
        /// Number of available digits.
        digits: usize,
    },
    /// Dataset declares no name field.
    #[error("device does not store item names")]
    NameNotSupported,
    /// Device has only an edit buffer.
    #[error("device has no stored program memory")]
    NoProgramMemory,
}

impl CodecError {
    /// Returns the handling class for this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotSysEx
            | Self::ForeignDevice
            | Self::UnexpectedCommand(_)
            | Self::AddressOutsideDataset { .. } => ErrorClass::Recognition,
            Self::Truncated
            | Self::HighBitSet { .. }
            | Self::ChecksumMismatch { .. }
            | Self::UnknownBlockAddress { .. }
            | Self::BlockOutOfOrder { .. }
            | Self::ItemMismatch { .. }
            | Self::PayloadSizeMismatch { .. }
            | Self::IncompleteItem { .. } => ErrorClass::Structural,
            Self::NotAnItemDump
            | Self::ItemIndexOutOfRange { .. }
            | Self::UnalignedItemAddress
            | Self::NotRepresentable { .. }
            | Self::NameNotSupported
            | Self::NoProgramMemory => ErrorClass::Contract,
        }
    }

    /// Recognition and structural failures are reported as data, never escalated.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self.class(), ErrorClass::Contract)
    }

    /// Maps a parse failure onto the error a conversion reports for it.
    #[must_use]
    pub(crate) fn into_conversion_error(self) -> Self {
        match self.class() {
            ErrorClass::Recognition => Self::NotAnItemDump,
            ErrorClass::Structural => match self {
                Self::UnknownBlockAddress { .. } | Self::BlockOutOfOrder { .. } => {
                    Self::UnalignedItemAddress
                }
                other => other,
            },
            ErrorClass::Contract => self,
        }
    }
}

/// Invalid device or dataset tables, reported at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum DefinitionError {
    /// Dataset repeats zero items.
    #[error("dataset `{0}` must contain at least one item")]
    NoItems(String),
    /// Dataset declares no blocks.
    #[error("dataset `{0}` declares no blocks")]
    NoBlocks(String),
    /// A block has zero length.
    #[error("block `{0}` has zero size")]
    EmptyBlock(String),
    /// An address has the wrong number of bytes or a byte above `7Fh`.
    #[error("address {0:02X?} is not a valid seven-bit address of the device width")]
    InvalidAddress(Vec<u8>),
    /// Size fields must use between one and four bytes.
    #[error("unsupported size width {0}")]
    UnsupportedSizeWidth(usize),
    /// Blocks are not in ascending address order or overlap.
    #[error("block `{0}` overlaps or precedes the block before it")]
    OverlappingBlocks(String),
    /// Item stride leaves no room for the item's blocks.
    #[error("item stride {stride:#x} is smaller than the item extent {extent:#x}")]
    StrideTooSmall {
        /// Configured or derived stride.
        stride: u32,
        /// Distance from item start to the end of its last block.
        extent: u32,
    },
    /// Last item ends beyond what the address width can encode.
    #[error("dataset `{0}` extends beyond the addressable range")]
    AddressRangeOverflow(String),
    /// A request size cannot be written in the configured size width.
    #[error("size {size:#x} does not fit in {digits} size bytes")]
    SizeNotRepresentable {
        /// Size that overflowed.
        size: u32,
        /// Configured size width.
        digits: usize,
    },
    /// Name field or blank-out zone reaches beyond the item payload.
    #[error("byte range {offset}+{length} exceeds the item length {item_length}")]
    RangeOutsideItem {
        /// Start of the range inside the item payload.
        offset: usize,
        /// Length of the range.
        length: usize,
        /// Per-item payload length.
        item_length: usize,
    },
    /// Model identifiers are one to four bytes long.
    #[error("model id must be 1 to 4 bytes, got {0}")]
    InvalidModelId(usize),
    /// Edit buffer and program datasets use different address widths.
    #[error("dataset `{0}` does not use the device address width")]
    WidthMismatch(String),
    /// Identity-request detection needs a family code to match replies.
    #[error("device `{0}` detects by identity request but declares no family")]
    MissingDeviceFamily(String),
    /// Device ids `base..=base + 15` must stay within seven bits.
    #[error("device id base {0:#04x} leaves no room for 16 channels")]
    InvalidDeviceIdBase(u8),
}
