//! Roland-style address-block device codec.
//!
//! A [`RolandCodec`] binds an edit-buffer dataset and an optional stored
//! program dataset to one device identity. Host-facing operations are
//! exposed through the traits in [`crate::capability`].

mod bank;
mod detect;
mod item;

pub use item::ParsedItem;

use log::{debug, warn};

use crate::address::{number_to_size, Address, AddressWidth};
use crate::capability::{
    Adaptation, BankDumpCapable, EditBufferCapable, ItemFingerprint, ItemNaming,
    ProgramDumpCapable,
};
use crate::checksum::ChecksumRule;
use crate::dataset::{Dataset, DatasetSpec};
use crate::error::ErrorClass;
use crate::session::{Channel, DeviceSession, CHANNEL_COUNT, DEFAULT_DEVICE_ID_BASE};
use crate::wire::{AddressedMessage, DeviceIdentity, Framing};
use crate::{CodecError, DefinitionError};

/// Longest model id any supported device uses.
pub const MAX_MODEL_ID_BYTES: usize = 4;
/// Detection wait used when a device does not declare one.
pub const DEFAULT_DETECT_WAIT_MILLISECONDS: u32 = 300;

/// Which device memory an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryKind {
    /// Temporary, unsaved parameters.
    EditBuffer,
    /// Stored program slots.
    Program,
}

/// How a device is found on the cable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DetectMethod {
    /// Universal identity request, reply checked against the device family.
    IdentityRequest,
    /// Read request for a system block, for devices that ignore identity
    /// requests but answer legitimate memory reads.
    ReadBlock {
        /// Absolute address of the block.
        address: Vec<u8>,
        /// Number of bytes to read.
        size: u32,
    },
}

/// How item requests are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RequestMode {
    /// One request per block, all sent up front.
    #[default]
    Batch,
    /// Only the first block is requested; each accepted block yields the
    /// request for the next.
    Pull,
}

/// Unvalidated device declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DeviceSpec {
    /// Name shown to the user, e.g. "Roland JV-1080".
    pub model_name: String,
    /// Manufacturer, model and family bytes.
    pub identity: DeviceIdentity,
    /// Width of every address the device uses.
    pub address_width: AddressWidth,
    /// Checksum rule.
    pub checksum: ChecksumRule,
    /// Detection rule.
    pub detect: DetectMethod,
    /// How long the host should wait for a detect reply.
    pub detect_wait_milliseconds: u32,
    /// Device id answering on channel 1.
    pub device_id_base: u8,
    /// Request strategy for multi-block items.
    pub request_mode: RequestMode,
    /// Temporary memory.
    pub edit_buffer: DatasetSpec,
    /// Stored programs, when the device has them.
    pub program_dump: Option<DatasetSpec>,
}

impl DeviceSpec {
    /// Starts a Roland-checksummed device detected by identity request.
    #[must_use]
    pub fn new(
        model_name: impl Into<String>,
        identity: DeviceIdentity,
        address_width: AddressWidth,
        edit_buffer: DatasetSpec,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            identity,
            address_width,
            checksum: ChecksumRule::Roland,
            detect: DetectMethod::IdentityRequest,
            detect_wait_milliseconds: DEFAULT_DETECT_WAIT_MILLISECONDS,
            device_id_base: DEFAULT_DEVICE_ID_BASE,
            request_mode: RequestMode::Batch,
            edit_buffer,
            program_dump: None,
        }
    }

    /// Declares stored program memory.
    #[must_use]
    pub fn program_dump(mut self, dataset: DatasetSpec) -> Self {
        self.program_dump = Some(dataset);
        self
    }

    /// Replaces the detection rule.
    #[must_use]
    pub fn detect(mut self, detect: DetectMethod) -> Self {
        self.detect = detect;
        self
    }

    /// Sets the detect reply timeout.
    #[must_use]
    pub const fn detect_wait_milliseconds(mut self, milliseconds: u32) -> Self {
        self.detect_wait_milliseconds = milliseconds;
        self
    }

    /// Sets the checksum rule.
    #[must_use]
    pub const fn checksum(mut self, checksum: ChecksumRule) -> Self {
        self.checksum = checksum;
        self
    }

    /// Sets the request strategy.
    #[must_use]
    pub const fn request_mode(mut self, mode: RequestMode) -> Self {
        self.request_mode = mode;
        self
    }

    /// Validates the declaration.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] for invalid tables.
    pub fn build(self) -> Result<RolandCodec, DefinitionError> {
        RolandCodec::try_from(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Detect {
    IdentityRequest { family: [u8; 2] },
    ReadBlock { address: Address, size: Vec<u8> },
}

/// Validated codec for one device model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolandCodec {
    model_name: String,
    framing: Framing,
    detect: Detect,
    detect_wait_milliseconds: u32,
    device_id_base: u8,
    request_mode: RequestMode,
    edit_buffer: Dataset,
    program: Option<Dataset>,
}

impl TryFrom<DeviceSpec> for RolandCodec {
    type Error = DefinitionError;

    fn try_from(spec: DeviceSpec) -> Result<Self, Self::Error> {
        let model_len = spec.identity.model_id.len();
        if model_len == 0 || model_len > MAX_MODEL_ID_BYTES {
            return Err(DefinitionError::InvalidModelId(model_len));
        }
        if spec.device_id_base > 0x7F - (CHANNEL_COUNT - 1) {
            return Err(DefinitionError::InvalidDeviceIdBase(spec.device_id_base));
        }
        let width = spec.address_width;
        let edit_buffer = checked_dataset(spec.edit_buffer, width)?;
        let program = spec
            .program_dump
            .map(|dataset| checked_dataset(dataset, width))
            .transpose()?;

        let detect = match spec.detect {
            DetectMethod::IdentityRequest => Detect::IdentityRequest {
                family: spec
                    .identity
                    .device_family
                    .ok_or_else(|| DefinitionError::MissingDeviceFamily(spec.model_name.clone()))?,
            },
            DetectMethod::ReadBlock { address, size } => {
                let checked = Address::from_slice(&address)
                    .filter(|checked| checked.width() == width)
                    .ok_or(DefinitionError::InvalidAddress(address))?;
                let digits = edit_buffer.size_width();
                let size = number_to_size(size, digits)
                    .map_err(|_| DefinitionError::SizeNotRepresentable { size, digits })?;
                Detect::ReadBlock {
                    address: checked,
                    size,
                }
            }
        };

        Ok(Self {
            model_name: spec.model_name,
            framing: Framing {
                identity: spec.identity,
                address_width: width,
                checksum: spec.checksum,
            },
            detect,
            detect_wait_milliseconds: spec.detect_wait_milliseconds,
            device_id_base: spec.device_id_base,
            request_mode: spec.request_mode,
            edit_buffer,
            program,
        })
    }
}

fn checked_dataset(spec: DatasetSpec, width: AddressWidth) -> Result<Dataset, DefinitionError> {
    if spec.address_width != width {
        return Err(DefinitionError::WidthMismatch(spec.name));
    }
    spec.build()
}

impl RolandCodec {
    /// Model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Wire framing constants.
    #[must_use]
    pub const fn framing(&self) -> &Framing {
        &self.framing
    }

    /// Temporary memory dataset.
    #[must_use]
    pub const fn edit_buffer(&self) -> &Dataset {
        &self.edit_buffer
    }

    /// Stored program dataset.
    #[must_use]
    pub const fn program(&self) -> Option<&Dataset> {
        self.program.as_ref()
    }

    /// Request strategy.
    #[must_use]
    pub const fn request_mode(&self) -> RequestMode {
        self.request_mode
    }

    /// Device id answering on channel 1.
    #[must_use]
    pub const fn device_id_base(&self) -> u8 {
        self.device_id_base
    }

    /// Session for a device detected on `channel`.
    #[must_use]
    pub const fn session(&self, channel: Channel) -> DeviceSession {
        DeviceSession::new(channel, self.device_id_base)
    }

    /// Dataset backing `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NoProgramMemory`] for program requests on a
    /// device with only an edit buffer.
    pub fn dataset(&self, kind: MemoryKind) -> Result<&Dataset, CodecError> {
        match kind {
            MemoryKind::EditBuffer => Ok(&self.edit_buffer),
            MemoryKind::Program => self.program.as_ref().ok_or(CodecError::NoProgramMemory),
        }
    }

    fn block_request(
        &self,
        dataset: &Dataset,
        item: usize,
        block: usize,
        device_id: u8,
    ) -> Result<Vec<u8>, CodecError> {
        let address = dataset.block_address(item, block)?;
        let size = number_to_size(dataset.blocks()[block].size(), dataset.size_width())?;
        Ok(self
            .framing
            .encode(&AddressedMessage::request(device_id, address, size)))
    }

    fn item_requests(
        &self,
        kind: MemoryKind,
        item: usize,
        session: &DeviceSession,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        let dataset = self.dataset(kind)?;
        let blocks = match self.request_mode {
            RequestMode::Batch => dataset.blocks().len(),
            RequestMode::Pull => 1,
        };
        (0..blocks)
            .map(|block| self.block_request(dataset, item, block, session.device_id()))
            .collect()
    }
}

impl Adaptation for RolandCodec {
    fn name(&self) -> &str {
        self.model_name()
    }

    fn as_edit_buffer(&self) -> Option<&dyn EditBufferCapable> {
        Some(self)
    }

    fn as_program_dump(&self) -> Option<&dyn ProgramDumpCapable> {
        self.program().map(|_| self as &dyn ProgramDumpCapable)
    }

    fn as_bank_dump(&self) -> Option<&dyn BankDumpCapable> {
        self.program().map(|_| self as &dyn BankDumpCapable)
    }

    fn as_naming(&self) -> Option<&dyn ItemNaming> {
        Some(self)
    }

    fn as_fingerprint(&self) -> Option<&dyn ItemFingerprint> {
        Some(self)
    }
}

/// Logs a recoverable failure the way its class demands.
fn report(model_name: &str, err: &CodecError) {
    match (err.class(), err) {
        (ErrorClass::Recognition, _) => {}
        (ErrorClass::Structural, CodecError::IncompleteItem { .. }) | (ErrorClass::Contract, _) => {
            debug!("{model_name}: {err}");
        }
        (ErrorClass::Structural, _) => warn!("{model_name}: discarding corrupt data: {err}"),
    }
}
