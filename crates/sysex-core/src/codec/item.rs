use log::{debug, warn};

use super::{report, MemoryKind, RequestMode, RolandCodec};
use crate::assembly::{AssemblyState, DumpPart, ItemAssembly};
use crate::capability::{EditBufferCapable, ItemFingerprint, ItemNaming, ProgramDumpCapable};
use crate::error::ErrorClass;
use crate::fingerprint::payload_fingerprint;
use crate::session::DeviceSession;
use crate::wire::{split_messages, AddressedMessage, CM_ID_DT1};
use crate::CodecError;

/// Character written for name characters the device cannot display.
const NAME_REPLACEMENT: u8 = b'?';
/// Padding for names shorter than the field.
const NAME_PADDING: u8 = b' ';

/// One item decoded from its block messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedItem {
    /// Memory the item was addressed to.
    pub kind: MemoryKind,
    /// Item index inside that memory.
    pub index: usize,
    /// Device id of the first message.
    pub device_id: u8,
    /// Concatenated block payloads.
    pub payload: Vec<u8>,
}

impl RolandCodec {
    /// Parses `item` as an item of `kind`.
    ///
    /// The item must hold one message per block, in block order, each with
    /// the declared block size.
    ///
    /// # Errors
    ///
    /// Recognition errors when the data is not addressed to this memory,
    /// structural errors when it is but is damaged or incomplete.
    pub fn parse_item_as(&self, kind: MemoryKind, item: &[u8]) -> Result<ParsedItem, CodecError> {
        let dataset = self.dataset(kind)?;
        let blocks = dataset.blocks();
        let messages = split_messages(item);
        let mut payload = Vec::with_capacity(dataset.item_length());
        let mut first = None;

        for (position, message) in messages.iter().enumerate() {
            let decoded = self.framing.decode(message)?;
            if decoded.command != CM_ID_DT1 {
                return Err(CodecError::UnexpectedCommand(decoded.command));
            }
            let location = dataset.locate(&decoded.address)?;
            let (index, _) = *first.get_or_insert((location.item, decoded.device_id));
            if location.item != index {
                return Err(CodecError::ItemMismatch {
                    expected: index,
                    found: location.item,
                });
            }
            if location.block != position {
                return Err(CodecError::BlockOutOfOrder {
                    expected: position,
                    found: location.block,
                });
            }
            let expected = blocks[position].len();
            if decoded.payload.len() != expected {
                return Err(CodecError::PayloadSizeMismatch {
                    expected,
                    found: decoded.payload.len(),
                });
            }
            payload.extend_from_slice(&decoded.payload);
        }

        let (index, device_id) = first.ok_or(CodecError::NotSysEx)?;
        if messages.len() < blocks.len() {
            return Err(CodecError::IncompleteItem {
                expected: blocks.len(),
                found: messages.len(),
            });
        }
        Ok(ParsedItem {
            kind,
            index,
            device_id,
            payload,
        })
    }

    /// Parses `item` as an edit buffer, or as a stored program when it is
    /// not addressed to the edit buffer.
    ///
    /// # Errors
    ///
    /// See [`RolandCodec::parse_item_as`].
    pub fn parse_item(&self, item: &[u8]) -> Result<ParsedItem, CodecError> {
        match self.parse_item_as(MemoryKind::EditBuffer, item) {
            Err(err) if err.class() == ErrorClass::Recognition && self.program.is_some() => {
                self.parse_item_as(MemoryKind::Program, item)
            }
            parsed => parsed,
        }
    }

    /// Serializes `payload` as item `index` of `kind`, one message per block.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::PayloadSizeMismatch`] unless `payload` is exactly
    /// one item long and [`CodecError::ItemIndexOutOfRange`] for an unknown
    /// index.
    pub fn emit_item(
        &self,
        kind: MemoryKind,
        index: usize,
        device_id: u8,
        payload: &[u8],
    ) -> Result<Vec<u8>, CodecError> {
        let dataset = self.dataset(kind)?;
        let parts = dataset
            .split_payload(payload)
            .ok_or(CodecError::PayloadSizeMismatch {
                expected: dataset.item_length(),
                found: payload.len(),
            })?;
        let mut out = Vec::new();
        for (block, part) in parts.into_iter().enumerate() {
            let address = dataset.block_address(index, block)?;
            let message = AddressedMessage::data_set(device_id, address, part.to_vec());
            out.extend(self.framing.encode(&message));
        }
        Ok(out)
    }

    fn recognizes(&self, kind: MemoryKind, item: &[u8]) -> bool {
        self.parse_item_as(kind, item)
            .inspect_err(|err| report(&self.model_name, err))
            .is_ok()
    }

    fn convert(&self, item: &[u8], kind: MemoryKind, index: usize) -> Result<Vec<u8>, CodecError> {
        let parsed = self
            .parse_item(item)
            .inspect_err(|err| report(&self.model_name, err))
            .map_err(CodecError::into_conversion_error)?;
        self.emit_item(kind, index, parsed.device_id, &parsed.payload)
    }

    fn check_part(
        &self,
        kind: MemoryKind,
        message: &[u8],
        assembly: &ItemAssembly,
    ) -> Result<DumpPart, CodecError> {
        let AssemblyState::AwaitingBlock(expected) = assembly.state() else {
            return Ok(DumpPart::Rejected);
        };
        if assembly.kind() != kind {
            return Ok(DumpPart::Rejected);
        }
        let dataset = self.dataset(kind)?;
        let decoded = self.framing.decode(message)?;
        if decoded.command != CM_ID_DT1 {
            return Err(CodecError::UnexpectedCommand(decoded.command));
        }
        let location = dataset.locate(&decoded.address)?;
        if location.block != expected {
            return Err(CodecError::BlockOutOfOrder {
                expected,
                found: location.block,
            });
        }
        if let Some(item) = assembly.item() {
            if item != location.item {
                return Err(CodecError::ItemMismatch {
                    expected: item,
                    found: location.item,
                });
            }
        }
        let size = dataset.blocks()[location.block].len();
        if decoded.payload.len() != size {
            return Err(CodecError::PayloadSizeMismatch {
                expected: size,
                found: decoded.payload.len(),
            });
        }

        let block_count = dataset.blocks().len();
        let next = location.block + 1;
        let follow_up = if self.request_mode == RequestMode::Pull && next < block_count {
            Some(self.block_request(dataset, location.item, next, decoded.device_id)?)
        } else {
            None
        };
        Ok(DumpPart::Accepted {
            item: location.item,
            block: location.block,
            block_count,
            follow_up,
        })
    }

    fn part_of(&self, kind: MemoryKind, message: &[u8], assembly: &ItemAssembly) -> DumpPart {
        self.check_part(kind, message, assembly)
            .unwrap_or_else(|err| {
                match err.class() {
                    ErrorClass::Recognition => {}
                    ErrorClass::Structural
                        if !matches!(
                            err,
                            CodecError::BlockOutOfOrder { .. }
                                | CodecError::ItemMismatch { .. }
                                | CodecError::UnknownBlockAddress { .. }
                        ) =>
                    {
                        warn!("{}: discarding corrupt block: {err}", self.model_name);
                    }
                    _ => debug!("{}: block not part of this dump: {err}", self.model_name),
                }
                DumpPart::Rejected
            })
    }
}

impl EditBufferCapable for RolandCodec {
    fn build_edit_buffer_request(
        &self,
        session: &DeviceSession,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        self.item_requests(MemoryKind::EditBuffer, 0, session)
    }

    fn is_edit_buffer_dump(&self, item: &[u8]) -> bool {
        self.recognizes(MemoryKind::EditBuffer, item)
    }

    fn is_part_of_edit_buffer_dump(&self, message: &[u8], assembly: &ItemAssembly) -> DumpPart {
        self.part_of(MemoryKind::EditBuffer, message, assembly)
    }

    fn convert_to_edit_buffer(&self, item: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.convert(item, MemoryKind::EditBuffer, 0)
    }
}

impl ProgramDumpCapable for RolandCodec {
    fn build_program_dump_request(
        &self,
        session: &DeviceSession,
        program_index: usize,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        self.item_requests(MemoryKind::Program, program_index, session)
    }

    fn is_single_program_dump(&self, item: &[u8]) -> bool {
        self.recognizes(MemoryKind::Program, item)
    }

    fn is_part_of_program_dump(&self, message: &[u8], assembly: &ItemAssembly) -> DumpPart {
        self.part_of(MemoryKind::Program, message, assembly)
    }

    fn program_index(&self, item: &[u8]) -> Option<usize> {
        self.parse_item_as(MemoryKind::Program, item)
            .ok()
            .map(|parsed| parsed.index)
    }

    fn convert_to_program_dump(
        &self,
        item: &[u8],
        target_index: usize,
    ) -> Result<Vec<u8>, CodecError> {
        self.convert(item, MemoryKind::Program, target_index)
    }
}

impl ItemNaming for RolandCodec {
    fn name_from_item(&self, item: &[u8]) -> Option<String> {
        let parsed = self.parse_item(item).ok()?;
        let field = self.dataset(parsed.kind).ok()?.name_field()?;
        let name: String = parsed
            .payload
            .get(field.offset..field.end())?
            .iter()
            .map(|byte| char::from(*byte))
            .collect();
        Some(name.trim_end_matches([' ', '\0']).to_owned())
    }

    fn rename_item(&self, item: &[u8], name: &str) -> Result<Vec<u8>, CodecError> {
        let mut parsed = self
            .parse_item(item)
            .map_err(CodecError::into_conversion_error)?;
        let field = self
            .dataset(parsed.kind)?
            .name_field()
            .ok_or(CodecError::NameNotSupported)?;
        let encoded = name
            .chars()
            .map(|c| {
                u8::try_from(c)
                    .ok()
                    .filter(|byte| byte.is_ascii_graphic() || *byte == b' ')
                    .unwrap_or(NAME_REPLACEMENT)
            })
            .chain(std::iter::repeat(NAME_PADDING))
            .take(field.length);
        for (slot, byte) in parsed.payload[field.offset..field.end()]
            .iter_mut()
            .zip(encoded)
        {
            *slot = byte;
        }
        self.emit_item(parsed.kind, parsed.index, parsed.device_id, &parsed.payload)
    }
}

impl ItemFingerprint for RolandCodec {
    fn fingerprint(&self, item: &[u8]) -> Option<String> {
        let parsed = self.parse_item(item).ok()?;
        let dataset = self.dataset(parsed.kind).ok()?;
        Some(payload_fingerprint(
            &parsed.payload,
            dataset.fingerprint_exclusions(),
        ))
    }
}
