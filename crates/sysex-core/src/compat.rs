//! Backward-compatible device families.
//!
//! A newer model often accepts and emits the formats of its predecessors. A
//! [`CompatChain`] builds requests with the primary codec and recognizes
//! data with the first codec in an explicit, ordered list that accepts it.
//! Ties are resolved by list order alone.

use log::debug;

use crate::assembly::{DumpPart, ItemAssembly};
use crate::capability::{
    Adaptation, BankDumpCapable, DeviceDetect, EditBufferCapable, ItemFingerprint, ItemNaming,
    ProgramDumpCapable,
};
use crate::codec::{ParsedItem, RolandCodec};
use crate::session::{Channel, DeviceSession};
use crate::CodecError;

/// Which codec of a chain recognized the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainVariant {
    /// The primary codec.
    Primary,
    /// The legacy codec at this list position.
    Legacy(usize),
}

/// Successful parse through a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMatch {
    /// Codec that recognized the item.
    pub variant: ChainVariant,
    /// The parsed item.
    pub item: ParsedItem,
}

/// Primary codec plus legacy codecs tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatChain {
    primary: RolandCodec,
    legacy: Vec<RolandCodec>,
}

impl CompatChain {
    /// Creates a chain; `legacy` order is the recognition order after the
    /// primary.
    #[must_use]
    pub const fn new(primary: RolandCodec, legacy: Vec<RolandCodec>) -> Self {
        Self { primary, legacy }
    }

    /// The primary codec.
    #[must_use]
    pub const fn primary(&self) -> &RolandCodec {
        &self.primary
    }

    /// Legacy codecs in recognition order.
    #[must_use]
    pub fn legacy(&self) -> &[RolandCodec] {
        &self.legacy
    }

    /// Codec for `variant`.
    #[must_use]
    pub fn codec(&self, variant: ChainVariant) -> Option<&RolandCodec> {
        match variant {
            ChainVariant::Primary => Some(&self.primary),
            ChainVariant::Legacy(index) => self.legacy.get(index),
        }
    }

    /// Every codec with its variant tag, primary first.
    pub fn variants(&self) -> impl Iterator<Item = (ChainVariant, &RolandCodec)> + '_ {
        std::iter::once((ChainVariant::Primary, &self.primary)).chain(
            self.legacy
                .iter()
                .enumerate()
                .map(|(index, codec)| (ChainVariant::Legacy(index), codec)),
        )
    }

    /// Parses `item` with the first codec that accepts it.
    #[must_use]
    pub fn parse(&self, item: &[u8]) -> Option<ChainMatch> {
        self.variants().find_map(|(variant, codec)| {
            let parsed = codec.parse_item(item).ok()?;
            if variant != ChainVariant::Primary {
                debug!(
                    "{}: item recognized by legacy codec {}",
                    self.primary.model_name(),
                    codec.model_name()
                );
            }
            Some(ChainMatch {
                variant,
                item: parsed,
            })
        })
    }

    fn first_where(&self, accepts: impl Fn(&RolandCodec) -> bool) -> Option<&RolandCodec> {
        self.variants()
            .map(|(_, codec)| codec)
            .find(|&codec| accepts(codec))
    }

    fn recognizing(&self, item: &[u8]) -> Result<&RolandCodec, CodecError> {
        self.parse(item)
            .and_then(|found| self.codec(found.variant))
            .ok_or(CodecError::NotAnItemDump)
    }

    /// Offers `message` to the codec that accepted the assembly's first
    /// block, or to every codec in order while the assembly is empty.
    fn first_accepted(
        &self,
        message: &[u8],
        assembly: &ItemAssembly,
        check: impl Fn(&RolandCodec, &[u8], &ItemAssembly) -> DumpPart,
    ) -> DumpPart {
        let Some(first) = assembly.first_message() else {
            return self
                .variants()
                .map(|(_, codec)| check(codec, message, assembly))
                .find(DumpPart::is_accepted)
                .unwrap_or(DumpPart::Rejected);
        };
        let fresh = ItemAssembly::new(assembly.kind());
        self.first_where(|codec| check(codec, first, &fresh).is_accepted())
            .map_or(DumpPart::Rejected, |owner| check(owner, message, assembly))
    }
}

impl DeviceDetect for CompatChain {
    fn build_device_detect(&self, channel: Channel) -> Vec<u8> {
        self.primary.build_device_detect(channel)
    }

    fn channel_from_detect_reply(&self, message: &[u8]) -> Option<Channel> {
        self.variants()
            .find_map(|(_, codec)| codec.channel_from_detect_reply(message))
    }

    fn needs_channel_specific_detection(&self) -> bool {
        self.primary.needs_channel_specific_detection()
    }

    fn detect_wait_milliseconds(&self) -> u32 {
        self.primary.detect_wait_milliseconds()
    }
}

impl EditBufferCapable for CompatChain {
    fn build_edit_buffer_request(
        &self,
        session: &DeviceSession,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        self.primary.build_edit_buffer_request(session)
    }

    fn is_edit_buffer_dump(&self, item: &[u8]) -> bool {
        self.first_where(|codec| codec.is_edit_buffer_dump(item))
            .is_some()
    }

    fn is_part_of_edit_buffer_dump(&self, message: &[u8], assembly: &ItemAssembly) -> DumpPart {
        self.first_accepted(message, assembly, |codec, message, assembly| {
            codec.is_part_of_edit_buffer_dump(message, assembly)
        })
    }

    fn convert_to_edit_buffer(&self, item: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.recognizing(item)?.convert_to_edit_buffer(item)
    }
}

impl ProgramDumpCapable for CompatChain {
    fn build_program_dump_request(
        &self,
        session: &DeviceSession,
        program_index: usize,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        self.primary
            .build_program_dump_request(session, program_index)
    }

    fn is_single_program_dump(&self, item: &[u8]) -> bool {
        self.first_where(|codec| codec.program().is_some() && codec.is_single_program_dump(item))
            .is_some()
    }

    fn is_part_of_program_dump(&self, message: &[u8], assembly: &ItemAssembly) -> DumpPart {
        self.first_accepted(message, assembly, |codec, message, assembly| {
            codec.is_part_of_program_dump(message, assembly)
        })
    }

    fn program_index(&self, item: &[u8]) -> Option<usize> {
        self.variants()
            .find_map(|(_, codec)| codec.program_index(item))
    }

    fn convert_to_program_dump(
        &self,
        item: &[u8],
        target_index: usize,
    ) -> Result<Vec<u8>, CodecError> {
        self.recognizing(item)?
            .convert_to_program_dump(item, target_index)
    }
}

impl BankDumpCapable for CompatChain {
    fn build_bank_dump_request(&self, session: &DeviceSession) -> Result<Vec<u8>, CodecError> {
        self.primary.build_bank_dump_request(session)
    }

    fn is_part_of_bank_dump(&self, message: &[u8]) -> bool {
        self.first_where(|codec| codec.is_part_of_bank_dump(message))
            .is_some()
    }

    fn is_bank_dump_finished(&self, messages: &[Vec<u8>]) -> bool {
        self.first_where(|codec| codec.is_bank_dump_finished(messages))
            .is_some()
    }

    fn extract_items_from_bank(&self, messages: &[Vec<u8>]) -> Vec<Vec<u8>> {
        self.variants()
            .map(|(_, codec)| codec.extract_items_from_bank(messages))
            .find(|items| !items.is_empty())
            .unwrap_or_default()
    }
}

impl ItemNaming for CompatChain {
    fn name_from_item(&self, item: &[u8]) -> Option<String> {
        self.variants()
            .find_map(|(_, codec)| codec.name_from_item(item))
    }

    fn rename_item(&self, item: &[u8], name: &str) -> Result<Vec<u8>, CodecError> {
        self.recognizing(item)?.rename_item(item, name)
    }
}

impl ItemFingerprint for CompatChain {
    fn fingerprint(&self, item: &[u8]) -> Option<String> {
        self.variants()
            .find_map(|(_, codec)| codec.fingerprint(item))
    }
}

impl Adaptation for CompatChain {
    fn name(&self) -> &str {
        self.primary.model_name()
    }

    fn as_edit_buffer(&self) -> Option<&dyn EditBufferCapable> {
        Some(self)
    }

    fn as_program_dump(&self) -> Option<&dyn ProgramDumpCapable> {
        self.primary.program().map(|_| self as &dyn ProgramDumpCapable)
    }

    fn as_bank_dump(&self) -> Option<&dyn BankDumpCapable> {
        self.primary.program().map(|_| self as &dyn BankDumpCapable)
    }

    fn as_naming(&self) -> Option<&dyn ItemNaming> {
        Some(self)
    }

    fn as_fingerprint(&self) -> Option<&dyn ItemFingerprint> {
        Some(self)
    }
}
