//! Bank dump reassembly.
//!
//! Bank dumps arrive as address-tagged fragments in any order and with no
//! relation to item boundaries. Fragments are written into a flat image of
//! the dataset span; items are sliced out once the host stops listening.

use log::{debug, warn};

use crate::dataset::Dataset;
use crate::error::ErrorClass;
use crate::wire::{Framing, CM_ID_DT1};

/// Sentinel for bytes no fragment has written. Data bytes never exceed `7Fh`.
pub const UNWRITTEN: u8 = 0xFF;

/// Flat byte image of a linear address range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearMemoryImage {
    base: u32,
    bytes: Vec<u8>,
}

impl LinearMemoryImage {
    /// Creates an image of `len` unwritten bytes starting at linear offset `base`.
    #[must_use]
    pub fn new(base: u32, len: usize) -> Self {
        Self {
            base,
            bytes: vec![UNWRITTEN; len],
        }
    }

    /// Linear offset of the first byte.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Image length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-length image.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies `data` to linear offset `linear`.
    ///
    /// Returns `false`, leaving the image untouched, when any byte would land
    /// outside the image.
    pub fn write(&mut self, linear: u32, data: &[u8]) -> bool {
        let Some(start) = linear.checked_sub(self.base) else {
            return false;
        };
        let start = start as usize;
        match self.bytes.get_mut(start..start + data.len()) {
            Some(target) => {
                target.copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    /// Bytes at `range`, relative to the base.
    #[must_use]
    pub fn get(&self, range: std::ops::Range<usize>) -> Option<&[u8]> {
        self.bytes.get(range)
    }

    /// Returns `true` when every byte in `range` has been written.
    #[must_use]
    pub fn is_written(&self, range: std::ops::Range<usize>) -> bool {
        self.get(range)
            .is_some_and(|bytes| !bytes.contains(&UNWRITTEN))
    }
}

/// Rebuilds the items of one dataset from bank dump fragments.
///
/// Each reassembler owns its image.
#[derive(Debug, Clone)]
pub struct BulkReassembler<'a> {
    framing: &'a Framing,
    dataset: &'a Dataset,
    image: LinearMemoryImage,
    device_id: Option<u8>,
}

impl<'a> BulkReassembler<'a> {
    /// Allocates an unwritten image covering the dataset span.
    #[must_use]
    pub fn new(framing: &'a Framing, dataset: &'a Dataset) -> Self {
        Self {
            framing,
            dataset,
            image: LinearMemoryImage::new(
                dataset.base_address().to_linear(),
                dataset.span() as usize,
            ),
            device_id: None,
        }
    }

    /// Writes one fragment into the image.
    ///
    /// Foreign messages are ignored, corrupt ones and fragments reaching
    /// outside the image are dropped with a warning. Returns `true` when the
    /// fragment was written.
    pub fn absorb(&mut self, message: &[u8]) -> bool {
        let decoded = match self.framing.decode(message) {
            Ok(decoded) => decoded,
            Err(err) => {
                if err.class() == ErrorClass::Recognition {
                    debug!("ignoring foreign bank fragment: {err}");
                } else {
                    warn!("dropping corrupt bank fragment: {err}");
                }
                return false;
            }
        };
        if decoded.command != CM_ID_DT1 {
            debug!("ignoring bank fragment with command {:#04x}", decoded.command);
            return false;
        }
        if !self.image.write(decoded.linear(), &decoded.payload) {
            warn!(
                "dropping bank fragment at {} ({} bytes): outside `{}`",
                decoded.address,
                decoded.payload.len(),
                self.dataset.name()
            );
            return false;
        }
        self.device_id.get_or_insert(decoded.device_id);
        true
    }

    /// Absorbs every message, returning how many were written.
    pub fn absorb_all<M: AsRef<[u8]>>(&mut self, messages: &[M]) -> usize {
        messages
            .iter()
            .filter(|message| self.absorb(message.as_ref()))
            .count()
    }

    /// Device id carried by the first written fragment.
    #[must_use]
    pub const fn device_id(&self) -> Option<u8> {
        self.device_id
    }

    /// The image built so far.
    #[must_use]
    pub const fn image(&self) -> &LinearMemoryImage {
        &self.image
    }

    /// Returns `true` when every block of item `index` has been written.
    #[must_use]
    pub fn is_item_complete(&self, index: usize) -> bool {
        index < self.dataset.item_count()
            && self
                .dataset
                .block_ranges(index)
                .all(|(_, range)| self.image.is_written(range))
    }

    /// Returns `true` when every block of every item has been written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        (0..self.dataset.item_count()).all(|index| self.is_item_complete(index))
    }

    /// Concatenated block bytes of item `index`, or `None` while any of them
    /// is unwritten.
    #[must_use]
    pub fn item_payload(&self, index: usize) -> Option<Vec<u8>> {
        if !self.is_item_complete(index) {
            debug!("item {index} of `{}` is incomplete", self.dataset.name());
            return None;
        }
        let mut payload = Vec::with_capacity(self.dataset.item_length());
        for (_, range) in self.dataset.block_ranges(index) {
            payload.extend_from_slice(self.image.get(range)?);
        }
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::{BulkReassembler, LinearMemoryImage, UNWRITTEN};
    use crate::{
        Address, AddressWidth, AddressedMessage, ChecksumRule, DatasetSpec, DeviceIdentity,
        Framing,
    };

    fn framing() -> Framing {
        Framing {
            identity: DeviceIdentity::roland(&[0x6A], None),
            address_width: AddressWidth::Four,
            checksum: ChecksumRule::Roland,
        }
    }

    fn fragment(framing: &Framing, linear: u32, payload: Vec<u8>) -> Vec<u8> {
        let address = Address::from_linear(linear, AddressWidth::Four).expect("fits");
        framing.encode(&AddressedMessage::data_set(0x10, address, payload))
    }

    #[test]
    fn image_rejects_writes_outside_bounds() {
        let mut image = LinearMemoryImage::new(0x100, 4);
        assert!(image.write(0x101, &[1, 2]));
        assert!(!image.write(0xFF, &[1]));
        assert!(!image.write(0x103, &[1, 2]));
        assert_eq!(image.get(0..4), Some(&[UNWRITTEN, 1, 2, UNWRITTEN][..]));
        assert!(image.is_written(1..3));
        assert!(!image.is_written(0..2));
    }

    #[test]
    fn fragments_spanning_items_are_sliced_per_item() {
        let framing = framing();
        let dataset = DatasetSpec::new("Bank", AddressWidth::Four)
            .base_address(&[0x11, 0x00, 0x00, 0x00])
            .items(2)
            .block(&[0, 0, 0, 0], 4, "A")
            .block(&[0, 0, 0, 4], 2, "B")
            .build()
            .expect("valid");
        let base = dataset.base_address().to_linear();
        let mut reassembler = BulkReassembler::new(&framing, &dataset);

        assert!(reassembler.absorb(&fragment(&framing, base + 8, vec![9, 10, 11, 12])));
        assert!(!reassembler.is_complete());
        assert!(reassembler.absorb(&fragment(&framing, base, vec![1, 2, 3, 4, 5, 6, 7, 8])));

        assert!(reassembler.is_complete());
        assert_eq!(reassembler.item_payload(1), Some(vec![7, 8, 9, 10, 11, 12]));
        assert_eq!(reassembler.device_id(), Some(0x10));
    }

    #[test]
    fn out_of_bounds_and_foreign_fragments_are_dropped() {
        let framing = framing();
        let dataset = DatasetSpec::new("Bank", AddressWidth::Four)
            .base_address(&[0x11, 0x00, 0x00, 0x00])
            .block(&[0, 0, 0, 0], 4, "A")
            .build()
            .expect("valid");
        let base = dataset.base_address().to_linear();
        let mut reassembler = BulkReassembler::new(&framing, &dataset);

        assert!(!reassembler.absorb(&fragment(&framing, base + 2, vec![0; 4])));
        assert!(!reassembler.absorb(&[0xF0, 0x43, 0x10, 0x00, 0xF7]));
        assert_eq!(reassembler.item_payload(0), None);
        assert_eq!(reassembler.device_id(), None);
    }
}
