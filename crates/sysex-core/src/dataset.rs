//! Declarative model of a device's addressable parameter memory.
//!
//! A [`Dataset`] is an ordered list of blocks repeated `item_count` times
//! from a base address. It is declared once, through [`DatasetSpec`], when an
//! adaptation is registered and is immutable afterwards.

use crate::address::{
    address_to_linear, digit_capacity, size_to_number, Address, AddressWidth, MAX_SIZE_BYTES,
};
use crate::{CodecError, DefinitionError};

/// Length of one block in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BlockSize(pub u32);

impl From<u32> for BlockSize {
    fn from(size: u32) -> Self {
        Self(size)
    }
}

/// Sizes documented as seven-bit `(hi, lo)` pairs, e.g. `(01h, 01h)` = 129.
impl From<(u8, u8)> for BlockSize {
    fn from((hi, lo): (u8, u8)) -> Self {
        Self(size_to_number(&[hi, lo]))
    }
}

/// Unvalidated block declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BlockSpec {
    /// Address relative to the start of the item.
    pub relative_address: Vec<u8>,
    /// Block length in bytes.
    pub size: BlockSize,
    /// Human-readable name, e.g. "Patch common".
    pub label: String,
}

/// A byte range inside the concatenated payload of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ByteRange {
    /// First byte of the range.
    pub offset: usize,
    /// Number of bytes.
    pub length: usize,
}

impl ByteRange {
    /// Exclusive end of the range.
    #[must_use]
    pub const fn end(self) -> usize {
        self.offset + self.length
    }
}

/// Location of the patch name inside the item payload.
pub type NameField = ByteRange;

/// Unvalidated dataset declaration, the configuration surface of the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DatasetSpec {
    /// Name shown to the user, e.g. "Temporary Patch".
    pub name: String,
    /// Number of consecutive items.
    pub item_count: usize,
    /// Address width of every address in the dataset.
    pub address_width: AddressWidth,
    /// Width of size fields in read requests.
    pub size_width: usize,
    /// Address of the first byte of item 0.
    pub base_address: Vec<u8>,
    /// Blocks of one item in ascending address order.
    pub blocks: Vec<BlockSpec>,
    /// Linear distance between consecutive items. Defaults to the per-item
    /// byte length, or to the item extent for single-item datasets.
    pub item_stride: Option<u32>,
    /// Location of the item name.
    pub name_field: Option<NameField>,
    /// Ranges ignored by fingerprints in addition to the name.
    pub blank_out_zones: Vec<ByteRange>,
}

impl DatasetSpec {
    /// Starts a single-item dataset at address zero with size fields as wide
    /// as addresses.
    #[must_use]
    pub fn new(name: impl Into<String>, address_width: AddressWidth) -> Self {
        Self {
            name: name.into(),
            item_count: 1,
            address_width,
            size_width: address_width.bytes(),
            base_address: vec![0; address_width.bytes()],
            blocks: Vec::new(),
            item_stride: None,
            name_field: None,
            blank_out_zones: Vec::new(),
        }
    }

    /// Sets the base address.
    #[must_use]
    pub fn base_address(mut self, address: &[u8]) -> Self {
        self.base_address = address.to_vec();
        self
    }

    /// Sets the repeat count.
    #[must_use]
    pub const fn items(mut self, count: usize) -> Self {
        self.item_count = count;
        self
    }

    /// Sets the width of request size fields.
    #[must_use]
    pub const fn size_width(mut self, width: usize) -> Self {
        self.size_width = width;
        self
    }

    /// Appends a block.
    #[must_use]
    pub fn block(
        mut self,
        relative_address: &[u8],
        size: impl Into<BlockSize>,
        label: impl Into<String>,
    ) -> Self {
        self.blocks.push(BlockSpec {
            relative_address: relative_address.to_vec(),
            size: size.into(),
            label: label.into(),
        });
        self
    }

    /// Overrides the distance between items.
    #[must_use]
    pub const fn item_stride(mut self, stride: u32) -> Self {
        self.item_stride = Some(stride);
        self
    }

    /// Declares where the item name lives.
    #[must_use]
    pub const fn name_field(mut self, offset: usize, length: usize) -> Self {
        self.name_field = Some(ByteRange { offset, length });
        self
    }

    /// Adds a range that fingerprints ignore.
    #[must_use]
    pub fn blank_out(mut self, offset: usize, length: usize) -> Self {
        self.blank_out_zones.push(ByteRange { offset, length });
        self
    }

    /// Validates the declaration.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] describing the first violated invariant.
    pub fn build(self) -> Result<Dataset, DefinitionError> {
        Dataset::try_from(self)
    }
}

/// Validated block of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockDescriptor {
    relative_address: Address,
    relative_linear: u32,
    size: u32,
    payload_offset: usize,
    label: String,
}

impl BlockDescriptor {
    /// Address relative to the item start.
    #[must_use]
    pub const fn relative_address(&self) -> Address {
        self.relative_address
    }

    /// Block length in bytes.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Block length as a `usize`.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size as usize
    }

    /// Blocks are never empty; kept for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Offset of this block's bytes in the concatenated item payload.
    #[must_use]
    pub const fn payload_offset(&self) -> usize {
        self.payload_offset
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Which block of which item an address starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockLocation {
    /// Item index.
    pub item: usize,
    /// Block index inside the item.
    pub block: usize,
}

/// Validated, immutable dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    name: String,
    item_count: usize,
    address_width: AddressWidth,
    size_width: usize,
    base_address: Address,
    blocks: Vec<BlockDescriptor>,
    item_length: usize,
    item_stride: u32,
    item_extent: u32,
    name_field: Option<NameField>,
    blank_out_zones: Vec<ByteRange>,
}

impl TryFrom<DatasetSpec> for Dataset {
    type Error = DefinitionError;

    fn try_from(spec: DatasetSpec) -> Result<Self, Self::Error> {
        if spec.item_count == 0 {
            return Err(DefinitionError::NoItems(spec.name));
        }
        if spec.blocks.is_empty() {
            return Err(DefinitionError::NoBlocks(spec.name));
        }
        if spec.size_width == 0 || spec.size_width > MAX_SIZE_BYTES {
            return Err(DefinitionError::UnsupportedSizeWidth(spec.size_width));
        }
        let width = spec.address_width;
        let base_address = checked_address(&spec.base_address, width)?;
        let size_capacity = digit_capacity(spec.size_width);

        let mut blocks = Vec::with_capacity(spec.blocks.len());
        let mut previous_end = 0u32;
        let mut payload_offset = 0usize;
        for block in spec.blocks {
            let relative_address = checked_address(&block.relative_address, width)?;
            let size = block.size.0;
            if size == 0 {
                return Err(DefinitionError::EmptyBlock(block.label));
            }
            if size >= size_capacity {
                return Err(DefinitionError::SizeNotRepresentable {
                    size,
                    digits: spec.size_width,
                });
            }
            let relative_linear = address_to_linear(relative_address.as_bytes());
            if !blocks.is_empty() && relative_linear < previous_end {
                return Err(DefinitionError::OverlappingBlocks(block.label));
            }
            previous_end = relative_linear + size;
            blocks.push(BlockDescriptor {
                relative_address,
                relative_linear,
                size,
                payload_offset,
                label: block.label,
            });
            payload_offset += size as usize;
        }

        let item_length = payload_offset;
        let item_extent = previous_end;
        // A lone item may leave gaps between blocks without declaring a stride.
        let item_stride = match spec.item_stride {
            Some(stride) => stride,
            None if spec.item_count == 1 => item_extent,
            None => u32::try_from(item_length).unwrap_or(u32::MAX),
        };
        if item_stride < item_extent {
            return Err(DefinitionError::StrideTooSmall {
                stride: item_stride,
                extent: item_extent,
            });
        }

        let span = u64::from(item_stride) * (spec.item_count as u64 - 1) + u64::from(item_extent);
        if u64::from(base_address.to_linear()) + span > u64::from(width.capacity()) {
            return Err(DefinitionError::AddressRangeOverflow(spec.name));
        }

        for range in spec.name_field.iter().chain(spec.blank_out_zones.iter()) {
            if range.end() > item_length {
                return Err(DefinitionError::RangeOutsideItem {
                    offset: range.offset,
                    length: range.length,
                    item_length,
                });
            }
        }

        Ok(Self {
            name: spec.name,
            item_count: spec.item_count,
            address_width: width,
            size_width: spec.size_width,
            base_address,
            blocks,
            item_length,
            item_stride,
            item_extent,
            name_field: spec.name_field,
            blank_out_zones: spec.blank_out_zones,
        })
    }
}

fn checked_address(bytes: &[u8], width: AddressWidth) -> Result<Address, DefinitionError> {
    match Address::from_slice(bytes) {
        Some(address) if address.width() == width => Ok(address),
        _ => Err(DefinitionError::InvalidAddress(bytes.to_vec())),
    }
}

impl Dataset {
    /// Dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of items.
    #[must_use]
    pub const fn item_count(&self) -> usize {
        self.item_count
    }

    /// Address width.
    #[must_use]
    pub const fn address_width(&self) -> AddressWidth {
        self.address_width
    }

    /// Width of request size fields.
    #[must_use]
    pub const fn size_width(&self) -> usize {
        self.size_width
    }

    /// Address of item 0.
    #[must_use]
    pub const fn base_address(&self) -> Address {
        self.base_address
    }

    /// Blocks of one item in address order.
    #[must_use]
    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.blocks
    }

    /// Payload bytes per item, `Σ block.size`.
    #[must_use]
    pub const fn item_length(&self) -> usize {
        self.item_length
    }

    /// Linear distance between consecutive items.
    #[must_use]
    pub const fn item_stride(&self) -> u32 {
        self.item_stride
    }

    /// Linear distance from an item start to the end of its last block.
    #[must_use]
    pub const fn item_extent(&self) -> u32 {
        self.item_extent
    }

    /// Number of linear offsets from the base address to the end of the
    /// last item.
    #[must_use]
    pub fn span(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let items = self.item_count as u32;
        self.item_stride * (items - 1) + self.item_extent
    }

    /// Location of the item name, if the device stores one.
    #[must_use]
    pub const fn name_field(&self) -> Option<NameField> {
        self.name_field
    }

    /// Additional ranges fingerprints ignore.
    #[must_use]
    pub fn blank_out_zones(&self) -> &[ByteRange] {
        &self.blank_out_zones
    }

    /// Name field followed by the blank-out zones.
    pub fn fingerprint_exclusions(&self) -> impl Iterator<Item = &ByteRange> + '_ {
        self.name_field.iter().chain(&self.blank_out_zones)
    }

    /// Linear offset of item `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ItemIndexOutOfRange`] beyond the repeat count.
    pub fn item_offset(&self, index: usize) -> Result<u32, CodecError> {
        if index >= self.item_count {
            return Err(CodecError::ItemIndexOutOfRange {
                index,
                count: self.item_count,
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        let index = index as u32;
        Ok(self.base_address.to_linear() + index * self.item_stride)
    }

    /// Absolute address of block `block` of item `item`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ItemIndexOutOfRange`] for an unknown item or block.
    pub fn block_address(&self, item: usize, block: usize) -> Result<Address, CodecError> {
        let descriptor = self
            .blocks
            .get(block)
            .ok_or(CodecError::ItemIndexOutOfRange {
                index: block,
                count: self.blocks.len(),
            })?;
        let linear = self.item_offset(item)? + descriptor.relative_linear;
        Address::from_linear(linear, self.address_width)
    }

    /// Returns `true` when `address` lies between the base address and the
    /// end of the last item.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.relative_offset(address).is_some()
    }

    /// Offset of `address` from the base address, if inside the span.
    #[must_use]
    pub fn relative_offset(&self, address: &Address) -> Option<u32> {
        if address.width() != self.address_width {
            return None;
        }
        let relative = address
            .to_linear()
            .checked_sub(self.base_address.to_linear())?;
        (relative < self.span()).then_some(relative)
    }

    /// Finds the block an address starts.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::AddressOutsideDataset`] when the address is not
    /// in the span and [`CodecError::UnknownBlockAddress`] when it is inside
    /// but does not start a block.
    pub fn locate(&self, address: &Address) -> Result<BlockLocation, CodecError> {
        let linear = address.to_linear();
        let relative = self
            .relative_offset(address)
            .ok_or(CodecError::AddressOutsideDataset { linear })?;
        let item = (relative / self.item_stride) as usize;
        let within = relative % self.item_stride;
        self.blocks
            .iter()
            .position(|block| block.relative_linear == within)
            .map(|block| BlockLocation { item, block })
            .ok_or(CodecError::UnknownBlockAddress { linear })
    }

    /// Splits a concatenated item payload into per-block slices.
    ///
    /// Returns `None` unless `payload` is exactly one item long.
    #[must_use]
    pub fn split_payload<'p>(&self, payload: &'p [u8]) -> Option<Vec<&'p [u8]>> {
        if payload.len() != self.item_length {
            return None;
        }
        Some(
            self.blocks
                .iter()
                .map(|block| &payload[block.payload_offset..block.payload_offset + block.len()])
                .collect(),
        )
    }

    /// Linear offsets, relative to the base address, covered by each block of
    /// item `index`.
    pub(crate) fn block_ranges(
        &self,
        index: usize,
    ) -> impl Iterator<Item = (&BlockDescriptor, std::ops::Range<usize>)> + '_ {
        let item_start = index * self.item_stride as usize;
        self.blocks.iter().map(move |block| {
            let start = item_start + block.relative_linear as usize;
            (block, start..start + block.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockLocation, BlockSize, DatasetSpec};
    use crate::{Address, AddressWidth, CodecError, DefinitionError};
    use rstest::rstest;

    fn patch_spec() -> DatasetSpec {
        DatasetSpec::new("Patch", AddressWidth::Four)
            .base_address(&[0x11, 0x00, 0x00, 0x00])
            .items(128)
            .block(&[0x00, 0x00, 0x00, 0x00], 0x48, "Patch common")
            .block(&[0x00, 0x00, 0x10, 0x00], (0x01, 0x01), "Patch tone 1")
            .item_stride(0x4000)
            .name_field(0, 12)
    }

    #[test]
    fn pair_sizes_use_seven_bit_digits() {
        assert_eq!(BlockSize::from((0x01, 0x01)), BlockSize(129));
        assert_eq!(BlockSize::from(0x48), BlockSize(72));
    }

    #[test]
    fn derived_lengths_follow_blocks() {
        let dataset = patch_spec().build().expect("valid");
        assert_eq!(dataset.item_length(), 0x48 + 129);
        assert_eq!(dataset.item_extent(), 0x800 + 129);
        assert_eq!(dataset.blocks()[1].payload_offset(), 0x48);
        assert_eq!(dataset.span(), 127 * 0x4000 + 0x800 + 129);
    }

    #[test]
    fn default_stride_is_item_length() {
        let dataset = DatasetSpec::new("Packed", AddressWidth::Three)
            .items(4)
            .block(&[0, 0, 0], 0x0E, "Common")
            .block(&[0, 0, 0x0E], 0x3A, "Partial")
            .build()
            .expect("valid");
        assert_eq!(dataset.item_stride(), 0x48);
        assert_eq!(
            dataset.block_address(2, 1).expect("in range").as_bytes(),
            &[0x00, 0x01, 0x1E]
        );
    }

    #[test]
    fn locate_finds_item_and_block() {
        let dataset = patch_spec().build().expect("valid");
        let address = Address::from_slice(&[0x11, 0x05, 0x10, 0x00]).expect("valid");
        assert_eq!(
            dataset.locate(&address),
            Ok(BlockLocation { item: 5, block: 1 })
        );
    }

    #[rstest]
    #[case(&[0x10, 0x7F, 0x7F, 0x7F], true)]
    #[case(&[0x11, 0x05, 0x00, 0x01], false)]
    fn locate_distinguishes_foreign_and_misaligned(#[case] bytes: &[u8], #[case] foreign: bool) {
        let dataset = patch_spec().build().expect("valid");
        let address = Address::from_slice(bytes).expect("valid");
        let linear = address.to_linear();
        let expected = if foreign {
            CodecError::AddressOutsideDataset { linear }
        } else {
            CodecError::UnknownBlockAddress { linear }
        };
        assert_eq!(dataset.locate(&address), Err(expected));
    }

    #[test]
    fn item_index_beyond_count_is_rejected() {
        let dataset = patch_spec().build().expect("valid");
        assert_eq!(
            dataset.item_offset(128),
            Err(CodecError::ItemIndexOutOfRange {
                index: 128,
                count: 128
            })
        );
    }

    #[test]
    fn overlapping_blocks_are_rejected() {
        let err = DatasetSpec::new("Bad", AddressWidth::Four)
            .block(&[0, 0, 0, 0], 0x48, "Common")
            .block(&[0, 0, 0, 0x40], 0x10, "Tone")
            .build()
            .expect_err("overlap");
        assert_eq!(err, DefinitionError::OverlappingBlocks("Tone".into()));
    }

    #[test]
    fn gaps_require_explicit_stride() {
        let err = DatasetSpec::new("Gappy", AddressWidth::Four)
            .items(2)
            .block(&[0, 0, 0, 0], 0x10, "A")
            .block(&[0, 0, 1, 0], 0x10, "B")
            .build()
            .expect_err("stride");
        assert_eq!(
            err,
            DefinitionError::StrideTooSmall {
                stride: 0x20,
                extent: 0x90
            }
        );
    }

    #[rstest]
    #[case(DatasetSpec::new("x", AddressWidth::Four).items(0).block(&[0, 0, 0, 0], 1, "a"))]
    #[case(DatasetSpec::new("x", AddressWidth::Four))]
    #[case(DatasetSpec::new("x", AddressWidth::Four).block(&[0, 0, 0], 1, "a"))]
    #[case(DatasetSpec::new("x", AddressWidth::Four).block(&[0, 0, 0x80, 0], 1, "a"))]
    #[case(DatasetSpec::new("x", AddressWidth::Four).block(&[0, 0, 0, 0], 0, "a"))]
    #[case(DatasetSpec::new("x", AddressWidth::Four).size_width(5).block(&[0, 0, 0, 0], 1, "a"))]
    #[case(DatasetSpec::new("x", AddressWidth::Three).size_width(1).block(&[0, 0, 0], 0x80, "a"))]
    #[case(DatasetSpec::new("x", AddressWidth::Four).block(&[0, 0, 0, 0], 4, "a").name_field(2, 3))]
    #[case(DatasetSpec::new("x", AddressWidth::Three).base_address(&[0x7F, 0x7F, 0x7F]).block(&[0, 0, 0], 2, "a"))]
    fn invalid_declarations_are_rejected(#[case] spec: DatasetSpec) {
        assert!(spec.build().is_err());
    }

    #[test]
    fn split_payload_requires_exact_length() {
        let dataset = patch_spec().build().expect("valid");
        let payload = vec![0x20; dataset.item_length()];
        let parts = dataset.split_payload(&payload).expect("exact");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 0x48);
        assert_eq!(parts[1].len(), 129);
        assert!(dataset.split_payload(&payload[1..]).is_none());
    }
}
