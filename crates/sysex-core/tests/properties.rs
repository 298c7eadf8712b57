//! Property checks for address arithmetic, checksums, reassembly and
//! item conversion.

#![allow(clippy::pedantic, clippy::nursery, clippy::cast_possible_truncation)]

use log as _;
use proptest::prelude::*;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use sysex_core::{
    address_to_linear, checksum_is_valid, linear_to_address, number_to_size, roland_checksum,
    size_to_number, Address, AddressWidth, AddressedMessage, BankDumpCapable, DatasetSpec,
    DeviceIdentity, DeviceSpec, EditBufferCapable, ItemFingerprint, MemoryKind, ProgramDumpCapable,
    RolandCodec,
};
use thiserror as _;

const ITEM_LENGTH: usize = 0x30 + 0x50;

fn codec() -> RolandCodec {
    DeviceSpec::new(
        "Property synth",
        DeviceIdentity::roland(&[0x6A], Some([0x6A, 0x00])),
        AddressWidth::Four,
        DatasetSpec::new("Temporary", AddressWidth::Four)
            .base_address(&[0x03, 0x00, 0x00, 0x00])
            .block(&[0, 0, 0, 0], 0x30, "Common")
            .block(&[0, 0, 0, 0x30], 0x50, "Tone")
            .name_field(0, 12),
    )
    .program_dump(
        DatasetSpec::new("User", AddressWidth::Four)
            .base_address(&[0x11, 0x00, 0x00, 0x00])
            .items(32)
            .block(&[0, 0, 0, 0], 0x30, "Common")
            .block(&[0, 0, 0, 0x30], 0x50, "Tone")
            .name_field(0, 12),
    )
    .build()
    .expect("valid device")
}

fn width_strategy() -> impl Strategy<Value = AddressWidth> {
    prop_oneof![Just(AddressWidth::Three), Just(AddressWidth::Four)]
}

fn seven_bit_payload(len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..0x80, len)
}

/// Splits the program span into fragments of at most `0x40` bytes.
fn bank_fragments(codec: &RolandCodec, items: &[Vec<u8>], device_id: u8) -> Vec<Vec<u8>> {
    let program = codec.program().expect("program memory");
    let image: Vec<u8> = items.concat();
    let base = program.base_address();
    image
        .chunks(0x40)
        .enumerate()
        .map(|(index, chunk)| {
            let address = base.offset_by((index * 0x40) as u32).expect("fits");
            codec
                .framing()
                .encode(&AddressedMessage::data_set(device_id, address, chunk.to_vec()))
        })
        .collect()
}

proptest! {
    #[test]
    fn property_address_round_trips_for_every_offset(
        width in width_strategy(),
        seed in any::<u32>(),
    ) {
        let offset = seed % width.capacity();
        let address = linear_to_address(offset, width).expect("representable");
        prop_assert_eq!(address.as_bytes().len(), width.bytes());
        prop_assert!(address.as_bytes().iter().all(|byte| *byte < 0x80));
        prop_assert_eq!(address_to_linear(address.as_bytes()), offset);
    }

    #[test]
    fn property_address_bytes_round_trip(bytes in prop::collection::vec(0u8..0x80, 3..=4)) {
        let width = AddressWidth::from_bytes(bytes.len()).expect("three or four");
        let linear = address_to_linear(&bytes);
        let address = linear_to_address(linear, width).expect("representable");
        prop_assert_eq!(address.as_bytes(), bytes.as_slice());
    }

    #[test]
    fn property_size_round_trips(digits in 1usize..=4, seed in any::<u32>()) {
        let number = seed % sysex_core::digit_capacity(digits);
        let encoded = number_to_size(number, digits).expect("representable");
        prop_assert_eq!(encoded.len(), digits);
        prop_assert_eq!(size_to_number(&encoded), number);
    }

    #[test]
    fn property_checksum_cancels_sum(data in prop::collection::vec(0u8..0x80, 0..256)) {
        let checksum = roland_checksum(&data);
        prop_assert!(checksum < 0x80);
        let sum: u32 = data.iter().map(|byte| u32::from(*byte)).sum::<u32>() + u32::from(checksum);
        prop_assert_eq!(sum % 128, 0);

        let mut with_trailer = data.clone();
        with_trailer.push(checksum);
        prop_assert!(checksum_is_valid(&with_trailer));
    }

    #[test]
    fn property_item_addressing_follows_item_length(
        sizes in prop::collection::vec(1u32..0x60, 1..5),
        items in 1usize..64,
    ) {
        let mut spec = DatasetSpec::new("Packed", AddressWidth::Four)
            .base_address(&[0x10, 0x00, 0x00, 0x00])
            .items(items);
        let mut relative = 0u32;
        for (index, size) in sizes.iter().enumerate() {
            let address = linear_to_address(relative, AddressWidth::Four).expect("fits");
            spec = spec.block(address.as_bytes(), *size, format!("Block {index}"));
            relative += size;
        }
        let dataset = spec.build().expect("valid");
        let item_length: u32 = sizes.iter().sum();
        prop_assert_eq!(dataset.item_length() as u32, item_length);

        let base = dataset.base_address().to_linear();
        for item in 0..items {
            let first = dataset.block_address(item, 0).expect("in range");
            prop_assert_eq!(first.to_linear(), base + item as u32 * item_length);
        }
    }

    #[test]
    fn property_reassembly_is_idempotent(
        payloads in prop::collection::vec(seven_bit_payload(ITEM_LENGTH), 32),
        order in Just((0usize..64).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let codec = codec();
        let fragments = bank_fragments(&codec, &payloads, 0x10);
        let shuffled: Vec<Vec<u8>> = order
            .iter()
            .filter_map(|index| fragments.get(*index).cloned())
            .collect();

        let first = codec.extract_items_from_bank(&shuffled);
        let doubled: Vec<Vec<u8>> = shuffled.iter().chain(fragments.iter()).cloned().collect();
        let second = codec.extract_items_from_bank(&doubled);
        prop_assert_eq!(first.len(), 32);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &codec.extract_items_from_bank(&fragments));
    }

    #[test]
    fn property_conversion_preserves_payload_and_fingerprint(
        payload in seven_bit_payload(ITEM_LENGTH),
        target in 0usize..32,
        device_id in 0x10u8..0x20,
    ) {
        let codec = codec();
        let edit = codec
            .emit_item(MemoryKind::EditBuffer, 0, device_id, &payload)
            .expect("fits");
        let program = codec.convert_to_program_dump(&edit, target).expect("converts");

        prop_assert_eq!(program.len(), edit.len());
        let changed: Vec<usize> = edit
            .iter()
            .zip(&program)
            .enumerate()
            .filter(|(_, (before, after))| before != after)
            .map(|(position, _)| position)
            .collect();
        let second_message = 5 + 4 + 0x30 + 2;
        let address_or_checksum = |position: usize| {
            (5..9).contains(&position)
                || position == 9 + 0x30
                || (second_message + 5..second_message + 9).contains(&position)
                || position == second_message + 9 + 0x50
        };
        prop_assert!(changed.iter().all(|position| address_or_checksum(*position)));

        let parsed = codec.parse_item(&program).expect("valid");
        prop_assert_eq!(parsed.kind, MemoryKind::Program);
        prop_assert_eq!(parsed.index, target);
        prop_assert_eq!(&parsed.payload, &payload);
        prop_assert_eq!(codec.fingerprint(&edit), codec.fingerprint(&program));
        prop_assert_eq!(codec.convert_to_edit_buffer(&program).expect("converts"), edit);
    }
}

#[test]
fn address_display_matches_documentation_style() {
    let address = Address::from_slice(&[0x11, 0x00, 0x10, 0x00]).expect("valid");
    assert_eq!(address.to_string(), "11 00 10 00h");
}
