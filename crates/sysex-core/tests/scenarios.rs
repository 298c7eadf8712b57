//! End-to-end request, recognition and reassembly scenarios.

#![allow(clippy::pedantic, clippy::nursery, clippy::cast_possible_truncation)]

use log as _;
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use sysex_core::{
    split_messages, AddressWidth, AddressedMessage, Adaptation, BankDumpCapable, Channel,
    ChainVariant, CodecError, CompatChain, DatasetSpec, DeviceIdentity, DeviceSpec,
    EditBufferCapable, ErrorClass, ItemAssembly, MemoryKind, ProgramDumpCapable, RolandCodec,
};
use thiserror as _;

fn two_block_edit_buffer() -> DatasetSpec {
    DatasetSpec::new("Temporary", AddressWidth::Four)
        .block(&[0x00, 0x00, 0x00, 0x00], 0x48, "Common")
        .block(&[0x00, 0x00, 0x10, 0x00], (0x01, 0x01), "Tone")
}

fn bank_codec() -> RolandCodec {
    DeviceSpec::new(
        "Bank synth",
        DeviceIdentity::roland(&[0x6A], Some([0x6A, 0x00])),
        AddressWidth::Four,
        DatasetSpec::new("Temporary", AddressWidth::Four)
            .base_address(&[0x03, 0x00, 0x00, 0x00])
            .block(&[0, 0, 0, 0], 0x30, "Common")
            .block(&[0, 0, 0, 0x30], 0x50, "Tone"),
    )
    .program_dump(
        DatasetSpec::new("User", AddressWidth::Four)
            .base_address(&[0x11, 0x00, 0x00, 0x00])
            .items(32)
            .item_stride(0x80)
            .block(&[0, 0, 0, 0], 0x30, "Common")
            .block(&[0, 0, 0, 0x30], 0x50, "Tone")
            .name_field(0, 12),
    )
    .build()
    .expect("valid device")
}

fn patch(seed: u8) -> Vec<u8> {
    (0..0x80u32)
        .map(|offset| ((offset + u32::from(seed) * 3) % 0x80) as u8)
        .collect()
}

#[test]
fn two_block_edit_buffer_yields_two_requests() {
    let codec = DeviceSpec::new(
        "JV",
        DeviceIdentity::roland(&[0x6A], Some([0x6A, 0x00])),
        AddressWidth::Four,
        two_block_edit_buffer(),
    )
    .build()
    .expect("valid device");
    let session = codec.session(Channel::new(0).expect("valid"));

    let requests = codec
        .build_edit_buffer_request(&session)
        .expect("encodes");
    assert_eq!(requests.len(), 2);

    let decoded: Vec<AddressedMessage> = requests
        .iter()
        .map(|request| codec.framing().decode(request).expect("valid request"))
        .collect();
    assert_eq!(decoded[0].address.as_bytes(), &[0x00, 0x00, 0x00, 0x00]);
    assert_eq!(decoded[1].address.as_bytes(), &[0x00, 0x00, 0x10, 0x00]);
    assert_eq!(decoded[0].payload, vec![0x00, 0x00, 0x00, 0x48]);
    assert_eq!(decoded[1].payload, vec![0x00, 0x00, 0x01, 0x01]);
    assert!(decoded.iter().all(|message| message.device_id == 0x10));
}

#[test]
fn chain_prefers_primary_when_both_accept() {
    let build = |name: &str| {
        DeviceSpec::new(
            name,
            DeviceIdentity::roland(&[0x6A], Some([0x6A, 0x00])),
            AddressWidth::Four,
            two_block_edit_buffer(),
        )
        .build()
        .expect("valid device")
    };
    let chain = CompatChain::new(build("Primary"), vec![build("Legacy")]);
    let payload = vec![0x20; 0x48 + 0x81];
    let item = chain.legacy()[0]
        .emit_item(MemoryKind::EditBuffer, 0, 0x10, &payload)
        .expect("fits");

    assert!(chain.primary().is_edit_buffer_dump(&item));
    assert!(chain.legacy()[0].is_edit_buffer_dump(&item));
    let found = chain.parse(&item).expect("recognized");
    assert_eq!(found.variant, ChainVariant::Primary);
    assert_eq!(found.item.payload, payload);
}

#[test]
fn sixty_five_fragment_bank_matches_direct_dump() {
    let codec = bank_codec();
    let program = codec.program().expect("program memory");
    let image: Vec<u8> = (0..32).flat_map(patch).collect();
    assert_eq!(image.len(), 4096);

    let mut lengths = vec![0x20];
    lengths.extend(std::iter::repeat(0x40).take(63));
    lengths.push(0x20);
    let mut fragments = Vec::new();
    let mut offset = 0usize;
    for length in lengths {
        let address = program
            .base_address()
            .offset_by(offset as u32)
            .expect("fits");
        fragments.push(codec.framing().encode(&AddressedMessage::data_set(
            0x10,
            address,
            image[offset..offset + length].to_vec(),
        )));
        offset += length;
    }
    assert_eq!(fragments.len(), 65);

    let shuffled: Vec<Vec<u8>> = (0..65).map(|i| fragments[(i * 7) % 65].clone()).collect();
    assert!(shuffled.iter().all(|fragment| codec.is_part_of_bank_dump(fragment)));
    assert!(codec.is_bank_dump_finished(&shuffled));
    assert!(!codec.is_bank_dump_finished(&shuffled[1..]));

    let items = codec.extract_items_from_bank(&shuffled);
    assert_eq!(items.len(), 32);
    let direct = codec
        .emit_item(MemoryKind::Program, 1, 0x10, &patch(1))
        .expect("fits");
    assert_eq!(items[1], direct);
    assert!(codec.is_single_program_dump(&items[1]));
    assert_eq!(split_messages(&items[1]).len(), 2);
}

#[test]
fn block_by_block_assembly_survives_unrelated_traffic() {
    let codec = bank_codec();
    let item = codec
        .emit_item(MemoryKind::Program, 9, 0x10, &patch(9))
        .expect("fits");
    let other = codec
        .emit_item(MemoryKind::Program, 4, 0x10, &patch(4))
        .expect("fits");
    let blocks = split_messages(&item);
    let foreign_blocks = split_messages(&other);

    let mut assembly = ItemAssembly::new(MemoryKind::Program);
    let stream = [
        &[0xF0, 0x43, 0x10, 0x00, 0xF7][..],
        blocks[0],
        foreign_blocks[1],
        blocks[0],
        blocks[1],
    ];
    let mut accepted = 0;
    for message in stream {
        let part = codec.is_part_of_program_dump(message, &assembly);
        if part.is_accepted() {
            accepted += 1;
        }
        assembly.record(message, &part);
    }
    assert_eq!(accepted, 2);
    assert_eq!(assembly.finish(), Some(item));
    assert_eq!(assembly.item(), Some(9));
}

#[rstest]
#[case::not_sysex(vec![0x90, 0x40, 0x7F], ErrorClass::Recognition)]
#[case::other_manufacturer(vec![0xF0, 0x43, 0x10, 0x6A, 0x12, 0x00, 0xF7], ErrorClass::Recognition)]
#[case::request_not_data(vec![0xF0, 0x41, 0x10, 0x6A, 0x11, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x4D, 0xF7], ErrorClass::Recognition)]
#[case::truncated(vec![0xF0, 0x41, 0x10, 0x6A, 0x12, 0x03, 0x00, 0xF7], ErrorClass::Structural)]
#[case::bad_checksum(vec![0xF0, 0x41, 0x10, 0x6A, 0x12, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0xF7], ErrorClass::Structural)]
fn rejected_messages_are_classified(#[case] message: Vec<u8>, #[case] class: ErrorClass) {
    let codec = bank_codec();
    let err = codec
        .parse_item_as(MemoryKind::EditBuffer, &message)
        .expect_err("rejected");
    assert_eq!(err.class(), class);
    assert!(err.is_recoverable());
    assert!(!codec.is_edit_buffer_dump(&message));
}

#[test]
fn short_block_is_a_payload_size_violation() {
    let codec = bank_codec();
    let address = codec.edit_buffer().base_address();
    let short = codec
        .framing()
        .encode(&AddressedMessage::data_set(0x10, address, vec![0; 0x2F]));
    assert_eq!(
        codec.parse_item_as(MemoryKind::EditBuffer, &short),
        Err(CodecError::PayloadSizeMismatch {
            expected: 0x30,
            found: 0x2F
        })
    );
}

#[test]
fn capability_queries_reflect_program_memory() {
    let with_program = bank_codec();
    assert!(with_program.as_program_dump().is_some());
    assert!(with_program.as_bank_dump().is_some());

    let edit_only = DeviceSpec::new(
        "Edit only",
        DeviceIdentity::roland(&[0x6A], Some([0x6A, 0x00])),
        AddressWidth::Four,
        two_block_edit_buffer(),
    )
    .build()
    .expect("valid device");
    assert!(edit_only.as_edit_buffer().is_some());
    assert!(edit_only.as_program_dump().is_none());
    assert!(edit_only.as_bank_dump().is_none());
    assert_eq!(edit_only.name(), "Edit only");
}
