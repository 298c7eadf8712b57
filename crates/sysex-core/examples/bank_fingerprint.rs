//! Reassembles a synthetic fragmented bank dump and prints one line per
//! recovered item: slot, name and fingerprint.

use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use sysex_core::{
    AddressWidth, AddressedMessage, BankDumpCapable, CodecError, DatasetSpec, DefinitionError,
    DeviceIdentity, DeviceSpec, ItemFingerprint, ItemNaming, MemoryKind, ProgramDumpCapable,
    RolandCodec,
};
use thiserror as _;

const ITEMS: usize = 8;
const FRAGMENT_BYTES: usize = 0x40;
const NAMES: [&str; ITEMS] = [
    "Glass Pad", "Fat Bass", "Bell Tree", "Strings", "Brass", "Organ 1", "Glass Pad", "Sweep",
];

fn codec() -> Result<RolandCodec, DefinitionError> {
    DeviceSpec::new(
        "Demo synth",
        DeviceIdentity::roland(&[0x6A], Some([0x6A, 0x00])),
        AddressWidth::Four,
        DatasetSpec::new("Temporary", AddressWidth::Four)
            .base_address(&[0x03, 0x00, 0x00, 0x00])
            .block(&[0, 0, 0, 0], 0x20, "Common")
            .block(&[0, 0, 0, 0x20], 0x20, "Tone")
            .name_field(0, 12),
    )
    .program_dump(
        DatasetSpec::new("User", AddressWidth::Four)
            .base_address(&[0x11, 0x00, 0x00, 0x00])
            .items(ITEMS)
            .block(&[0, 0, 0, 0], 0x20, "Common")
            .block(&[0, 0, 0, 0x20], 0x20, "Tone")
            .name_field(0, 12),
    )
    .build()
}

fn patch(name: &str, seed: u8) -> Vec<u8> {
    let mut payload: Vec<u8> = name.bytes().chain(std::iter::repeat(b' ')).take(12).collect();
    payload.extend((0..0x34u8).map(|offset| offset.wrapping_mul(seed) & 0x7F));
    payload
}

fn fragments(codec: &RolandCodec) -> Result<Vec<Vec<u8>>, CodecError> {
    let program = codec.dataset(MemoryKind::Program)?;
    // Both "Glass Pad" slots carry the same sound.
    let image: Vec<u8> = NAMES
        .iter()
        .zip(1u8..)
        .flat_map(|(name, seed)| patch(name, if *name == NAMES[0] { 1 } else { seed }))
        .collect();
    let mut messages = Vec::new();
    for (index, chunk) in image.chunks(FRAGMENT_BYTES).enumerate().rev() {
        let address = program
            .base_address()
            .offset_by(u32::try_from(index * FRAGMENT_BYTES).unwrap_or(u32::MAX))?;
        messages.push(codec.framing().encode(&AddressedMessage::data_set(
            0x10,
            address,
            chunk.to_vec(),
        )));
    }
    Ok(messages)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let codec = codec()?;
    let messages = fragments(&codec)?;
    println!(
        "{} fragments, finished: {}",
        messages.len(),
        codec.is_bank_dump_finished(&messages)
    );
    for item in codec.extract_items_from_bank(&messages) {
        let slot = codec.program_index(&item).unwrap_or_default();
        let name = codec.name_from_item(&item).unwrap_or_default();
        let fingerprint = codec.fingerprint(&item).unwrap_or_default();
        println!("{slot:>3}  {name:<12}  {fingerprint}");
    }
    Ok(())
}
