#![no_main]

use libfuzzer_sys::fuzz_target;
use sysex_core::{
    split_messages, AddressWidth, BankDumpCapable, DatasetSpec, DeviceIdentity, DeviceSpec,
    EditBufferCapable, ItemAssembly, ItemFingerprint, ItemNaming, MemoryKind, ProgramDumpCapable,
    RolandCodec,
};

fn codec() -> Option<RolandCodec> {
    DeviceSpec::new(
        "Fuzz synth",
        DeviceIdentity::roland(&[0x6A], Some([0x6A, 0x00])),
        AddressWidth::Four,
        DatasetSpec::new("Temporary", AddressWidth::Four)
            .base_address(&[0x03, 0x00, 0x00, 0x00])
            .block(&[0, 0, 0, 0], 0x10, "Common")
            .block(&[0, 0, 0x10, 0], 0x08, "Tone")
            .name_field(0, 12),
    )
    .program_dump(
        DatasetSpec::new("User", AddressWidth::Four)
            .base_address(&[0x11, 0x00, 0x00, 0x00])
            .items(4)
            .item_stride(0x4000)
            .block(&[0, 0, 0, 0], 0x10, "Common")
            .block(&[0, 0, 0x10, 0], 0x08, "Tone")
            .name_field(0, 12),
    )
    .build()
    .ok()
}

fuzz_target!(|data: &[u8]| {
    let Some(codec) = codec() else {
        return;
    };

    let _ = codec.parse_item(data);
    let _ = codec.is_edit_buffer_dump(data);
    let _ = codec.name_from_item(data);
    let _ = codec.fingerprint(data);
    if let Ok(converted) = codec.convert_to_program_dump(data, 3) {
        assert!(codec.is_single_program_dump(&converted));
    }

    let messages: Vec<Vec<u8>> = split_messages(data)
        .into_iter()
        .map(<[u8]>::to_vec)
        .collect();
    let mut assembly = ItemAssembly::new(MemoryKind::Program);
    for message in &messages {
        let part = codec.is_part_of_program_dump(message, &assembly);
        assembly.record(message, &part);
    }
    if let Some(item) = assembly.finish() {
        assert!(codec.is_single_program_dump(&item));
    }

    let _ = codec.is_bank_dump_finished(&messages);
    for item in codec.extract_items_from_bank(&messages) {
        assert!(codec.is_single_program_dump(&item));
    }
});
