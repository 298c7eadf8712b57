//! Roland MT-32 timbre memory.
//!
//! The MT-32 predates the universal identity request. It is found by
//! reading its system area, which it only answers when the request carries
//! its own device id.

use sysex_core::{
    AddressWidth, DatasetSpec, DefinitionError, DetectMethod, DeviceIdentity, DeviceSpec,
    RolandCodec,
};

/// Name shown to the user.
pub const MODEL_NAME: &str = "Roland MT-32";
/// Model id byte following the device id.
pub const MODEL_ID: [u8; 1] = [0x16];
/// System area read during detection.
pub const SYSTEM_AREA: [u8; 3] = [0x10, 0x00, 0x00];
/// Size of the system area.
pub const SYSTEM_AREA_SIZE: u32 = 0x17;
/// Timbre temporary area of part 1.
pub const TIMBRE_TEMPORARY: [u8; 3] = [0x04, 0x00, 0x00];
/// First timbre memory slot.
pub const TIMBRE_MEMORY: [u8; 3] = [0x08, 0x00, 0x00];
/// Number of timbre memory slots.
pub const TIMBRE_COUNT: usize = 64;
/// Timbres are 256 address units apart.
pub const TIMBRE_STRIDE: u32 = 0x100;

fn timbre(name: &str) -> DatasetSpec {
    DatasetSpec::new(name, AddressWidth::Three)
        .size_width(3)
        .block(&[0x00, 0x00, 0x00], 0x0E, "Common")
        .block(&[0x00, 0x00, 0x0E], 0x3A, "Partial 1")
        .block(&[0x00, 0x00, 0x48], 0x3A, "Partial 2")
        .block(&[0x00, 0x01, 0x02], 0x3A, "Partial 3")
        .block(&[0x00, 0x01, 0x3C], 0x3A, "Partial 4")
        .name_field(0, 10)
}

/// Device table.
#[must_use]
pub fn spec() -> DeviceSpec {
    DeviceSpec::new(
        MODEL_NAME,
        DeviceIdentity::roland(&MODEL_ID, None),
        AddressWidth::Three,
        timbre("Timbre Temporary").base_address(&TIMBRE_TEMPORARY),
    )
    .program_dump(
        timbre("Timbre Memory")
            .base_address(&TIMBRE_MEMORY)
            .items(TIMBRE_COUNT)
            .item_stride(TIMBRE_STRIDE),
    )
    .detect(DetectMethod::ReadBlock {
        address: SYSTEM_AREA.to_vec(),
        size: SYSTEM_AREA_SIZE,
    })
}

/// Validated codec.
///
/// # Errors
///
/// Only fails if the table above is inconsistent.
pub fn codec() -> Result<RolandCodec, DefinitionError> {
    spec().build()
}

#[cfg(test)]
mod tests {
    use sysex_core::{Channel, DeviceDetect, ProgramDumpCapable};

    #[test]
    fn timbre_is_contiguous() {
        let codec = super::codec().expect("valid table");
        let program = codec.program().expect("timbre memory");
        assert_eq!(program.item_length(), 0xF6);
        assert_eq!(program.item_extent(), 0xF6);
        assert_eq!(program.span(), 63 * 0x100 + 0xF6);
    }

    #[test]
    fn detection_reads_the_system_area() {
        let codec = super::codec().expect("valid table");
        assert!(codec.needs_channel_specific_detection());
        let channel = Channel::new(0).expect("valid");
        assert_eq!(
            codec.build_device_detect(channel),
            vec![0xF0, 0x41, 0x10, 0x16, 0x11, 0x10, 0x00, 0x00, 0x00, 0x00, 0x17, 0x59, 0xF7]
        );
    }

    #[test]
    fn timbre_requests_use_three_byte_sizes() {
        let codec = super::codec().expect("valid table");
        let session = codec.session(Channel::new(0).expect("valid"));
        let requests = codec
            .build_program_dump_request(&session, 2)
            .expect("in range");
        assert_eq!(requests.len(), 5);
        assert_eq!(&requests[0][5..8], &[0x08, 0x04, 0x00]);
        assert_eq!(&requests[0][8..11], &[0x00, 0x00, 0x0E]);
    }
}
