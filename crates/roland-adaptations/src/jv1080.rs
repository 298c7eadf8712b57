//! Roland JV-1080 patch memory.

use sysex_core::{
    AddressWidth, DatasetSpec, DefinitionError, DeviceIdentity, DeviceSpec, RolandCodec,
};

/// Name shown to the user.
pub const MODEL_NAME: &str = "Roland JV-1080";
/// Model id byte following the device id.
pub const MODEL_ID: [u8; 1] = [0x6A];
/// Family code reported in identity replies.
pub const DEVICE_FAMILY: [u8; 2] = [0x6A, 0x00];
/// Address of the temporary patch.
pub const TEMPORARY_PATCH: [u8; 4] = [0x03, 0x00, 0x00, 0x00];
/// Address of user patch 1.
pub const USER_PATCH: [u8; 4] = [0x11, 0x00, 0x00, 0x00];
/// Number of user patches.
pub const USER_PATCH_COUNT: usize = 128;
/// One patch number per second address byte.
pub const PATCH_STRIDE: u32 = 0x4000;

fn patch(name: &str) -> DatasetSpec {
    DatasetSpec::new(name, AddressWidth::Four)
        .block(&[0x00, 0x00, 0x00, 0x00], 0x48, "Patch common")
        .block(&[0x00, 0x00, 0x10, 0x00], (0x01, 0x01), "Patch tone 1")
        .block(&[0x00, 0x00, 0x12, 0x00], (0x01, 0x01), "Patch tone 2")
        .block(&[0x00, 0x00, 0x14, 0x00], (0x01, 0x01), "Patch tone 3")
        .block(&[0x00, 0x00, 0x16, 0x00], (0x01, 0x01), "Patch tone 4")
        .name_field(0, 12)
}

/// Device table.
#[must_use]
pub fn spec() -> DeviceSpec {
    DeviceSpec::new(
        MODEL_NAME,
        DeviceIdentity::roland(&MODEL_ID, Some(DEVICE_FAMILY)),
        AddressWidth::Four,
        patch("Temporary Patch").base_address(&TEMPORARY_PATCH),
    )
    .program_dump(
        patch("User Patch")
            .base_address(&USER_PATCH)
            .items(USER_PATCH_COUNT)
            .item_stride(PATCH_STRIDE),
    )
}

/// Validated codec.
///
/// # Errors
///
/// Only fails if the table above is inconsistent.
pub fn codec() -> Result<RolandCodec, DefinitionError> {
    spec().build()
}
