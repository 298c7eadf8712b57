//! Roland XV-3080 patch memory.
//!
//! The XV-3080 answers with its own patch format but can load JV-1080
//! patches, so the registered adaptation is a [`CompatChain`] with the
//! JV-1080 codec behind the XV-3080 one.

use sysex_core::{
    AddressWidth, CompatChain, DatasetSpec, DefinitionError, DeviceIdentity, DeviceSpec,
    RolandCodec,
};

use crate::jv1080;

/// Name shown to the user.
pub const MODEL_NAME: &str = "Roland XV-3080";
/// Model id bytes following the device id.
pub const MODEL_ID: [u8; 2] = [0x00, 0x10];
/// Family code reported in identity replies.
pub const DEVICE_FAMILY: [u8; 2] = [0x10, 0x01];
/// Address of the temporary patch.
pub const TEMPORARY_PATCH: [u8; 4] = [0x1F, 0x00, 0x00, 0x00];
/// Address of user patch 1.
pub const USER_PATCH: [u8; 4] = [0x30, 0x00, 0x00, 0x00];
/// Number of user patches.
pub const USER_PATCH_COUNT: usize = 128;
/// One patch number per second address byte.
pub const PATCH_STRIDE: u32 = 0x4000;

fn patch(name: &str) -> DatasetSpec {
    DatasetSpec::new(name, AddressWidth::Four)
        .block(&[0x00, 0x00, 0x00, 0x00], 0x4F, "Patch common")
        .block(&[0x00, 0x00, 0x02, 0x00], (0x01, 0x11), "Patch common MFX")
        .block(&[0x00, 0x00, 0x04, 0x00], 0x34, "Patch common chorus")
        .block(&[0x00, 0x00, 0x06, 0x00], 0x53, "Patch common reverb")
        .block(&[0x00, 0x00, 0x10, 0x00], 0x29, "Patch TMT")
        .block(&[0x00, 0x00, 0x20, 0x00], (0x01, 0x09), "Patch tone 1")
        .block(&[0x00, 0x00, 0x22, 0x00], (0x01, 0x09), "Patch tone 2")
        .block(&[0x00, 0x00, 0x24, 0x00], (0x01, 0x09), "Patch tone 3")
        .block(&[0x00, 0x00, 0x26, 0x00], (0x01, 0x09), "Patch tone 4")
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

/// Validated XV-3080 codec on its own.
///
/// # Errors
///
/// Only fails if the table above is inconsistent.
pub fn codec() -> Result<RolandCodec, DefinitionError> {
    spec().build()
}

/// XV-3080 first, JV-1080 patches accepted as legacy data.
///
/// # Errors
///
/// Only fails if one of the tables is inconsistent.
pub fn chain() -> Result<CompatChain, DefinitionError> {
    Ok(CompatChain::new(codec()?, vec![jv1080::codec()?]))
}
