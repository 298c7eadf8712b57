//! Content fingerprints for duplicate detection.

use crate::dataset::ByteRange;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// Byte written over blanked ranges before hashing.
pub const BLANK_BYTE: u8 = 0x00;

/// 64-bit FNV-1a hash.
#[must_use]
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut index = 0;
    while index < bytes.len() {
        hash ^= bytes[index] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        index += 1;
    }
    hash
}

/// Hashes `payload` with every range in `blanked` overwritten, rendered as
/// 16 lowercase hex digits.
///
/// Ranges reaching past the payload are clipped.
#[must_use]
pub fn payload_fingerprint<'r>(
    payload: &[u8],
    blanked: impl IntoIterator<Item = &'r ByteRange>,
) -> String {
    let mut bytes = payload.to_vec();
    for range in blanked {
        let end = range.end().min(bytes.len());
        if range.offset < end {
            bytes[range.offset..end].fill(BLANK_BYTE);
        }
    }
    format!("{:016x}", fnv1a_64(&bytes))
}
