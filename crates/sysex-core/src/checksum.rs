//! Checksum rules for address-block messages.

use crate::address::{SEVEN_BIT_MASK, SEVEN_BIT_RADIX};

/// Computes the Roland checksum `(-Σ data) mod 128`.
///
/// `data` covers the address and payload bytes of a message, never the
/// header or the checksum itself.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn roland_checksum(data: &[u8]) -> u8 {
    let mut sum = 0u32;
    let mut index = 0;
    while index < data.len() {
        sum += (data[index] & SEVEN_BIT_MASK) as u32;
        index += 1;
    }
    ((SEVEN_BIT_RADIX - sum % SEVEN_BIT_RADIX) % SEVEN_BIT_RADIX) as u8
}

/// Returns `true` when address, payload and trailing checksum sum to zero
/// modulo 128.
#[must_use]
pub const fn checksum_is_valid(data_including_checksum: &[u8]) -> bool {
    let mut sum = 0u32;
    let mut index = 0;
    while index < data_including_checksum.len() {
        sum += (data_including_checksum[index] & SEVEN_BIT_MASK) as u32;
        index += 1;
    }
    sum % SEVEN_BIT_RADIX == 0
}

/// Per-device rule for the byte preceding `F7h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ChecksumRule {
    /// Roland rule, see [`roland_checksum`].
    #[default]
    Roland,
    /// Messages carry no checksum byte.
    Absent,
}

impl ChecksumRule {
    /// Returns the checksum byte for `data`, if the rule uses one.
    #[must_use]
    pub const fn compute(self, data: &[u8]) -> Option<u8> {
        match self {
            Self::Roland => Some(roland_checksum(data)),
            Self::Absent => None,
        }
    }

    /// Number of checksum bytes appended before `F7h`.
    #[must_use]
    pub const fn trailer_len(self) -> usize {
        match self {
            Self::Roland => 1,
            Self::Absent => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{checksum_is_valid, roland_checksum, ChecksumRule};
    use rstest::rstest;

    // Reference values from GS "Data set 1" messages.
    #[rstest]
    #[case(&[0x40, 0x41, 0x22, 0x01], 0x5C)]
    #[case(&[0x40, 0x03, 0x00, 0x00, 0x00], 0x3D)]
    #[case(&[0x40, 0x03, 0x00, 0x01, 0x73], 0x49)]
    #[case(&[0x40, 0x00, 0x7F, 0x00], 0x41)]
    #[case(&[], 0x00)]
    fn checksum_matches_reference_messages(#[case] data: &[u8], #[case] expected: u8) {
        assert_eq!(roland_checksum(data), expected);
    }

    #[test]
    fn appended_checksum_validates() {
        let mut data = vec![0x11, 0x00, 0x10, 0x00, 0x7F, 0x7F, 0x01];
        data.push(roland_checksum(&data));
        assert!(checksum_is_valid(&data));

        data[4] = 0x7E;
        assert!(!checksum_is_valid(&data));
    }

    #[test]
    fn absent_rule_has_no_trailer() {
        assert_eq!(ChecksumRule::Absent.compute(&[1, 2, 3]), None);
        assert_eq!(ChecksumRule::Absent.trailer_len(), 0);
        assert_eq!(ChecksumRule::default().compute(&[0x7F, 0x01]), Some(0x00));
    }
}
