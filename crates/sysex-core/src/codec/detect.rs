use super::{Detect, RolandCodec};
use crate::address::SEVEN_BIT_MASK;
use crate::capability::DeviceDetect;
use crate::session::Channel;
use crate::wire::{
    AddressedMessage, CM_ID_DT1, DV_ID_ALL_CALL, MF_ID_UNIVERSAL_NON_REAL_TIME, SYSEX_END,
    SYSEX_START, UNIVERSAL_GENERAL_INFORMATION, UNIVERSAL_IDENTITY_REPLY,
    UNIVERSAL_IDENTITY_REQUEST,
};

impl RolandCodec {
    fn channel_from_device_id(&self, device_id: u8) -> Option<Channel> {
        device_id
            .checked_sub(self.device_id_base)
            .and_then(Channel::new)
    }
}

impl DeviceDetect for RolandCodec {
    fn build_device_detect(&self, channel: Channel) -> Vec<u8> {
        match &self.detect {
            Detect::IdentityRequest { .. } => vec![
                SYSEX_START,
                MF_ID_UNIVERSAL_NON_REAL_TIME,
                DV_ID_ALL_CALL,
                UNIVERSAL_GENERAL_INFORMATION,
                UNIVERSAL_IDENTITY_REQUEST,
                SYSEX_END,
            ],
            Detect::ReadBlock { address, size } => {
                let session = self.session(channel);
                self.framing.encode(&AddressedMessage::request(
                    session.device_id(),
                    *address,
                    size.clone(),
                ))
            }
        }
    }

    fn channel_from_detect_reply(&self, message: &[u8]) -> Option<Channel> {
        match &self.detect {
            Detect::IdentityRequest { family } => {
                let &[
                    SYSEX_START,
                    MF_ID_UNIVERSAL_NON_REAL_TIME,
                    device_id,
                    UNIVERSAL_GENERAL_INFORMATION,
                    UNIVERSAL_IDENTITY_REPLY,
                    manufacturer_id,
                    family_lo,
                    family_hi,
                    ..,
                    SYSEX_END,
                ] = message
                else {
                    return None;
                };
                if manufacturer_id != self.framing.identity.manufacturer_id
                    || [family_lo, family_hi] != *family
                {
                    return None;
                }
                self.channel_from_device_id(device_id & SEVEN_BIT_MASK)
            }
            Detect::ReadBlock { address, .. } => {
                let reply = self.framing.decode(message).ok()?;
                if reply.command != CM_ID_DT1 || reply.address != *address {
                    return None;
                }
                self.channel_from_device_id(reply.device_id)
            }
        }
    }

    fn needs_channel_specific_detection(&self) -> bool {
        matches!(self.detect, Detect::ReadBlock { .. })
    }

    fn detect_wait_milliseconds(&self) -> u32 {
        self.detect_wait_milliseconds
    }
}
