//! Caller-owned device session state.

/// Roland device ids start at `10h` for MIDI channel 1.
pub const DEFAULT_DEVICE_ID_BASE: u8 = 0x10;
/// Number of MIDI channels.
pub const CHANNEL_COUNT: u8 = 16;

/// Zero-based MIDI channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Channel(u8);

impl Channel {
    /// Returns `None` for values above 15.
    #[must_use]
    pub const fn new(channel: u8) -> Option<Self> {
        if channel < CHANNEL_COUNT {
            Some(Self(channel))
        } else {
            None
        }
    }

    /// Zero-based channel number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Device id learned during detection, threaded through every request.
///
/// Each probed device gets its own session; nothing is stored inside the
/// codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceSession {
    channel: Channel,
    device_id: u8,
}

impl DeviceSession {
    /// Session for a device answering on `channel`.
    #[must_use]
    pub const fn new(channel: Channel, device_id_base: u8) -> Self {
        Self {
            channel,
            device_id: device_id_base.wrapping_add(channel.0) & 0x7F,
        }
    }

    /// Channel the device listens on.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Device id written into request headers.
    #[must_use]
    pub const fn device_id(&self) -> u8 {
        self.device_id
    }
}
