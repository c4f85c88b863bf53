//! Header flags byte
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───────────┬───┬───┬───────────┐
//! │ hop_start │ R │ A │ hop_limit │
//! └───────────┴───┴───┴───────────┘
//!  R = via relay (e.g. MQTT gateway), A = want ack
//! ```

use serde::{Deserialize, Serialize};

/// Decoded view of the header flags byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagBits {
    /// Remaining hops (0-7)
    pub hop_limit: u8,
    /// Sender requested an acknowledgment
    pub want_ack: bool,
    /// Frame was relayed through a gateway
    pub via_relay: bool,
    /// Hop limit the sender started with (0-7)
    pub hop_start: u8,
}

impl FlagBits {
    const HOP_LIMIT_MASK: u8 = 0x07;
    const WANT_ACK_BIT: u8 = 3;
    const VIA_RELAY_BIT: u8 = 4;
    const HOP_START_SHIFT: u8 = 5;

    /// Unpack a raw flags byte
    pub fn from_byte(flags: u8) -> Self {
        Self {
            hop_limit: flags & Self::HOP_LIMIT_MASK,
            want_ack: flags & (1 << Self::WANT_ACK_BIT) != 0,
            via_relay: flags & (1 << Self::VIA_RELAY_BIT) != 0,
            hop_start: (flags >> Self::HOP_START_SHIFT) & Self::HOP_LIMIT_MASK,
        }
    }

    /// Pack back into a raw flags byte
    pub fn as_byte(&self) -> u8 {
        (self.hop_limit & Self::HOP_LIMIT_MASK)
            | (u8::from(self.want_ack) << Self::WANT_ACK_BIT)
            | (u8::from(self.via_relay) << Self::VIA_RELAY_BIT)
            | ((self.hop_start & Self::HOP_LIMIT_MASK) << Self::HOP_START_SHIFT)
    }

    /// Hops already travelled, when the sender reported its starting limit
    pub fn hops_away(&self) -> Option<u8> {
        (self.hop_start != 0).then(|| self.hop_start.saturating_sub(self.hop_limit))
    }
}

/// Flag fields as stored in log records; all absent when no flags byte is known
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagFields {
    /// See [`FlagBits::hop_limit`]
    pub hop_limit: Option<u8>,
    /// See [`FlagBits::hop_start`]
    pub hop_start: Option<u8>,
    /// See [`FlagBits::want_ack`]
    pub want_ack: Option<bool>,
    /// See [`FlagBits::via_relay`]
    pub via_relay: Option<bool>,
}

impl From<Option<u8>> for FlagFields {
    fn from(flags: Option<u8>) -> Self {
        match flags.map(FlagBits::from_byte) {
            Some(bits) => Self {
                hop_limit: Some(bits.hop_limit),
                hop_start: Some(bits.hop_start),
                want_ack: Some(bits.want_ack),
                via_relay: Some(bits.via_relay),
            },
            None => Self::default(),
        }
    }
}
