//! Over-the-air frame extraction
//!
//! Meshtastic radios prefix every LoRa payload with a fixed 16-byte header.
//! The three 32-bit identifiers are little-endian on the wire; the rest of
//! this crate works with them in corrected (most-significant-first) order.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌────────────┬────────────┬────────────┬───────┬──────────┬──────────┬──────────────┐
//! │ Dest (4B)  │ Src (4B)   │ Packet ID  │ Flags │ Channel  │ Reserved │ Payload      │
//! │            │            │   (4B)     │ (1B)  │ Hash (1B)│   (2B)   │ (0-237B)     │
//! └────────────┴────────────┴────────────┴───────┴──────────┴──────────┴──────────────┘
//! ```

use byteorder::{ByteOrder, LittleEndian};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Error, Result};

/// Size of the fixed frame header in bytes
pub const HEADER_SIZE: usize = 16;

/// Largest payload a LoRa frame can carry after the header
pub const MAX_PAYLOAD_SIZE: usize = 237;

/// Reverse the byte order of a 4-byte wire field.
///
/// Applying it twice yields the original bytes.
pub fn reverse_word(bytes: [u8; 4]) -> [u8; 4] {
    [bytes[3], bytes[2], bytes[1], bytes[0]]
}

/// Node identifier - 4-byte unique ID in corrected byte order
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId([u8; 4]);

impl NodeId {
    /// Broadcast address (all 0xFF)
    pub const BROADCAST: NodeId = NodeId([0xFF, 0xFF, 0xFF, 0xFF]);

    /// Create a new NodeId from 4 bytes in corrected order
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        NodeId(bytes)
    }

    /// Create a NodeId from the 4 bytes as they appear on the wire
    pub fn from_wire(bytes: [u8; 4]) -> Self {
        NodeId(reverse_word(bytes))
    }

    /// Create a NodeId from a u32
    pub fn from_u32(value: u32) -> Self {
        NodeId(value.to_be_bytes())
    }

    /// Convert to u32
    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Get the corrected bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Get the bytes in wire order
    pub fn wire_bytes(&self) -> [u8; 4] {
        reverse_word(self.0)
    }

    /// Check if this is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:08x})", self.to_u32())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.to_u32())
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim_start_matches('!').trim_start_matches("0x");
        u32::from_str_radix(s, 16).map(NodeId::from_u32)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A frame as received from the radio, header fields already corrected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Destination node ID (BROADCAST for all nodes)
    pub dest: NodeId,
    /// Sending node ID
    pub sender: NodeId,
    /// Packet ID (nonce input and downstream dedup key)
    pub packet_id: u32,
    /// Raw flags byte, see [`crate::flags::FlagBits`]
    pub flags: u8,
    /// XOR-fold hash of the channel name and key
    pub channel_hash: u8,
    /// Payload (ciphertext until decrypted)
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// Extract a frame from raw bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::MalformedFrame { len: bytes.len() });
        }

        let payload = bytes[HEADER_SIZE..].to_vec();
        if payload.len() > MAX_PAYLOAD_SIZE {
            debug!(len = payload.len(), "payload exceeds LoRa MTU, keeping as-is");
        }

        Ok(Self {
            dest: NodeId::from_u32(LittleEndian::read_u32(&bytes[0..4])),
            sender: NodeId::from_u32(LittleEndian::read_u32(&bytes[4..8])),
            packet_id: LittleEndian::read_u32(&bytes[8..12]),
            flags: bytes[12],
            channel_hash: bytes[13],
            payload,
        })
    }

    /// Packet ID bytes in wire order
    pub fn packet_id_wire(&self) -> [u8; 4] {
        self.packet_id.to_le_bytes()
    }

    /// Check if this frame is addressed to every node
    pub fn is_broadcast(&self) -> bool {
        self.dest.is_broadcast()
    }

    /// Total size on the wire
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Serialize back to wire format (reserved bytes written as zero)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.wire_len());
        bytes.extend_from_slice(&self.dest.wire_bytes());
        bytes.extend_from_slice(&self.sender.wire_bytes());
        bytes.extend_from_slice(&self.packet_id_wire());
        bytes.push(self.flags);
        bytes.push(self.channel_hash);
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_bytes() -> Vec<u8> {
        let mut bytes = vec![
            0xff, 0xff, 0xff, 0xff, // dest
            0x78, 0x56, 0x34, 0x12, // sender
            0xef, 0xbe, 0xad, 0xde, // packet id
            0x63, // flags
            0x08, // channel hash
            0xaa, 0xbb, // reserved
        ];
        bytes.extend_from_slice(b"payload");
        bytes
    }

    #[test]
    fn test_extract_fields() {
        let frame = RawFrame::parse(&sample_bytes()).unwrap();
        assert!(frame.is_broadcast());
        assert_eq!(frame.sender.to_u32(), 0x12345678);
        assert_eq!(frame.sender.to_string(), "12345678");
        assert_eq!(frame.packet_id, 0xdeadbeef);
        assert_eq!(frame.flags, 0x63);
        assert_eq!(frame.channel_hash, 0x08);
        assert_eq!(frame.payload, b"payload");
        assert_eq!(frame.wire_len(), sample_bytes().len());
    }

    #[test]
    fn test_wire_order_preserved_for_nonce() {
        let frame = RawFrame::parse(&sample_bytes()).unwrap();
        assert_eq!(frame.sender.wire_bytes(), [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(frame.packet_id_wire(), [0xef, 0xbe, 0xad, 0xde]);
    }

    #[test]
    fn test_too_short_rejected() {
        let err = RawFrame::parse(&[0u8; 15]).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame { len: 15 }));
        assert!(RawFrame::parse(&[]).is_err());
    }

    #[test]
    fn test_header_only_frame() {
        let frame = RawFrame::parse(&[0u8; HEADER_SIZE]).unwrap();
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_node_id_parse_and_display() {
        let id: NodeId = "!a1b2c3d4".parse().unwrap();
        assert_eq!(id.to_u32(), 0xa1b2c3d4);
        assert_eq!(format!("{:?}", id), "NodeId(a1b2c3d4)");
        assert!("ffffffff".parse::<NodeId>().unwrap().is_broadcast());
    }

    #[test]
    fn test_node_id_serde() {
        let id = NodeId::from_u32(0x0badcafe);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0badcafe\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    proptest! {
        #[test]
        fn reverse_word_is_involution(word in any::<[u8; 4]>()) {
            prop_assert_eq!(reverse_word(reverse_word(word)), word);
            prop_assert_eq!(NodeId::from_wire(word).wire_bytes(), word);
        }

        #[test]
        fn to_bytes_inverts_parse(
            header in proptest::collection::vec(any::<u8>(), HEADER_SIZE),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        ) {
            let mut bytes = header;
            bytes[14] = 0;
            bytes[15] = 0;
            bytes.extend_from_slice(&payload);
            let frame = RawFrame::parse(&bytes).unwrap();
            prop_assert_eq!(frame.to_bytes(), bytes);
        }
    }
}
