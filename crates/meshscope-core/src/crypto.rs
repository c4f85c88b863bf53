//! AES-CTR channel decryption
//!
//! Payloads are encrypted with AES-128-CTR or AES-256-CTR depending on the
//! channel key length. There is no integrity code: a key is accepted when the
//! plaintext it produces parses as a valid envelope.
//!
//! ## Nonce Construction
//!
//! The 16-byte nonce (initial counter block) is built from wire-order bytes:
//! ```text
//! Bytes 0-3:   packet_id (wire order)
//! Bytes 4-7:   zero
//! Bytes 8-11:  sender_id (wire order)
//! Bytes 12-15: zero
//! ```

use aes::{Aes128, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::frame::{NodeId, RawFrame};
use crate::keys::{CandidateKey, KeyRegistry};

/// Build the per-packet CTR nonce
pub fn make_nonce(sender: NodeId, packet_id: u32) -> [u8; 16] {
    let mut nonce = [0u8; 16];
    nonce[0..4].copy_from_slice(&packet_id.to_le_bytes());
    nonce[8..12].copy_from_slice(&sender.wire_bytes());
    nonce
}

fn keystream<C: KeyIvInit + StreamCipher>(key: &[u8], nonce: &[u8; 16], data: &mut [u8]) -> Result<()> {
    let mut cipher =
        C::new_from_slices(key, nonce).map_err(|_| Error::InvalidKeyLength(key.len()))?;
    cipher.apply_keystream(data);
    Ok(())
}

/// XOR `data` in place with the AES-CTR keystream
///
/// Encryption and decryption are the same operation.
pub fn apply_ctr(key: &[u8], nonce: &[u8; 16], data: &mut [u8]) -> Result<()> {
    match key.len() {
        16 => keystream::<Ctr128BE<Aes128>>(key, nonce, data),
        32 => keystream::<Ctr128BE<Aes256>>(key, nonce, data),
        len => Err(Error::InvalidKeyLength(len)),
    }
}

/// Encrypt or decrypt a payload for the given sender and packet
pub fn transform(key: &CandidateKey, sender: NodeId, packet_id: u32, data: &[u8]) -> Result<Vec<u8>> {
    let nonce = make_nonce(sender, packet_id);
    let mut out = data.to_vec();
    apply_ctr(key.as_bytes(), &nonce, &mut out)?;
    Ok(out)
}

/// Whether a frame was protected by the well-known default key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionClass {
    /// Default key, readable by anyone
    Public,
    /// Any other configured key
    Private,
}

impl EncryptionClass {
    /// Classify a matched key
    pub fn of(key: &CandidateKey) -> Self {
        if key.is_default() {
            EncryptionClass::Public
        } else {
            EncryptionClass::Private
        }
    }
}

impl fmt::Display for EncryptionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionClass::Public => f.write_str("public"),
            EncryptionClass::Private => f.write_str("private"),
        }
    }
}

/// Outcome of trial decryption; all fields are `None` when no key matched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedResult {
    /// Decrypted envelope bytes
    pub plaintext: Option<Vec<u8>>,
    /// Envelope parsed while accepting the key
    pub envelope: Option<Envelope>,
    /// Key that produced a valid envelope
    pub matched_key: Option<CandidateKey>,
    /// Classification of the matched key
    pub encryption_class: Option<EncryptionClass>,
}

impl DecodedResult {
    /// Check if any key matched
    pub fn is_decrypted(&self) -> bool {
        self.plaintext.is_some()
    }
}

/// Try every configured key in order, returning the first structural match
pub fn try_decrypt(frame: &RawFrame, keys: &KeyRegistry) -> DecodedResult {
    let nonce = make_nonce(frame.sender, frame.packet_id);

    for (index, key) in keys.keys().iter().enumerate() {
        let mut plaintext = frame.payload.clone();
        if let Err(e) = apply_ctr(key.as_bytes(), &nonce, &mut plaintext) {
            trace!(index, "key rejected: {}", e);
            continue;
        }
        match Envelope::parse(&plaintext) {
            Ok(envelope) => {
                trace!(index, packet_id = frame.packet_id, "key matched");
                return DecodedResult {
                    plaintext: Some(plaintext),
                    envelope: Some(envelope),
                    encryption_class: Some(EncryptionClass::of(key)),
                    matched_key: Some(key.clone()),
                };
            }
            Err(e) => trace!(index, "no structural match: {}", e),
        }
    }

    DecodedResult::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::DEFAULT_PSK;
    use proptest::prelude::*;

    const PRIVATE_KEY_B64: &str = "8k3JQZUvAFM6Kb0kHbZ0gGCqWzx7lBkHfTuHn7o5U8s=";

    fn frame_with(key: &CandidateKey, plaintext: &[u8]) -> RawFrame {
        let sender = NodeId::from_u32(0x12345678);
        let packet_id = 0xdeadbeef;
        RawFrame {
            dest: NodeId::BROADCAST,
            sender,
            packet_id,
            flags: 0x63,
            channel_hash: 0x08,
            payload: transform(key, sender, packet_id, plaintext).unwrap(),
        }
    }

    // Data { portnum: 1, payload: "hi" }
    const TEXT_ENVELOPE: [u8; 6] = [0x08, 0x01, 0x12, 0x02, 0x68, 0x69];

    #[test]
    fn test_nonce_layout() {
        let nonce = make_nonce(NodeId::from_u32(0x12345678), 0xdeadbeef);
        assert_eq!(
            nonce,
            [0xef, 0xbe, 0xad, 0xde, 0, 0, 0, 0, 0x78, 0x56, 0x34, 0x12, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_known_ciphertext() {
        let frame = frame_with(&CandidateKey::default_key(), &TEXT_ENVELOPE);
        assert_eq!(frame.payload, [0xa3, 0x41, 0x54, 0x54, 0x38, 0xb5]);
    }

    #[test]
    fn test_captured_frame_decodes() {
        // LongFast broadcast captured from a live node
        let bytes = hex::decode("ffffffffb45463dab971aa8c6308000078aacf76587a5a4cf4a20e2c1d0349ab3f72").unwrap();
        let frame = RawFrame::parse(&bytes).unwrap();
        assert!(frame.is_broadcast());
        assert_eq!(frame.sender.to_u32(), 0xda6354b4);
        assert_eq!(frame.packet_id, 0x8caa71b9);

        let keys = KeyRegistry::with_default_key("LongFast");
        assert_eq!(keys.channel_name_for(frame.channel_hash), Some("LongFast"));

        let result = try_decrypt(&frame, &keys);
        let mut expected = vec![0x08, 0x01, 0x12, 0x0e];
        expected.extend_from_slice(b"TestingCLU1234");
        assert_eq!(result.plaintext, Some(expected));
        assert_eq!(result.encryption_class, Some(EncryptionClass::Public));

        let envelope = result.envelope.unwrap();
        assert_eq!(envelope.port, crate::port::PortNum::TextMessage);
        assert_eq!(envelope.payload, b"TestingCLU1234");
    }

    #[test]
    fn test_default_key_is_public() {
        let keys = KeyRegistry::with_default_key("LongFast");
        let frame = frame_with(&CandidateKey::default_key(), &TEXT_ENVELOPE);
        let result = try_decrypt(&frame, &keys);
        assert!(result.is_decrypted());
        assert_eq!(result.plaintext.as_deref(), Some(&TEXT_ENVELOPE[..]));
        assert_eq!(result.encryption_class, Some(EncryptionClass::Public));
        assert_eq!(result.matched_key.unwrap().as_bytes(), &DEFAULT_PSK);
    }

    #[test]
    fn test_other_key_is_private() {
        let private = CandidateKey::from_base64(PRIVATE_KEY_B64, Some("Friends")).unwrap();
        let mut keys = KeyRegistry::with_default_key("LongFast");
        keys.add(private.clone());

        let frame = frame_with(&private, &TEXT_ENVELOPE);
        let result = try_decrypt(&frame, &keys);
        assert_eq!(result.encryption_class, Some(EncryptionClass::Private));
        assert_eq!(result.matched_key, Some(private));
    }

    #[test]
    fn test_no_matching_key() {
        let keys = KeyRegistry::with_default_key("LongFast");
        // unterminated varint tag, never a valid envelope
        let frame = frame_with(&CandidateKey::default_key(), &[0xff; 8]);
        assert_eq!(try_decrypt(&frame, &keys), DecodedResult::default());

        let valid = frame_with(&CandidateKey::default_key(), &TEXT_ENVELOPE);
        assert!(!try_decrypt(&valid, &KeyRegistry::new("LongFast")).is_decrypted());
    }

    #[test]
    fn test_empty_payload_decodes_to_empty_envelope() {
        let keys = KeyRegistry::with_default_key("LongFast");
        let frame = frame_with(&CandidateKey::default_key(), &[]);
        let result = try_decrypt(&frame, &keys);
        assert_eq!(result.plaintext, Some(Vec::new()));
        assert_eq!(result.encryption_class, Some(EncryptionClass::Public));
    }

    #[test]
    fn test_rejects_bad_key_length() {
        let mut data = [0u8; 4];
        assert!(matches!(
            apply_ctr(&[0u8; 24], &[0u8; 16], &mut data),
            Err(Error::InvalidKeyLength(24))
        ));
    }

    #[test]
    fn test_class_serialization() {
        assert_eq!(serde_json::to_string(&EncryptionClass::Public).unwrap(), "\"public\"");
        assert_eq!(EncryptionClass::Private.to_string(), "private");
    }

    proptest! {
        #[test]
        fn ctr_roundtrip(
            key in prop_oneof![
                proptest::collection::vec(any::<u8>(), 16),
                proptest::collection::vec(any::<u8>(), 32),
            ],
            sender in any::<u32>(),
            packet_id in any::<u32>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=237),
        ) {
            let key = CandidateKey::from_bytes(&key, None).unwrap();
            let sender = NodeId::from_u32(sender);
            let ciphertext = transform(&key, sender, packet_id, &payload).unwrap();
            prop_assert_eq!(ciphertext.len(), payload.len());
            prop_assert_eq!(transform(&key, sender, packet_id, &ciphertext).unwrap(), payload);
        }
    }
}
