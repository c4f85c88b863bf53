//! Decrypted application envelope

use prost::Message as _;

use crate::error::{Error, Result};
use crate::port::{PortNum, MAX_PORT};
use crate::proto;

/// Outer structure of every decrypted payload
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Application port selecting the inner schema
    pub port: PortNum,
    /// Inner payload bytes
    pub payload: Vec<u8>,
    /// Sender asked for a reply
    pub want_response: bool,
    /// Packet this one answers, 0 if none
    pub request_id: u32,
    /// Packet this one replies to, 0 if none
    pub reply_id: u32,
    /// Emoji reaction flag
    pub emoji: u32,
    /// Application-defined bits
    pub bitfield: Option<u32>,
}

impl Envelope {
    /// Parse decrypted bytes as an envelope
    ///
    /// Fails unless the bytes are valid protobuf and the port lies within
    /// `0..=511`. This is the structural check used to accept a trial key;
    /// it does not authenticate the plaintext.
    pub fn parse(plaintext: &[u8]) -> Result<Self> {
        let data = proto::Data::decode(plaintext)
            .map_err(|e| Error::EnvelopeParse(e.to_string()))?;

        let port = u32::try_from(data.portnum)
            .ok()
            .filter(|p| *p <= MAX_PORT)
            .ok_or_else(|| Error::EnvelopeParse(format!("port {} out of range", data.portnum)))?;

        Ok(Self {
            port: PortNum::from_u32(port),
            payload: data.payload,
            want_response: data.want_response,
            request_id: data.request_id,
            reply_id: data.reply_id,
            emoji: data.emoji,
            bitfield: data.bitfield,
        })
    }

    /// Encode back into protobuf bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        proto::Data {
            portnum: self.port.to_u32() as i32,
            payload: self.payload.clone(),
            want_response: self.want_response,
            request_id: self.request_id,
            reply_id: self.reply_id,
            emoji: self.emoji,
            bitfield: self.bitfield,
            ..Default::default()
        }
        .encode_to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plaintext_is_empty_envelope() {
        let env = Envelope::parse(&[]).unwrap();
        assert_eq!(env.port, PortNum::UnknownApp);
        assert!(env.payload.is_empty());
        assert_eq!(env.bitfield, None);
    }

    #[test]
    fn test_parse_text_envelope() {
        let bytes = proto::Data {
            portnum: 1,
            payload: b"hi".to_vec(),
            bitfield: Some(1),
            ..Default::default()
        }
        .encode_to_vec();
        let env = Envelope::parse(&bytes).unwrap();
        assert_eq!(env.port, PortNum::TextMessage);
        assert_eq!(env.payload, b"hi");
        assert_eq!(env.bitfield, Some(1));
        assert_eq!(Envelope::parse(&env.to_bytes()).unwrap(), env);
    }

    #[test]
    fn test_out_of_range_port_rejected() {
        for portnum in [512, -1, 100_000] {
            let bytes = proto::Data {
                portnum,
                ..Default::default()
            }
            .encode_to_vec();
            assert!(matches!(Envelope::parse(&bytes), Err(Error::EnvelopeParse(_))));
        }
    }

    #[test]
    fn test_garbage_rejected() {
        // field 1 with an invalid wire type 7
        assert!(Envelope::parse(&[0x0f, 0xff, 0xff]).is_err());
        // truncated length-delimited field
        assert!(Envelope::parse(&[0x12, 0x10, 0x00]).is_err());
    }
}
