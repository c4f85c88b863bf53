//! Application message decoding
//!
//! A decrypted payload is parsed as an [`Envelope`] and then dispatched on its
//! port number through a registration table of decode functions. Ports with
//! no registered decoder produce [`Payload::Unstructured`]; a decoder that
//! fails produces [`Payload::Unparsed`] so the frame is still reported.
//!
//! ## Example
//!
//! ```rust
//! use meshscope_core::frame::NodeId;
//! use meshscope_core::message::{DecodeContext, MessageDecoder, Payload};
//!
//! let decoder = MessageDecoder::default();
//! let ctx = DecodeContext::new(NodeId::from_u32(0x1234), NodeId::BROADCAST);
//!
//! // Data { portnum: TEXT_MESSAGE_APP, payload: "hi" }
//! let msg = decoder.decode(&[0x08, 0x01, 0x12, 0x02, b'h', b'i'], &ctx).unwrap();
//! assert_eq!(msg.payload, Payload::Text("hi".into()));
//! ```

mod admin;
mod node;
mod routing;
mod store_forward;

pub use admin::AdminReport;
pub use node::{MapReportRecord, NeighborEntry, NeighborReport, NodeIdentity, PositionReport};
pub use routing::{RouteTrace, RoutingKind, RoutingReport};
pub use store_forward::{SfHeartbeat, SfHistory, SfStatistics, StoreForwardReport};

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::frame::NodeId;
use crate::port::PortNum;
use crate::telemetry::Telemetry;
use crate::proto;

/// Text substituted for message bodies addressed to a single node
pub const REDACTED_TEXT: &str = "<redacted: direct message>";

/// Marker placed in payloads of ports without a schema
pub const UNSTRUCTURED_MARKER: &str = "<no schema>";

/// Addressing information a decoder may need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeContext {
    /// Sending node
    pub source: NodeId,
    /// Destination node
    pub dest: NodeId,
}

impl DecodeContext {
    /// Create a context for a frame
    pub fn new(source: NodeId, dest: NodeId) -> Self {
        Self { source, dest }
    }

    /// Check if the frame went to every node
    pub fn is_broadcast(&self) -> bool {
        self.dest.is_broadcast()
    }
}

/// Decoded content of a message, serialized as the bare inner value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Position(PositionReport),
    NodeIdentity(NodeIdentity),
    Routing(RoutingReport),
    Admin(AdminReport),
    StoreAndForward(StoreForwardReport),
    Traceroute(RouteTrace),
    NeighborInfo(NeighborReport),
    MapReport(MapReportRecord),
    Telemetry(Telemetry),
    /// Port without a registered decoder
    Unstructured {
        port: u32,
        marker: &'static str,
        /// Inner payload as hex
        #[serde(skip_serializing_if = "String::is_empty")]
        raw: String,
    },
    /// Registered decoder rejected the inner payload
    Unparsed { reason: String },
}

/// Decode function for one port
pub type DecodeFn = fn(&[u8], &DecodeContext) -> Result<Payload>;

fn serialize_port<S: Serializer>(port: &PortNum, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u32(port.to_u32())
}

/// A decoded application message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub source: NodeId,
    pub dest: NodeId,
    #[serde(rename = "portnum", serialize_with = "serialize_port")]
    pub port: PortNum,
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    #[serde(rename = "data")]
    pub payload: Payload,
}

impl Message {
    /// Node identity carried by a NODEINFO_APP message
    pub fn node_identity(&self) -> Option<&NodeIdentity> {
        match &self.payload {
            Payload::NodeIdentity(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Port → decoder registration table
#[derive(Clone)]
pub struct MessageDecoder {
    decoders: HashMap<PortNum, DecodeFn>,
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl std::fmt::Debug for MessageDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ports: Vec<_> = self.decoders.keys().map(|p| p.to_u32()).collect();
        ports.sort_unstable();
        f.debug_struct("MessageDecoder").field("ports", &ports).finish()
    }
}

impl MessageDecoder {
    /// Create a decoder with no registered ports
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Create a decoder with every built-in port registered
    pub fn with_builtin() -> Self {
        let mut decoder = Self::new();
        decoder.register(PortNum::TextMessage, decode_text);
        decoder.register(PortNum::Position, node::decode_position);
        decoder.register(PortNum::NodeInfo, node::decode_node_info);
        decoder.register(PortNum::Routing, routing::decode_routing);
        decoder.register(PortNum::Admin, admin::decode_admin);
        decoder.register(PortNum::StoreForward, store_forward::decode_store_forward);
        decoder.register(PortNum::Telemetry, decode_telemetry);
        decoder.register(PortNum::Traceroute, routing::decode_traceroute);
        decoder.register(PortNum::NeighborInfo, node::decode_neighbor_info);
        decoder.register(PortNum::MapReport, node::decode_map_report);
        decoder
    }

    /// Register a decoder, returning the one it replaces
    pub fn register(&mut self, port: PortNum, decode: DecodeFn) -> Option<DecodeFn> {
        self.decoders.insert(port, decode)
    }

    /// Check if a port has a decoder
    pub fn is_registered(&self, port: PortNum) -> bool {
        self.decoders.contains_key(&port)
    }

    /// Parse the envelope and decode its payload
    pub fn decode(&self, plaintext: &[u8], ctx: &DecodeContext) -> Result<Message> {
        let envelope = Envelope::parse(plaintext)?;
        Ok(self.decode_envelope(&envelope, ctx))
    }

    /// Decode an already parsed envelope
    pub fn decode_envelope(&self, envelope: &Envelope, ctx: &DecodeContext) -> Message {
        let port = envelope.port;
        let payload = match self.decoders.get(&port) {
            Some(decode) => decode(&envelope.payload, ctx).unwrap_or_else(|e| {
                warn!(source = %ctx.source, "{}", e);
                Payload::Unparsed {
                    reason: e.to_string(),
                }
            }),
            None => {
                debug!(port = port.to_u32(), len = envelope.payload.len(), "no decoder for port");
                Payload::Unstructured {
                    port: port.to_u32(),
                    marker: UNSTRUCTURED_MARKER,
                    raw: hex::encode(&envelope.payload),
                }
            }
        };

        Message {
            source: ctx.source,
            dest: ctx.dest,
            port,
            msg_type: port.name(),
            payload,
        }
    }
}

/// Decode an inner protobuf, mapping failures to an inner-schema error
pub(crate) fn parse_inner<M: prost::Message + Default>(port: PortNum, bytes: &[u8]) -> Result<M> {
    M::decode(bytes).map_err(|e| Error::inner_schema(port.name(), e))
}

fn decode_text(bytes: &[u8], ctx: &DecodeContext) -> Result<Payload> {
    if !ctx.is_broadcast() {
        return Ok(Payload::Text(REDACTED_TEXT.to_string()));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::inner_schema(PortNum::TextMessage.name(), e))?;
    Ok(Payload::Text(text.to_string()))
}

fn decode_telemetry(bytes: &[u8], _ctx: &DecodeContext) -> Result<Payload> {
    let raw: proto::Telemetry = parse_inner(PortNum::Telemetry, bytes)?;
    Ok(Payload::Telemetry(Telemetry::from_proto(&raw)))
}
