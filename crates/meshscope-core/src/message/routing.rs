//! Routing control and traceroute payloads

use serde::Serialize;

use super::{parse_inner, DecodeContext, Payload};
use crate::error::Result;
use crate::frame::NodeId;
use crate::port::PortNum;
use crate::proto;

/// SNR value the firmware uses for "not measured"
const SNR_UNKNOWN: i32 = i8::MIN as i32;

/// Convert a quarter-dB SNR sample
fn snr_db(raw: i32) -> Option<f64> {
    (raw != SNR_UNKNOWN).then(|| f64::from(raw) / 4.0)
}

/// Name of a routing error code
pub fn error_reason_name(code: i32) -> &'static str {
    match code {
        0 => "NONE",
        1 => "NO_ROUTE",
        2 => "GOT_NAK",
        3 => "TIMEOUT",
        4 => "NO_INTERFACE",
        5 => "MAX_RETRANSMIT",
        6 => "NO_CHANNEL",
        7 => "TOO_LARGE",
        8 => "NO_RESPONSE",
        9 => "DUTY_CYCLE_LIMIT",
        32 => "BAD_REQUEST",
        33 => "NOT_AUTHORIZED",
        34 => "PKI_FAILED",
        35 => "PKI_UNKNOWN_PUBKEY",
        36 => "ADMIN_BAD_SESSION_KEY",
        37 => "ADMIN_PUBLIC_KEY_UNAUTHORIZED",
        _ => "UNKNOWN",
    }
}

/// Hops recorded by a route discovery, each direction with per-hop SNR
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteTrace {
    pub route: Vec<NodeId>,
    /// SNR in dB per forward hop, `null` where not measured
    pub snr_towards: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub route_back: Vec<NodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snr_back: Vec<Option<f64>>,
}

impl From<&proto::RouteDiscovery> for RouteTrace {
    fn from(rd: &proto::RouteDiscovery) -> Self {
        Self {
            route: rd.route.iter().copied().map(NodeId::from_u32).collect(),
            snr_towards: rd.snr_towards.iter().copied().map(snr_db).collect(),
            route_back: rd.route_back.iter().copied().map(NodeId::from_u32).collect(),
            snr_back: rd.snr_back.iter().copied().map(snr_db).collect(),
        }
    }
}

impl RouteTrace {
    /// Number of intermediate hops on the forward path
    pub fn hop_count(&self) -> usize {
        self.route.len()
    }
}

/// Which routing message was carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingKind {
    RouteRequest,
    RouteReply,
    Error,
    Empty,
}

/// Routing control message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingReport {
    pub kind: RoutingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<&'static str>,
}

pub(super) fn decode_routing(bytes: &[u8], _ctx: &DecodeContext) -> Result<Payload> {
    use proto::routing::Variant;

    let routing: proto::Routing = parse_inner(PortNum::Routing, bytes)?;
    let report = match &routing.variant {
        Some(Variant::RouteRequest(rd)) => RoutingReport {
            kind: RoutingKind::RouteRequest,
            route: Some(rd.into()),
            error_reason: None,
        },
        Some(Variant::RouteReply(rd)) => RoutingReport {
            kind: RoutingKind::RouteReply,
            route: Some(rd.into()),
            error_reason: None,
        },
        Some(Variant::ErrorReason(code)) => RoutingReport {
            kind: RoutingKind::Error,
            route: None,
            error_reason: Some(error_reason_name(*code)),
        },
        None => RoutingReport {
            kind: RoutingKind::Empty,
            route: None,
            error_reason: None,
        },
    };
    Ok(Payload::Routing(report))
}

pub(super) fn decode_traceroute(bytes: &[u8], _ctx: &DecodeContext) -> Result<Payload> {
    let rd: proto::RouteDiscovery = parse_inner(PortNum::Traceroute, bytes)?;
    Ok(Payload::Traceroute(RouteTrace::from(&rd)))
}
