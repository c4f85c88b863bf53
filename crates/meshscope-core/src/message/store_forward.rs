//! Store-and-forward router payloads

use serde::Serialize;

use super::{parse_inner, DecodeContext, Payload, REDACTED_TEXT};
use crate::error::Result;
use crate::port::PortNum;
use crate::proto;
use crate::proto::store_and_forward::Variant;

/// Name of a store-and-forward request/response code
pub fn request_response_name(code: i32) -> &'static str {
    match code {
        0 => "UNSET",
        1 => "ROUTER_ERROR",
        2 => "ROUTER_HEARTBEAT",
        3 => "ROUTER_PING",
        4 => "ROUTER_PONG",
        5 => "ROUTER_BUSY",
        6 => "ROUTER_HISTORY",
        7 => "ROUTER_STATS",
        8 => "ROUTER_TEXT_DIRECT",
        9 => "ROUTER_TEXT_BROADCAST",
        64 => "CLIENT_ERROR",
        65 => "CLIENT_HISTORY",
        66 => "CLIENT_STATS",
        67 => "CLIENT_PING",
        68 => "CLIENT_PONG",
        106 => "CLIENT_ABORT",
        _ => "UNKNOWN",
    }
}

/// Router statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SfStatistics {
    pub messages_total: u32,
    pub messages_saved: u32,
    pub messages_max: u32,
    pub up_time: u32,
    pub requests: u32,
    pub requests_history: u32,
    pub heartbeat: bool,
    pub return_max: u32,
    pub return_window: u32,
}

/// History replay announcement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SfHistory {
    pub history_messages: u32,
    pub window: u32,
    pub last_request: u32,
}

/// Router heartbeat
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SfHeartbeat {
    pub period: u32,
    pub secondary: u32,
}

/// Store-and-forward message
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreForwardReport {
    pub rr: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SfStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<SfHistory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<SfHeartbeat>,
    /// Replayed text; redacted unless the frame was broadcast
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

pub(super) fn decode_store_forward(bytes: &[u8], ctx: &DecodeContext) -> Result<Payload> {
    let sf: proto::StoreAndForward = parse_inner(PortNum::StoreForward, bytes)?;
    let mut report = StoreForwardReport {
        rr: request_response_name(sf.rr),
        ..Default::default()
    };

    match sf.variant {
        Some(Variant::Stats(s)) => {
            report.stats = Some(SfStatistics {
                messages_total: s.messages_total,
                messages_saved: s.messages_saved,
                messages_max: s.messages_max,
                up_time: s.up_time,
                requests: s.requests,
                requests_history: s.requests_history,
                heartbeat: s.heartbeat,
                return_max: s.return_max,
                return_window: s.return_window,
            })
        }
        Some(Variant::History(h)) => {
            report.history = Some(SfHistory {
                history_messages: h.history_messages,
                window: h.window,
                last_request: h.last_request,
            })
        }
        Some(Variant::Heartbeat(h)) => {
            report.heartbeat = Some(SfHeartbeat {
                period: h.period,
                secondary: h.secondary,
            })
        }
        Some(Variant::Text(text)) => {
            report.text = Some(if ctx.is_broadcast() {
                String::from_utf8_lossy(&text).into_owned()
            } else {
                REDACTED_TEXT.to_string()
            })
        }
        None => {}
    }

    Ok(Payload::StoreAndForward(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::NodeId;
    use crate::proto::store_and_forward::{Heartbeat, Statistics};
    use prost::Message as _;
    use serde_json::json;

    fn text_frame() -> Vec<u8> {
        proto::StoreAndForward {
            rr: 9,
            variant: Some(Variant::Text(b"stored hello".to_vec())),
        }
        .encode_to_vec()
    }

    #[test]
    fn test_broadcast_text_preserved() {
        let ctx = DecodeContext::new(NodeId::from_u32(1), NodeId::BROADCAST);
        let Payload::StoreAndForward(report) = decode_store_forward(&text_frame(), &ctx).unwrap() else {
            panic!("expected store and forward");
        };
        assert_eq!(report.rr, "ROUTER_TEXT_BROADCAST");
        assert_eq!(report.text.as_deref(), Some("stored hello"));
    }

    #[test]
    fn test_direct_text_redacted() {
        let ctx = DecodeContext::new(NodeId::from_u32(1), NodeId::from_u32(2));
        let Payload::StoreAndForward(report) = decode_store_forward(&text_frame(), &ctx).unwrap() else {
            panic!("expected store and forward");
        };
        assert_eq!(report.text.as_deref(), Some(REDACTED_TEXT));
    }

    #[test]
    fn test_heartbeat_and_stats() {
        let ctx = DecodeContext::new(NodeId::from_u32(1), NodeId::BROADCAST);
        let bytes = proto::StoreAndForward {
            rr: 2,
            variant: Some(Variant::Heartbeat(Heartbeat { period: 900, secondary: 0 })),
        }
        .encode_to_vec();
        assert_eq!(
            serde_json::to_value(decode_store_forward(&bytes, &ctx).unwrap()).unwrap(),
            json!({ "rr": "ROUTER_HEARTBEAT", "heartbeat": { "period": 900, "secondary": 0 } })
        );

        let bytes = proto::StoreAndForward {
            rr: 7,
            variant: Some(Variant::Stats(Statistics {
                messages_total: 40,
                heartbeat: true,
                ..Default::default()
            })),
        }
        .encode_to_vec();
        let Payload::StoreAndForward(report) = decode_store_forward(&bytes, &ctx).unwrap() else {
            panic!("expected store and forward");
        };
        let stats = report.stats.unwrap();
        assert_eq!(stats.messages_total, 40);
        assert!(stats.heartbeat);
    }

    #[test]
    fn test_code_names() {
        assert_eq!(request_response_name(106), "CLIENT_ABORT");
        assert_eq!(request_response_name(65), "CLIENT_HISTORY");
        assert_eq!(request_response_name(200), "UNKNOWN");
    }
}
