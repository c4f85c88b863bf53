//! Node-level reports: position, identity, neighbors, map reports

use serde::Serialize;

use super::{parse_inner, DecodeContext, Payload};
use crate::error::Result;
use crate::frame::NodeId;
use crate::port::PortNum;
use crate::preset::ModemPreset;
use crate::proto;
use crate::telemetry::round_to;

/// Scale of the integer latitude/longitude fields
const DEGREES_PER_UNIT: f64 = 1e-7;

fn degrees(value: i32) -> f64 {
    f64::from(value) * DEGREES_PER_UNIT
}

fn positive(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v != 0)
}

/// GPS position
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionReport {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above MSL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision_bits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sats_in_view: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_speed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_track: Option<u32>,
}

pub(super) fn decode_position(bytes: &[u8], _ctx: &DecodeContext) -> Result<Payload> {
    let pos: proto::Position = parse_inner(PortNum::Position, bytes)?;
    Ok(Payload::Position(PositionReport {
        latitude: degrees(pos.latitude_i.unwrap_or_default()),
        longitude: degrees(pos.longitude_i.unwrap_or_default()),
        altitude: pos.altitude.filter(|a| *a != 0),
        precision_bits: positive(Some(pos.precision_bits)),
        sats_in_view: positive(Some(pos.sats_in_view)),
        ground_speed: positive(pos.ground_speed),
        ground_track: positive(pos.ground_track),
    }))
}

/// Node identity announcement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeIdentity {
    /// User ID string, usually `!` followed by the node number in hex
    pub id: String,
    pub long_name: String,
    pub short_name: String,
    pub hw_model: i32,
    pub role: i32,
    /// Hex-encoded public key, when the node advertises one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

pub(super) fn decode_node_info(bytes: &[u8], _ctx: &DecodeContext) -> Result<Payload> {
    let user: proto::User = parse_inner(PortNum::NodeInfo, bytes)?;
    Ok(Payload::NodeIdentity(NodeIdentity::from(user)))
}

impl From<proto::User> for NodeIdentity {
    fn from(user: proto::User) -> Self {
        Self {
            public_key: (!user.public_key.is_empty()).then(|| hex::encode(&user.public_key)),
            id: user.id,
            long_name: user.long_name,
            short_name: user.short_name,
            hw_model: user.hw_model,
            role: user.role,
        }
    }
}

/// One entry in a neighbor report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborEntry {
    pub node_id: NodeId,
    /// SNR in dB
    pub snr: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_rx_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast_interval_secs: Option<u32>,
}

/// Neighbors heard by the reporting node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborReport {
    pub node_id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sent_by: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast_interval_secs: Option<u32>,
    pub neighbors: Vec<NeighborEntry>,
}

pub(super) fn decode_neighbor_info(bytes: &[u8], _ctx: &DecodeContext) -> Result<Payload> {
    let info: proto::NeighborInfo = parse_inner(PortNum::NeighborInfo, bytes)?;
    let neighbors = info
        .neighbors
        .iter()
        .map(|n| NeighborEntry {
            node_id: NodeId::from_u32(n.node_id),
            snr: round_to(n.snr, 2),
            last_rx_time: positive(Some(n.last_rx_time)),
            broadcast_interval_secs: positive(Some(n.node_broadcast_interval_secs)),
        })
        .collect();

    Ok(Payload::NeighborInfo(NeighborReport {
        node_id: NodeId::from_u32(info.node_id),
        last_sent_by: (info.last_sent_by_id != 0).then(|| NodeId::from_u32(info.last_sent_by_id)),
        broadcast_interval_secs: positive(Some(info.node_broadcast_interval_secs)),
        neighbors,
    }))
}

/// Periodic map report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapReportRecord {
    pub long_name: String,
    pub short_name: String,
    pub role: i32,
    pub hw_model: i32,
    pub firmware_version: String,
    pub region: i32,
    /// Preset channel name, or the raw index when unassigned
    pub modem_preset: String,
    pub has_default_channel: bool,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_precision: Option<u32>,
    pub num_online_local_nodes: u32,
}

pub(super) fn decode_map_report(bytes: &[u8], _ctx: &DecodeContext) -> Result<Payload> {
    let report: proto::MapReport = parse_inner(PortNum::MapReport, bytes)?;
    let modem_preset = ModemPreset::from_index(report.modem_preset)
        .map(|p| p.channel_name().to_string())
        .unwrap_or_else(|| report.modem_preset.to_string());

    Ok(Payload::MapReport(MapReportRecord {
        long_name: report.long_name,
        short_name: report.short_name,
        role: report.role,
        hw_model: report.hw_model,
        firmware_version: report.firmware_version,
        region: report.region,
        modem_preset,
        has_default_channel: report.has_default_channel,
        latitude: degrees(report.latitude_i),
        longitude: degrees(report.longitude_i),
        altitude: (report.altitude != 0).then_some(report.altitude),
        position_precision: positive(Some(report.position_precision)),
        num_online_local_nodes: report.num_online_local_nodes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;
    use serde_json::json;

    fn ctx() -> DecodeContext {
        DecodeContext::new(NodeId::from_u32(0x0a0b0c0d), NodeId::BROADCAST)
    }

    #[test]
    fn test_position_scaling_and_omission() {
        let bytes = proto::Position {
            latitude_i: Some(374_220_000),
            longitude_i: Some(-1_220_840_000),
            altitude: Some(0),
            sats_in_view: 7,
            ground_speed: Some(3),
            ..Default::default()
        }
        .encode_to_vec();

        let Payload::Position(pos) = decode_position(&bytes, &ctx()).unwrap() else {
            panic!("expected position");
        };
        assert!((pos.latitude - 37.422).abs() < 1e-9);
        assert!((pos.longitude + 122.084).abs() < 1e-9);
        assert_eq!(pos.altitude, None);
        assert_eq!(pos.sats_in_view, Some(7));
        assert_eq!(pos.ground_track, None);

        let value = serde_json::to_value(&pos).unwrap();
        assert!(value.get("altitude").is_none());
        assert!(value.get("precision_bits").is_none());
        assert_eq!(value["ground_speed"], 3);
    }

    #[test]
    fn test_position_without_coordinates() {
        let Payload::Position(pos) = decode_position(&[], &ctx()).unwrap() else {
            panic!("expected position");
        };
        assert_eq!(pos.latitude, 0.0);
        assert_eq!(pos.longitude, 0.0);
    }

    #[test]
    fn test_node_info() {
        let bytes = proto::User {
            id: "!0a0b0c0d".into(),
            long_name: "Base Camp".into(),
            short_name: "BC".into(),
            hw_model: 43,
            role: 2,
            public_key: vec![0xab, 0xcd],
            ..Default::default()
        }
        .encode_to_vec();

        let payload = decode_node_info(&bytes, &ctx()).unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "id": "!0a0b0c0d",
                "long_name": "Base Camp",
                "short_name": "BC",
                "hw_model": 43,
                "role": 2,
                "public_key": "abcd",
            })
        );
    }

    #[test]
    fn test_node_info_without_key() {
        let bytes = proto::User {
            long_name: "Solo".into(),
            ..Default::default()
        }
        .encode_to_vec();
        let Payload::NodeIdentity(identity) = decode_node_info(&bytes, &ctx()).unwrap() else {
            panic!("expected identity");
        };
        assert_eq!(identity.public_key, None);
        assert_eq!(identity.short_name, "");
    }

    #[test]
    fn test_neighbor_info() {
        let bytes = proto::NeighborInfo {
            node_id: 0x0a0b0c0d,
            last_sent_by_id: 0,
            node_broadcast_interval_secs: 900,
            neighbors: vec![proto::Neighbor {
                node_id: 0x11223344,
                snr: 6.25,
                ..Default::default()
            }],
        }
        .encode_to_vec();

        let payload = decode_neighbor_info(&bytes, &ctx()).unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "node_id": "0a0b0c0d",
                "broadcast_interval_secs": 900,
                "neighbors": [{ "node_id": "11223344", "snr": 6.25 }],
            })
        );
    }

    #[test]
    fn test_map_report() {
        let bytes = proto::MapReport {
            long_name: "Hilltop".into(),
            short_name: "HT".into(),
            firmware_version: "2.5.0".into(),
            region: 1,
            modem_preset: 0,
            has_default_channel: true,
            latitude_i: 515_000_000,
            longitude_i: -1_000_000,
            num_online_local_nodes: 12,
            ..Default::default()
        }
        .encode_to_vec();

        let Payload::MapReport(report) = decode_map_report(&bytes, &ctx()).unwrap() else {
            panic!("expected map report");
        };
        assert_eq!(report.modem_preset, "LongFast");
        assert!((report.latitude - 51.5).abs() < 1e-9);
        assert_eq!(report.altitude, None);
        assert_eq!(report.num_online_local_nodes, 12);
    }

    #[test]
    fn test_map_report_unknown_preset() {
        let bytes = proto::MapReport {
            modem_preset: 42,
            ..Default::default()
        }
        .encode_to_vec();
        let Payload::MapReport(report) = decode_map_report(&bytes, &ctx()).unwrap() else {
            panic!("expected map report");
        };
        assert_eq!(report.modem_preset, "42");
    }
}
