//! Application port numbers

use std::fmt;

/// Highest port number the protocol reserves for applications
pub const MAX_PORT: u32 = 511;

/// Application port carried in the envelope, selects the payload schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortNum {
    UnknownApp,
    TextMessage,
    RemoteHardware,
    Position,
    NodeInfo,
    Routing,
    Admin,
    TextMessageCompressed,
    Waypoint,
    Audio,
    DetectionSensor,
    Reply,
    IpTunnel,
    Paxcounter,
    Serial,
    StoreForward,
    RangeTest,
    Telemetry,
    Zps,
    Simulator,
    Traceroute,
    NeighborInfo,
    AtakPlugin,
    MapReport,
    PowerStress,
    Private,
    AtakForwarder,
    /// Any number without an assigned application
    Unrecognized(u32),
}

impl PortNum {
    /// Map a port number to its application
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => PortNum::UnknownApp,
            1 => PortNum::TextMessage,
            2 => PortNum::RemoteHardware,
            3 => PortNum::Position,
            4 => PortNum::NodeInfo,
            5 => PortNum::Routing,
            6 => PortNum::Admin,
            7 => PortNum::TextMessageCompressed,
            8 => PortNum::Waypoint,
            9 => PortNum::Audio,
            10 => PortNum::DetectionSensor,
            32 => PortNum::Reply,
            33 => PortNum::IpTunnel,
            34 => PortNum::Paxcounter,
            64 => PortNum::Serial,
            65 => PortNum::StoreForward,
            66 => PortNum::RangeTest,
            67 => PortNum::Telemetry,
            68 => PortNum::Zps,
            69 => PortNum::Simulator,
            70 => PortNum::Traceroute,
            71 => PortNum::NeighborInfo,
            72 => PortNum::AtakPlugin,
            73 => PortNum::MapReport,
            74 => PortNum::PowerStress,
            256 => PortNum::Private,
            257 => PortNum::AtakForwarder,
            other => PortNum::Unrecognized(other),
        }
    }

    /// Numeric port value
    pub fn to_u32(self) -> u32 {
        match self {
            PortNum::UnknownApp => 0,
            PortNum::TextMessage => 1,
            PortNum::RemoteHardware => 2,
            PortNum::Position => 3,
            PortNum::NodeInfo => 4,
            PortNum::Routing => 5,
            PortNum::Admin => 6,
            PortNum::TextMessageCompressed => 7,
            PortNum::Waypoint => 8,
            PortNum::Audio => 9,
            PortNum::DetectionSensor => 10,
            PortNum::Reply => 32,
            PortNum::IpTunnel => 33,
            PortNum::Paxcounter => 34,
            PortNum::Serial => 64,
            PortNum::StoreForward => 65,
            PortNum::RangeTest => 66,
            PortNum::Telemetry => 67,
            PortNum::Zps => 68,
            PortNum::Simulator => 69,
            PortNum::Traceroute => 70,
            PortNum::NeighborInfo => 71,
            PortNum::AtakPlugin => 72,
            PortNum::MapReport => 73,
            PortNum::PowerStress => 74,
            PortNum::Private => 256,
            PortNum::AtakForwarder => 257,
            PortNum::Unrecognized(value) => value,
        }
    }

    /// Protocol name, `UNKNOWN` for unassigned numbers
    pub fn name(self) -> &'static str {
        match self {
            PortNum::UnknownApp => "UNKNOWN_APP",
            PortNum::TextMessage => "TEXT_MESSAGE_APP",
            PortNum::RemoteHardware => "REMOTE_HARDWARE_APP",
            PortNum::Position => "POSITION_APP",
            PortNum::NodeInfo => "NODEINFO_APP",
            PortNum::Routing => "ROUTING_APP",
            PortNum::Admin => "ADMIN_APP",
            PortNum::TextMessageCompressed => "TEXT_MESSAGE_COMPRESSED_APP",
            PortNum::Waypoint => "WAYPOINT_APP",
            PortNum::Audio => "AUDIO_APP",
            PortNum::DetectionSensor => "DETECTION_SENSOR_APP",
            PortNum::Reply => "REPLY_APP",
            PortNum::IpTunnel => "IP_TUNNEL_APP",
            PortNum::Paxcounter => "PAXCOUNTER_APP",
            PortNum::Serial => "SERIAL_APP",
            PortNum::StoreForward => "STORE_FORWARD_APP",
            PortNum::RangeTest => "RANGE_TEST_APP",
            PortNum::Telemetry => "TELEMETRY_APP",
            PortNum::Zps => "ZPS_APP",
            PortNum::Simulator => "SIMULATOR_APP",
            PortNum::Traceroute => "TRACEROUTE_APP",
            PortNum::NeighborInfo => "NEIGHBORINFO_APP",
            PortNum::AtakPlugin => "ATAK_PLUGIN",
            PortNum::MapReport => "MAP_REPORT_APP",
            PortNum::PowerStress => "POWERSTRESS_APP",
            PortNum::Private => "PRIVATE_APP",
            PortNum::AtakForwarder => "ATAK_FORWARDER",
            PortNum::Unrecognized(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for PortNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
