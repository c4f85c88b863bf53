//! Protobuf schemas for the application layer
//!
//! Wire-compatible subsets of the Meshtastic `mesh`, `admin`, `telemetry`,
//! `storeforward`, and `mqtt` definitions. Enum-typed fields are kept as raw
//! integers so that values newer than this crate still decode; name lookup
//! happens in [`crate::message`].
//!
//! Fields carrying nested messages that this crate never inspects (channel,
//! config, and module-config payloads in admin messages) are declared as
//! `bytes`, which shares the length-delimited wire type.

/// Outer application envelope carried in every decrypted payload
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Data {
    #[prost(int32, tag = "1")]
    pub portnum: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
    #[prost(bool, tag = "3")]
    pub want_response: bool,
    #[prost(fixed32, tag = "4")]
    pub dest: u32,
    #[prost(fixed32, tag = "5")]
    pub source: u32,
    #[prost(fixed32, tag = "6")]
    pub request_id: u32,
    #[prost(fixed32, tag = "7")]
    pub reply_id: u32,
    #[prost(fixed32, tag = "8")]
    pub emoji: u32,
    #[prost(uint32, optional, tag = "9")]
    pub bitfield: Option<u32>,
}

/// GPS position report
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Position {
    /// Latitude in 1e-7 degrees
    #[prost(sfixed32, optional, tag = "1")]
    pub latitude_i: Option<i32>,
    /// Longitude in 1e-7 degrees
    #[prost(sfixed32, optional, tag = "2")]
    pub longitude_i: Option<i32>,
    /// Altitude in meters above MSL
    #[prost(int32, optional, tag = "3")]
    pub altitude: Option<i32>,
    #[prost(fixed32, tag = "4")]
    pub time: u32,
    #[prost(int32, tag = "5")]
    pub location_source: i32,
    #[prost(int32, tag = "6")]
    pub altitude_source: i32,
    #[prost(fixed32, tag = "7")]
    pub timestamp: u32,
    /// Ground speed in m/s
    #[prost(uint32, optional, tag = "15")]
    pub ground_speed: Option<u32>,
    /// True north track in 1/100 degrees
    #[prost(uint32, optional, tag = "16")]
    pub ground_track: Option<u32>,
    #[prost(uint32, tag = "19")]
    pub sats_in_view: u32,
    #[prost(uint32, tag = "23")]
    pub precision_bits: u32,
}

/// Node identity broadcast
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct User {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub long_name: String,
    #[prost(string, tag = "3")]
    pub short_name: String,
    #[prost(bytes = "vec", tag = "4")]
    pub macaddr: Vec<u8>,
    #[prost(int32, tag = "5")]
    pub hw_model: i32,
    #[prost(bool, tag = "6")]
    pub is_licensed: bool,
    #[prost(int32, tag = "7")]
    pub role: i32,
    #[prost(bytes = "vec", tag = "8")]
    pub public_key: Vec<u8>,
}

/// Hop list with per-hop SNR, used by route discovery and traceroute
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteDiscovery {
    #[prost(fixed32, repeated, tag = "1")]
    pub route: Vec<u32>,
    /// SNR in dB * 4 for each forward hop
    #[prost(int32, repeated, tag = "2")]
    pub snr_towards: Vec<i32>,
    #[prost(fixed32, repeated, tag = "3")]
    pub route_back: Vec<u32>,
    /// SNR in dB * 4 for each return hop
    #[prost(int32, repeated, tag = "4")]
    pub snr_back: Vec<i32>,
}

/// Routing control message
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Routing {
    #[prost(oneof = "routing::Variant", tags = "1, 2, 3")]
    pub variant: Option<routing::Variant>,
}

pub mod routing {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "1")]
        RouteRequest(super::RouteDiscovery),
        #[prost(message, tag = "2")]
        RouteReply(super::RouteDiscovery),
        #[prost(int32, tag = "3")]
        ErrorReason(i32),
    }
}

/// Remote administration message
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AdminMessage {
    #[prost(
        oneof = "admin_message::PayloadVariant",
        tags = "1, 3, 5, 7, 12, 32, 33, 34, 35, 64, 65, 95, 96, 97, 98, 99, 100"
    )]
    pub payload_variant: Option<admin_message::PayloadVariant>,
    #[prost(bytes = "vec", tag = "101")]
    pub session_passkey: Vec<u8>,
}

pub mod admin_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PayloadVariant {
        #[prost(uint32, tag = "1")]
        GetChannelRequest(u32),
        #[prost(bool, tag = "3")]
        GetOwnerRequest(bool),
        #[prost(int32, tag = "5")]
        GetConfigRequest(i32),
        #[prost(int32, tag = "7")]
        GetModuleConfigRequest(i32),
        #[prost(bool, tag = "12")]
        GetDeviceMetadataRequest(bool),
        #[prost(message, tag = "32")]
        SetOwner(super::User),
        #[prost(bytes, tag = "33")]
        SetChannel(Vec<u8>),
        #[prost(bytes, tag = "34")]
        SetConfig(Vec<u8>),
        #[prost(bytes, tag = "35")]
        SetModuleConfig(Vec<u8>),
        #[prost(bool, tag = "64")]
        BeginEditSettings(bool),
        #[prost(bool, tag = "65")]
        CommitEditSettings(bool),
        #[prost(int32, tag = "95")]
        RebootOtaSeconds(i32),
        #[prost(bool, tag = "96")]
        ExitSimulator(bool),
        #[prost(int32, tag = "97")]
        RebootSeconds(i32),
        #[prost(int32, tag = "98")]
        ShutdownSeconds(i32),
        #[prost(int32, tag = "99")]
        FactoryResetConfig(i32),
        #[prost(int32, tag = "100")]
        NodedbReset(i32),
    }
}

/// Store-and-forward router protocol
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StoreAndForward {
    #[prost(int32, tag = "1")]
    pub rr: i32,
    #[prost(oneof = "store_and_forward::Variant", tags = "2, 3, 4, 5")]
    pub variant: Option<store_and_forward::Variant>,
}

pub mod store_and_forward {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Statistics {
        #[prost(uint32, tag = "1")]
        pub messages_total: u32,
        #[prost(uint32, tag = "2")]
        pub messages_saved: u32,
        #[prost(uint32, tag = "3")]
        pub messages_max: u32,
        #[prost(uint32, tag = "4")]
        pub up_time: u32,
        #[prost(uint32, tag = "5")]
        pub requests: u32,
        #[prost(uint32, tag = "6")]
        pub requests_history: u32,
        #[prost(bool, tag = "7")]
        pub heartbeat: bool,
        #[prost(uint32, tag = "8")]
        pub return_max: u32,
        #[prost(uint32, tag = "9")]
        pub return_window: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct History {
        #[prost(uint32, tag = "1")]
        pub history_messages: u32,
        #[prost(uint32, tag = "2")]
        pub window: u32,
        #[prost(uint32, tag = "3")]
        pub last_request: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Heartbeat {
        #[prost(uint32, tag = "1")]
        pub period: u32,
        #[prost(uint32, tag = "2")]
        pub secondary: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "2")]
        Stats(Statistics),
        #[prost(message, tag = "3")]
        History(History),
        #[prost(message, tag = "4")]
        Heartbeat(Heartbeat),
        #[prost(bytes, tag = "5")]
        Text(Vec<u8>),
    }
}

/// A single neighbor entry
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Neighbor {
    #[prost(uint32, tag = "1")]
    pub node_id: u32,
    #[prost(float, tag = "2")]
    pub snr: f32,
    #[prost(fixed32, tag = "3")]
    pub last_rx_time: u32,
    #[prost(uint32, tag = "4")]
    pub node_broadcast_interval_secs: u32,
}

/// Neighbor report from a node
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NeighborInfo {
    #[prost(uint32, tag = "1")]
    pub node_id: u32,
    #[prost(uint32, tag = "2")]
    pub last_sent_by_id: u32,
    #[prost(uint32, tag = "3")]
    pub node_broadcast_interval_secs: u32,
    #[prost(message, repeated, tag = "4")]
    pub neighbors: Vec<Neighbor>,
}

/// Periodic map report
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MapReport {
    #[prost(string, tag = "1")]
    pub long_name: String,
    #[prost(string, tag = "2")]
    pub short_name: String,
    #[prost(int32, tag = "3")]
    pub role: i32,
    #[prost(int32, tag = "4")]
    pub hw_model: i32,
    #[prost(string, tag = "5")]
    pub firmware_version: String,
    #[prost(int32, tag = "6")]
    pub region: i32,
    #[prost(int32, tag = "7")]
    pub modem_preset: i32,
    #[prost(bool, tag = "8")]
    pub has_default_channel: bool,
    #[prost(sfixed32, tag = "9")]
    pub latitude_i: i32,
    #[prost(sfixed32, tag = "10")]
    pub longitude_i: i32,
    #[prost(int32, tag = "11")]
    pub altitude: i32,
    #[prost(uint32, tag = "12")]
    pub position_precision: u32,
    #[prost(uint32, tag = "13")]
    pub num_online_local_nodes: u32,
}

/// Telemetry report
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Telemetry {
    #[prost(fixed32, tag = "1")]
    pub time: u32,
    #[prost(oneof = "telemetry::Variant", tags = "2, 3, 4, 5, 6, 7")]
    pub variant: Option<telemetry::Variant>,
}

pub mod telemetry {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "2")]
        DeviceMetrics(super::DeviceMetrics),
        #[prost(message, tag = "3")]
        EnvironmentMetrics(super::EnvironmentMetrics),
        #[prost(message, tag = "4")]
        AirQualityMetrics(super::AirQualityMetrics),
        #[prost(message, tag = "5")]
        PowerMetrics(super::PowerMetrics),
        #[prost(message, tag = "6")]
        LocalStats(super::LocalStats),
        #[prost(message, tag = "7")]
        HealthMetrics(super::HealthMetrics),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceMetrics {
    #[prost(uint32, optional, tag = "1")]
    pub battery_level: Option<u32>,
    #[prost(float, optional, tag = "2")]
    pub voltage: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub channel_utilization: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub air_util_tx: Option<f32>,
    #[prost(uint32, optional, tag = "5")]
    pub uptime_seconds: Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnvironmentMetrics {
    #[prost(float, optional, tag = "1")]
    pub temperature: Option<f32>,
    #[prost(float, optional, tag = "2")]
    pub relative_humidity: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub barometric_pressure: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub gas_resistance: Option<f32>,
    #[prost(float, optional, tag = "5")]
    pub voltage: Option<f32>,
    #[prost(float, optional, tag = "6")]
    pub current: Option<f32>,
    #[prost(uint32, optional, tag = "7")]
    pub iaq: Option<u32>,
    #[prost(float, optional, tag = "8")]
    pub distance: Option<f32>,
    #[prost(float, optional, tag = "9")]
    pub lux: Option<f32>,
    #[prost(float, optional, tag = "10")]
    pub white_lux: Option<f32>,
    #[prost(float, optional, tag = "11")]
    pub ir_lux: Option<f32>,
    #[prost(float, optional, tag = "12")]
    pub uv_lux: Option<f32>,
    #[prost(uint32, optional, tag = "13")]
    pub wind_direction: Option<u32>,
    #[prost(float, optional, tag = "14")]
    pub wind_speed: Option<f32>,
    #[prost(float, optional, tag = "15")]
    pub weight: Option<f32>,
    #[prost(float, optional, tag = "16")]
    pub wind_gust: Option<f32>,
    #[prost(float, optional, tag = "17")]
    pub wind_lull: Option<f32>,
    #[prost(float, optional, tag = "18")]
    pub radiation: Option<f32>,
    #[prost(float, optional, tag = "19")]
    pub rainfall_1h: Option<f32>,
    #[prost(float, optional, tag = "20")]
    pub rainfall_24h: Option<f32>,
    #[prost(uint32, optional, tag = "21")]
    pub soil_moisture: Option<u32>,
    #[prost(float, optional, tag = "22")]
    pub soil_temperature: Option<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PowerMetrics {
    #[prost(float, optional, tag = "1")]
    pub ch1_voltage: Option<f32>,
    #[prost(float, optional, tag = "2")]
    pub ch1_current: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub ch2_voltage: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub ch2_current: Option<f32>,
    #[prost(float, optional, tag = "5")]
    pub ch3_voltage: Option<f32>,
    #[prost(float, optional, tag = "6")]
    pub ch3_current: Option<f32>,
    #[prost(float, optional, tag = "7")]
    pub ch4_voltage: Option<f32>,
    #[prost(float, optional, tag = "8")]
    pub ch4_current: Option<f32>,
    #[prost(float, optional, tag = "9")]
    pub ch5_voltage: Option<f32>,
    #[prost(float, optional, tag = "10")]
    pub ch5_current: Option<f32>,
    #[prost(float, optional, tag = "11")]
    pub ch6_voltage: Option<f32>,
    #[prost(float, optional, tag = "12")]
    pub ch6_current: Option<f32>,
    #[prost(float, optional, tag = "13")]
    pub ch7_voltage: Option<f32>,
    #[prost(float, optional, tag = "14")]
    pub ch7_current: Option<f32>,
    #[prost(float, optional, tag = "15")]
    pub ch8_voltage: Option<f32>,
    #[prost(float, optional, tag = "16")]
    pub ch8_current: Option<f32>,
}

impl PowerMetrics {
    /// (voltage, current) for channels 1 through 8
    pub fn channels(&self) -> [(Option<f32>, Option<f32>); 8] {
        [
            (self.ch1_voltage, self.ch1_current),
            (self.ch2_voltage, self.ch2_current),
            (self.ch3_voltage, self.ch3_current),
            (self.ch4_voltage, self.ch4_current),
            (self.ch5_voltage, self.ch5_current),
            (self.ch6_voltage, self.ch6_current),
            (self.ch7_voltage, self.ch7_current),
            (self.ch8_voltage, self.ch8_current),
        ]
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AirQualityMetrics {
    #[prost(uint32, optional, tag = "1")]
    pub pm10_standard: Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub pm25_standard: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub pm100_standard: Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub pm10_environmental: Option<u32>,
    #[prost(uint32, optional, tag = "5")]
    pub pm25_environmental: Option<u32>,
    #[prost(uint32, optional, tag = "6")]
    pub pm100_environmental: Option<u32>,
    #[prost(uint32, optional, tag = "7")]
    pub particles_03um: Option<u32>,
    #[prost(uint32, optional, tag = "8")]
    pub particles_05um: Option<u32>,
    #[prost(uint32, optional, tag = "9")]
    pub particles_10um: Option<u32>,
    #[prost(uint32, optional, tag = "10")]
    pub particles_25um: Option<u32>,
    #[prost(uint32, optional, tag = "11")]
    pub particles_50um: Option<u32>,
    #[prost(uint32, optional, tag = "12")]
    pub particles_100um: Option<u32>,
    #[prost(uint32, optional, tag = "13")]
    pub co2: Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LocalStats {
    #[prost(uint32, tag = "1")]
    pub uptime_seconds: u32,
    #[prost(float, tag = "2")]
    pub channel_utilization: f32,
    #[prost(float, tag = "3")]
    pub air_util_tx: f32,
    #[prost(uint32, tag = "4")]
    pub num_packets_tx: u32,
    #[prost(uint32, tag = "5")]
    pub num_packets_rx: u32,
    #[prost(uint32, tag = "6")]
    pub num_packets_rx_bad: u32,
    #[prost(uint32, tag = "7")]
    pub num_online_nodes: u32,
    #[prost(uint32, tag = "8")]
    pub num_total_nodes: u32,
    #[prost(uint32, tag = "9")]
    pub num_rx_dupe: u32,
    #[prost(uint32, tag = "10")]
    pub num_tx_relay: u32,
    #[prost(uint32, tag = "11")]
    pub num_tx_relay_canceled: u32,
    #[prost(uint32, tag = "12")]
    pub heap_total_bytes: u32,
    #[prost(uint32, tag = "13")]
    pub heap_free_bytes: u32,
    #[prost(uint32, tag = "14")]
    pub num_tx_dropped: u32,
    #[prost(int32, tag = "15")]
    pub noise_floor: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HealthMetrics {
    #[prost(uint32, optional, tag = "1")]
    pub heart_bpm: Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub sp_o2: Option<u32>,
    #[prost(float, optional, tag = "3")]
    pub temperature: Option<f32>,
}
