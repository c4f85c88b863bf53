//! Telemetry payloads
//!
//! Converts decoded telemetry protobufs into compact report records:
//! zero-valued fields are dropped and floats are rounded to a precision that
//! matches the sensor class.
//!
//! ## Telemetry Types
//!
//! - **Device**: Battery level, voltage, channel utilization, uptime
//! - **Environment**: Temperature, humidity, pressure, light, wind, rain, soil
//! - **Power**: Up to eight voltage/current channels (INA219/INA3221)
//! - **AirQuality**: Particulate matter and CO2 counts
//! - **LocalStats**: The reporting node's own radio counters
//! - **Health**: Heart rate, SpO2, body temperature
//!
//! ## Example
//!
//! ```rust
//! use meshscope_core::proto;
//! use meshscope_core::telemetry::{Telemetry, TelemetryVariant};
//!
//! let raw = proto::Telemetry {
//!     time: 0,
//!     variant: Some(proto::telemetry::Variant::DeviceMetrics(proto::DeviceMetrics {
//!         battery_level: Some(85),
//!         voltage: Some(4.1),
//!         ..Default::default()
//!     })),
//! };
//!
//! let telemetry = Telemetry::from_proto(&raw);
//! assert!(matches!(telemetry.variant, TelemetryVariant::Device(_)));
//! ```

use serde::Serialize;

use crate::proto;

/// Round to a fixed number of decimal places
pub fn round_to(value: f32, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (f64::from(value) * scale).round() / scale
}

fn float(value: Option<f32>, places: i32) -> Option<f64> {
    value.filter(|v| *v != 0.0).map(|v| round_to(v, places))
}

fn count(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v != 0)
}

fn nonzero(value: u32) -> Option<u32> {
    (value != 0).then_some(value)
}

/// Device metrics telemetry
///
/// Reports battery status, radio utilization, and uptime.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceMetrics {
    /// Battery level (0-100%, 101 when externally powered)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u32>,
    /// Battery/supply voltage in volts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    /// Channel utilization percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_utilization: Option<f64>,
    /// TX airtime utilization percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_util_tx: Option<f64>,
    /// Uptime in seconds since boot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u32>,
}

impl DeviceMetrics {
    fn from_proto(m: &proto::DeviceMetrics) -> Self {
        Self {
            battery_level: count(m.battery_level),
            voltage: float(m.voltage, 2),
            channel_utilization: float(m.channel_utilization, 2),
            air_util_tx: float(m.air_util_tx, 2),
            uptime_seconds: count(m.uptime_seconds),
        }
    }
}

/// Environment sensor metrics
///
/// Data from environmental sensors (BME280, BME680, SHT31, weather stations, etc.)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentMetrics {
    /// Temperature in Celsius
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Relative humidity (0-100%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_humidity: Option<f64>,
    /// Barometric pressure in hPa
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barometric_pressure: Option<f64>,
    /// Gas resistance in MOhm (BME680)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_resistance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    /// Indoor Air Quality index (BME680)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iaq: Option<u32>,
    /// Distance in millimeters (ultrasonic/lidar sensors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lux: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_lux: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ir_lux: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv_lux: Option<f64>,
    /// Wind direction in degrees (0-360)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<u32>,
    /// Wind speed in m/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_lull: Option<f64>,
    /// Weight in kg
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Radiation in µR/h
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radiation: Option<f64>,
    /// Rainfall in mm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall_1h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall_24h: Option<f64>,
    /// Soil moisture percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_temperature: Option<f64>,
}

impl EnvironmentMetrics {
    fn from_proto(m: &proto::EnvironmentMetrics) -> Self {
        Self {
            temperature: float(m.temperature, 1),
            relative_humidity: float(m.relative_humidity, 1),
            barometric_pressure: float(m.barometric_pressure, 2),
            gas_resistance: float(m.gas_resistance, 2),
            voltage: float(m.voltage, 2),
            current: float(m.current, 2),
            iaq: count(m.iaq),
            distance: float(m.distance, 2),
            lux: float(m.lux, 1),
            white_lux: float(m.white_lux, 1),
            ir_lux: float(m.ir_lux, 1),
            uv_lux: float(m.uv_lux, 1),
            wind_direction: count(m.wind_direction),
            wind_speed: float(m.wind_speed, 1),
            wind_gust: float(m.wind_gust, 1),
            wind_lull: float(m.wind_lull, 1),
            weight: float(m.weight, 2),
            radiation: float(m.radiation, 2),
            rainfall_1h: float(m.rainfall_1h, 2),
            rainfall_24h: float(m.rainfall_24h, 2),
            soil_moisture: count(m.soil_moisture),
            soil_temperature: float(m.soil_temperature, 1),
        }
    }
}

/// Power channel measurement
///
/// Single channel from a power monitoring IC (INA219/INA3221)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PowerChannel {
    /// Channel number (1-8)
    pub ch: u8,
    /// Voltage in volts
    pub voltage: f64,
    /// Current in milliamps
    pub current: f64,
}

impl PowerChannel {
    /// Calculate power in milliwatts
    pub fn power_mw(&self) -> f64 {
        self.voltage * self.current
    }
}

/// Multi-channel power metrics; only channels with a nonzero reading are kept
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PowerMetrics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<PowerChannel>,
}

impl PowerMetrics {
    fn from_proto(m: &proto::PowerMetrics) -> Self {
        let channels = m
            .channels()
            .iter()
            .zip(1u8..)
            .filter_map(|(&(voltage, current), ch)| {
                let voltage = voltage.unwrap_or(0.0);
                let current = current.unwrap_or(0.0);
                (voltage != 0.0 || current != 0.0).then(|| PowerChannel {
                    ch,
                    voltage: round_to(voltage, 3),
                    current: round_to(current, 3),
                })
            })
            .collect();
        Self { channels }
    }

    /// Total power across all channels in milliwatts
    pub fn total_power_mw(&self) -> f64 {
        self.channels.iter().map(PowerChannel::power_mw).sum()
    }
}

/// Particulate and CO2 counts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AirQualityMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm10_standard: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm25_standard: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm100_standard: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm10_environmental: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm25_environmental: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm100_environmental: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles_03um: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles_05um: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles_10um: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles_25um: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles_50um: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles_100um: Option<u32>,
}

impl AirQualityMetrics {
    fn from_proto(m: &proto::AirQualityMetrics) -> Self {
        Self {
            pm10_standard: count(m.pm10_standard),
            pm25_standard: count(m.pm25_standard),
            pm100_standard: count(m.pm100_standard),
            pm10_environmental: count(m.pm10_environmental),
            pm25_environmental: count(m.pm25_environmental),
            pm100_environmental: count(m.pm100_environmental),
            co2: count(m.co2),
            particles_03um: count(m.particles_03um),
            particles_05um: count(m.particles_05um),
            particles_10um: count(m.particles_10um),
            particles_25um: count(m.particles_25um),
            particles_50um: count(m.particles_50um),
            particles_100um: count(m.particles_100um),
        }
    }
}

/// Radio statistics of the reporting node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_utilization: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_util_tx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_packets_tx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_packets_rx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_packets_rx_bad: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_online_nodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_total_nodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_rx_dupe: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_tx_relay: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_tx_relay_canceled: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heap_total_bytes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heap_free_bytes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_tx_dropped: Option<u32>,
    /// Noise floor in dBm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_floor: Option<i32>,
}

impl LocalStats {
    fn from_proto(m: &proto::LocalStats) -> Self {
        Self {
            uptime_seconds: nonzero(m.uptime_seconds),
            channel_utilization: float(Some(m.channel_utilization), 2),
            air_util_tx: float(Some(m.air_util_tx), 2),
            num_packets_tx: nonzero(m.num_packets_tx),
            num_packets_rx: nonzero(m.num_packets_rx),
            num_packets_rx_bad: nonzero(m.num_packets_rx_bad),
            num_online_nodes: nonzero(m.num_online_nodes),
            num_total_nodes: nonzero(m.num_total_nodes),
            num_rx_dupe: nonzero(m.num_rx_dupe),
            num_tx_relay: nonzero(m.num_tx_relay),
            num_tx_relay_canceled: nonzero(m.num_tx_relay_canceled),
            heap_total_bytes: nonzero(m.heap_total_bytes),
            heap_free_bytes: nonzero(m.heap_free_bytes),
            num_tx_dropped: nonzero(m.num_tx_dropped),
            noise_floor: (m.noise_floor != 0).then_some(m.noise_floor),
        }
    }
}

/// Health sensor metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_bpm: Option<u32>,
    #[serde(rename = "spO2", skip_serializing_if = "Option::is_none")]
    pub sp_o2: Option<u32>,
    /// Body temperature in Celsius
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl HealthMetrics {
    fn from_proto(m: &proto::HealthMetrics) -> Self {
        Self {
            heart_bpm: count(m.heart_bpm),
            sp_o2: count(m.sp_o2),
            temperature: float(m.temperature, 1),
        }
    }
}

/// Telemetry variant types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "telemetry_type", rename_all = "snake_case")]
pub enum TelemetryVariant {
    Device(DeviceMetrics),
    Environment(EnvironmentMetrics),
    Power(PowerMetrics),
    AirQuality(AirQualityMetrics),
    LocalStats(LocalStats),
    Health(HealthMetrics),
    /// No known sub-kind was present; carries the decoded structure's debug form
    Unknown { raw: String },
}

/// Complete telemetry report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    /// Sender's timestamp (seconds since Unix epoch), when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u32>,
    #[serde(flatten)]
    pub variant: TelemetryVariant,
}

impl Telemetry {
    /// Build a report from a decoded protobuf
    pub fn from_proto(raw: &proto::Telemetry) -> Self {
        use proto::telemetry::Variant;

        let variant = match &raw.variant {
            Some(Variant::DeviceMetrics(m)) => TelemetryVariant::Device(DeviceMetrics::from_proto(m)),
            Some(Variant::EnvironmentMetrics(m)) => {
                TelemetryVariant::Environment(EnvironmentMetrics::from_proto(m))
            }
            Some(Variant::PowerMetrics(m)) => TelemetryVariant::Power(PowerMetrics::from_proto(m)),
            Some(Variant::AirQualityMetrics(m)) => {
                TelemetryVariant::AirQuality(AirQualityMetrics::from_proto(m))
            }
            Some(Variant::LocalStats(m)) => TelemetryVariant::LocalStats(LocalStats::from_proto(m)),
            Some(Variant::HealthMetrics(m)) => TelemetryVariant::Health(HealthMetrics::from_proto(m)),
            None => TelemetryVariant::Unknown {
                raw: format!("{:?}", raw),
            },
        };

        Self {
            time: nonzero(raw.time),
            variant,
        }
    }

    /// Get device metrics if this is a device report
    pub fn as_device(&self) -> Option<&DeviceMetrics> {
        match &self.variant {
            TelemetryVariant::Device(m) => Some(m),
            _ => None,
        }
    }

    /// Get environment metrics if this is an environment report
    pub fn as_environment(&self) -> Option<&EnvironmentMetrics> {
        match &self.variant {
            TelemetryVariant::Environment(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::telemetry::Variant;
    use serde_json::json;

    fn report(time: u32, variant: Variant) -> Telemetry {
        Telemetry::from_proto(&proto::Telemetry {
            time,
            variant: Some(variant),
        })
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(4.1, 2), 4.1);
        assert_eq!(round_to(21.456, 1), 21.5);
        assert_eq!(round_to(0.12345, 3), 0.123);
    }

    #[test]
    fn test_device_metrics() {
        let t = report(
            1_700_000_000,
            Variant::DeviceMetrics(proto::DeviceMetrics {
                battery_level: Some(85),
                voltage: Some(4.1234),
                channel_utilization: Some(0.0),
                air_util_tx: None,
                uptime_seconds: Some(3600),
            }),
        );
        let dm = t.as_device().unwrap();
        assert_eq!(dm.voltage, Some(4.12));
        assert_eq!(dm.channel_utilization, None);
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            json!({
                "time": 1_700_000_000,
                "telemetry_type": "device",
                "battery_level": 85,
                "voltage": 4.12,
                "uptime_seconds": 3600,
            })
        );
    }

    #[test]
    fn test_environment_precision() {
        let t = report(
            0,
            Variant::EnvironmentMetrics(proto::EnvironmentMetrics {
                temperature: Some(22.46),
                relative_humidity: Some(55.55),
                barometric_pressure: Some(1013.256),
                lux: Some(120.04),
                wind_speed: Some(3.27),
                soil_temperature: Some(14.04),
                iaq: Some(0),
                ..Default::default()
            }),
        );
        let em = t.as_environment().unwrap();
        assert_eq!(em.temperature, Some(22.5));
        assert_eq!(em.barometric_pressure, Some(1013.26));
        assert_eq!(em.lux, Some(120.0));
        assert_eq!(em.wind_speed, Some(3.3));
        assert_eq!(em.soil_temperature, Some(14.0));
        assert_eq!(em.iaq, None);

        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["telemetry_type"], "environment");
        assert!(value.get("time").is_none());
        assert!(value.get("iaq").is_none());
    }

    #[test]
    fn test_power_channels() {
        let t = report(
            0,
            Variant::PowerMetrics(proto::PowerMetrics {
                ch1_voltage: Some(12.34567),
                ch1_current: Some(150.0),
                ch3_current: Some(0.5),
                ch4_voltage: Some(0.0),
                ..Default::default()
            }),
        );
        let TelemetryVariant::Power(pm) = &t.variant else {
            panic!("expected power metrics");
        };
        assert_eq!(pm.channels.len(), 2);
        assert_eq!(pm.channels[0], PowerChannel { ch: 1, voltage: 12.346, current: 150.0 });
        assert_eq!(pm.channels[1], PowerChannel { ch: 3, voltage: 0.0, current: 0.5 });
        assert!((pm.total_power_mw() - 1851.9).abs() < 1e-6);
    }

    #[test]
    fn test_empty_power_omits_channels() {
        let t = report(0, Variant::PowerMetrics(proto::PowerMetrics::default()));
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            json!({ "telemetry_type": "power" })
        );
    }

    #[test]
    fn test_local_stats_and_health() {
        let t = report(
            0,
            Variant::LocalStats(proto::LocalStats {
                uptime_seconds: 10,
                channel_utilization: 12.345,
                num_packets_rx: 99,
                noise_floor: -110,
                ..Default::default()
            }),
        );
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["telemetry_type"], "local_stats");
        assert_eq!(value["channel_utilization"], 12.35);
        assert_eq!(value["noise_floor"], -110);
        assert!(value.get("num_packets_tx").is_none());

        let t = report(
            0,
            Variant::HealthMetrics(proto::HealthMetrics {
                heart_bpm: Some(72),
                sp_o2: Some(98),
                temperature: Some(36.66),
            }),
        );
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            json!({ "telemetry_type": "health", "heart_bpm": 72, "spO2": 98, "temperature": 36.7 })
        );
    }

    #[test]
    fn test_air_quality() {
        let t = report(
            0,
            Variant::AirQualityMetrics(proto::AirQualityMetrics {
                pm25_standard: Some(12),
                co2: Some(415),
                ..Default::default()
            }),
        );
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            json!({ "telemetry_type": "air_quality", "pm25_standard": 12, "co2": 415 })
        );
    }

    #[test]
    fn test_unknown_variant() {
        let t = Telemetry::from_proto(&proto::Telemetry {
            time: 5,
            variant: None,
        });
        let TelemetryVariant::Unknown { raw } = &t.variant else {
            panic!("expected unknown telemetry");
        };
        assert!(raw.contains("time: 5"));
        assert_eq!(serde_json::to_value(&t).unwrap()["telemetry_type"], "unknown");
    }
}
