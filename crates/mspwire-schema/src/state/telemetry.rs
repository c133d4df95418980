use serde::{Deserialize, Serialize};

/// Live sensor readings in engineering units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorData {
    /// g
    pub accelerometer: [f64; 3],
    /// deg/s
    pub gyroscope: [f64; 3],
    /// gauss
    pub magnetometer: [f64; 3],
    /// roll, pitch (deg) and heading
    pub kinematics: [f64; 3],
    /// m
    pub altitude: f64,
    pub sonar: i32,
    pub debug: [i16; 4],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorTelemetry {
    pub rpm: u32,
    pub invalid_percent: u16,
    pub temperature: u8,
    pub voltage: u16,
    pub current: u16,
    pub consumption: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcChannels {
    pub active_channels: usize,
    pub channels: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatelliteInfo {
    pub channel: u8,
    pub svid: u8,
    pub quality: u8,
    pub cno: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsData {
    pub fix: u8,
    pub num_sat: u8,
    pub lat: i32,
    pub lon: i32,
    pub alt: u16,
    pub speed: u16,
    pub ground_course: u16,
    pub distance_to_home: u16,
    pub direction_to_home: u16,
    pub update: u8,
    pub satellites: Vec<SatelliteInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analog {
    /// V
    pub voltage: f64,
    pub mah_drawn: u16,
    pub rssi: u16,
    /// A
    pub amperage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoltageMeter {
    pub id: u8,
    pub voltage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentMeter {
    pub id: u8,
    pub mah_drawn: u16,
    pub amperage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryState {
    pub cell_count: u8,
    pub capacity: u16,
    pub voltage: f64,
    pub mah_drawn: u16,
    pub amperage: f64,
    pub battery_state: u8,
}
