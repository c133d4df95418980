use serde::{Deserialize, Serialize};

/// Battery thresholds and meter sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    pub vbat_min_cell_voltage: f64,
    pub vbat_max_cell_voltage: f64,
    pub vbat_warning_cell_voltage: f64,
    pub capacity: u16,
    pub voltage_meter_source: u8,
    pub current_meter_source: u8,
}

/// Per-meter voltage sensor configuration (API 1.36+).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoltageMeterConfig {
    pub id: u8,
    pub sensor_type: u8,
    pub vbatscale: u8,
    pub vbatresdivval: u8,
    pub vbatresdivmultiplier: u8,
}

/// Per-meter current sensor configuration (API 1.36+).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentMeterConfig {
    pub id: u8,
    pub sensor_type: u8,
    pub scale: i16,
    pub offset: i16,
}

/// Single current sensor layout used before per-meter configuration existed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyCurrentMeter {
    pub current_scale: i16,
    pub current_offset: i16,
    pub current_meter_type: u8,
    pub battery_capacity: u16,
}
