use serde::{Deserialize, Serialize};

/// Baud rate table indexed by the serial config baud fields.
pub const BAUD_RATES: [&str; 16] = [
    "AUTO", "9600", "19200", "38400", "57600", "115200", "230400", "250000", "400000", "460800",
    "500000", "921600", "1000000", "1500000", "2000000", "2470000",
];

/// Bit positions in a serial port function mask.
pub mod serial_function {
    pub const MSP: u32 = 0;
    pub const GPS: u32 = 1;
    pub const TELEMETRY_FRSKY: u32 = 2;
    pub const TELEMETRY_HOTT: u32 = 3;
    pub const TELEMETRY_LTM: u32 = 4;
    pub const TELEMETRY_SMARTPORT: u32 = 5;
    pub const RX_SERIAL: u32 = 6;
    pub const BLACKBOX: u32 = 7;
    pub const TELEMETRY_MAVLINK: u32 = 9;
    pub const ESC_SENSOR: u32 = 10;
    pub const TBS_SMARTAUDIO: u32 = 11;
    pub const TELEMETRY_IBUS: u32 = 12;
    pub const IRC_TRAMP: u32 = 13;
    pub const RUNCAM_DEVICE_CONTROL: u32 = 14;
    pub const LIDAR_TF: u32 = 15;
    pub const FRSKY_OSD: u32 = 16;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialPort {
    pub identifier: u8,
    /// Bitmask of `serial_function` bits.
    pub functions: u32,
    /// Indexes into [`BAUD_RATES`].
    pub msp_baudrate: u8,
    pub gps_baudrate: u8,
    pub telemetry_baudrate: u8,
    pub blackbox_baudrate: u8,
    /// Pre-1.6 firmware carried a single scenario id instead of a function mask.
    pub scenario: u8,
}

impl SerialPort {
    pub fn has_function(&self, bit: u32) -> bool {
        bit < 32 && self.functions & (1 << bit) != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub ports: Vec<SerialPort>,
    /// Global baud rates used before API 1.6.
    pub msp_baudrate: u32,
    pub cli_baudrate: u32,
    pub gps_baudrate: u32,
    pub gps_passthrough_baudrate: u32,
}

/// Direction letters for LED strip entries, by bit.
pub const LED_DIRECTION_LETTERS: [char; 6] = ['n', 'e', 's', 'w', 'u', 'd'];
/// Base function letters (API 1.20+), by function id.
pub const LED_BASE_FUNCTION_LETTERS: [char; 7] = ['c', 'f', 'a', 'l', 's', 'g', 'r'];
/// Overlay letters (API 1.36+), by overlay bit.
pub const LED_OVERLAY_LETTERS: [char; 6] = ['t', 'o', 'b', 'v', 'i', 'w'];
/// Overlay letters before API 1.36.
pub const LED_OVERLAY_LETTERS_LEGACY: [char; 6] = ['t', 'o', 'b', 'n', 'i', 'w'];
/// Function letters for the pre-1.20 16-bit function mask, by bit.
pub const LED_LEGACY_FUNCTION_LETTERS: [char; 11] =
    ['i', 'w', 'f', 'a', 't', 'r', 'c', 'g', 's', 'b', 'l'];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Led {
    pub directions: Vec<char>,
    pub functions: Vec<char>,
    pub x: u8,
    pub y: u8,
    pub color: u8,
    pub parameters: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedStrip {
    pub leds: Vec<Led>,
    /// Trailer present from API 1.41.
    pub profile_support: bool,
    pub current_profile: u8,
}

/// HSV colour slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedColor {
    pub h: u16,
    pub s: u8,
    pub v: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedModeColor {
    pub mode: u8,
    pub direction: u8,
    pub color: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataflash {
    pub ready: bool,
    pub supported: bool,
    pub sectors: u32,
    pub total_size: u32,
    pub used_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdCard {
    pub supported: bool,
    pub state: u8,
    pub filesystem_last_error: u8,
    pub free_size_kb: u32,
    pub total_size_kb: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blackbox {
    pub supported: bool,
    pub device: u8,
    pub rate_num: u8,
    pub rate_denom: u8,
    pub p_denom: u16,
    pub sample_rate: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransponderProvider {
    pub id: u8,
    pub data_length: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transponder {
    pub supported: bool,
    pub providers: Vec<TransponderProvider>,
    pub provider: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VtxConfig {
    pub device_type: u8,
    pub band: u8,
    pub channel: u8,
    pub power: u8,
    pub pit_mode: bool,
    pub frequency: u16,
    pub device_ready: bool,
    pub low_power_disarm: u8,
    pub pit_mode_frequency: u16,
    pub table_available: bool,
    pub table_bands: u8,
    pub table_channels: u8,
    pub table_powerlevels: u8,
    /// Host-side flag asking the device to wipe its table before refilling it.
    pub table_clear: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VtxTableBand {
    pub number: u8,
    pub name: String,
    pub letter: String,
    pub is_factory_band: bool,
    pub frequencies: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VtxTablePowerLevel {
    pub number: u8,
    pub value: u16,
    pub label: String,
}
