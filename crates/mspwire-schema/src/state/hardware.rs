use serde::{Deserialize, Serialize};

/// Motor output limits and DShot telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub minthrottle: u16,
    pub maxthrottle: u16,
    pub mincommand: u16,
    pub motor_count: u8,
    pub motor_poles: u8,
    pub use_dshot_telemetry: bool,
    pub use_esc_sensor: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Motor3dConfig {
    pub deadband3d_low: u16,
    pub deadband3d_high: u16,
    pub neutral: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    pub mixer: u8,
    pub reverse_motor_dir: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    pub min: u16,
    pub max: u16,
    pub middle: u16,
    pub rate: i8,
    pub angle_at_min: u8,
    pub angle_at_max: u8,
    /// `None` travels as 255.
    pub index_of_channel_to_forward: Option<u8>,
    pub reversed_input_sources: u32,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            min: 1000,
            max: 2000,
            middle: 1500,
            rate: 100,
            angle_at_min: 45,
            angle_at_max: 45,
            index_of_channel_to_forward: None,
            reversed_input_sources: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorAlignment {
    pub align_gyro: u8,
    pub align_acc: u8,
    pub align_mag: u8,
    pub gyro_detection_flags: u8,
    pub gyro_to_use: u8,
    pub gyro_1_align: u8,
    pub gyro_2_align: u8,
}

/// Board mounting offsets in degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardAlignment {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmingConfig {
    pub auto_disarm_delay: u8,
    pub disarm_kill_switch: u8,
    pub small_angle: u8,
}

/// Selected sensor hardware drivers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub acc_hardware: u8,
    pub baro_hardware: u8,
    pub mag_hardware: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeeperConfig {
    /// Disabled-beeper mask.
    pub beepers: u32,
    pub dshot_beacon_tone: u8,
    pub dshot_beacon_conditions: u32,
}

/// Grab bag carried by `MSP_MISC` that has no better home.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Misc {
    pub midrc: u16,
    pub failsafe_throttle: u16,
    pub gps_baudrate: u8,
    pub multiwiicurrentoutput: u8,
    pub placeholder2: u8,
    pub vbatscale: u8,
    pub vbatmincellvoltage: f64,
    pub vbatmaxcellvoltage: f64,
    pub vbatwarningcellvoltage: f64,
    pub batterymetertype: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    pub provider: u8,
    pub ublox_sbas: u8,
    pub auto_config: u8,
    pub auto_baud: u8,
    pub home_point_once: u8,
    pub ublox_use_galileo: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsRescue {
    pub angle: u16,
    pub initial_altitude_m: u16,
    pub descent_distance_m: u16,
    pub rescue_groundspeed: u16,
    pub throttle_min: u16,
    pub throttle_max: u16,
    pub throttle_hover: u16,
    pub sanity_checks: u8,
    pub min_sats: u8,
    pub ascend_rate: u16,
    pub descend_rate: u16,
    pub allow_arming_without_fix: u8,
    pub altitude_mode: u8,
}
