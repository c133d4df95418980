//! The flight controller state store.
//!
//! One owned aggregate. Decoders take it mutably, encoders borrow it; any
//! other mutation is an explicit caller edit followed by a SET request.

mod hardware;
mod identity;
mod peripherals;
mod power;
mod rx;
mod telemetry;
mod tuning;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use hardware::*;
pub use identity::*;
pub use peripherals::*;
pub use power::*;
pub use rx::*;
pub use telemetry::*;
pub use tuning::*;

use crate::version::ApiVersion;

/// A P/I/D triple for one axis.
pub type PidTerm = [u8; 3];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FcState {
    pub config: FcConfig,
    pub reboot: RebootStatus,

    pub sensors: SensorData,
    pub servo_data: Vec<u16>,
    pub motor_data: Vec<u16>,
    pub motor_output_order: Vec<u8>,
    pub motor_telemetry: Vec<MotorTelemetry>,
    pub rc: RcChannels,
    pub gps: GpsData,
    pub analog: Analog,
    pub voltage_meters: Vec<VoltageMeter>,
    pub current_meters: Vec<CurrentMeter>,
    pub battery_state: BatteryState,

    pub battery_config: BatteryConfig,
    pub voltage_meter_configs: Vec<VoltageMeterConfig>,
    pub current_meter_configs: Vec<CurrentMeterConfig>,
    pub legacy_current_meter: LegacyCurrentMeter,
    pub misc: Misc,

    pub rc_tuning: RcTuning,
    pub pids: Vec<PidTerm>,
    /// PID set last read from the device or acknowledged by it.
    pub pids_active: Vec<PidTerm>,
    pub pid_names: Vec<String>,
    pub pid_controller: u8,
    pub pid_advanced: PidAdvanced,
    pub pid_advanced_active: PidAdvanced,
    pub filter_config: FilterConfig,
    pub advanced_config: AdvancedConfig,
    pub copy_profile: CopyProfile,

    pub rx_config: RxConfig,
    pub rx_map: Vec<u8>,
    pub rssi_channel: u8,
    pub failsafe_config: FailsafeConfig,
    pub rxfail_config: Vec<RxFailChannel>,
    pub rc_deadband: RcDeadband,
    pub aux_names: Vec<String>,
    pub aux_ids: Vec<u8>,
    pub mode_ranges: Vec<ModeRange>,
    pub mode_ranges_extra: Vec<ModeRangeExtra>,
    pub adjustment_ranges: Vec<AdjustmentRange>,

    pub motor_config: MotorConfig,
    pub motor_3d_config: Motor3dConfig,
    pub mixer_config: MixerConfig,
    pub servo_configs: Vec<ServoConfig>,
    pub sensor_alignment: SensorAlignment,
    pub board_alignment: BoardAlignment,
    pub arming_config: ArmingConfig,
    pub sensor_config: SensorConfig,
    pub beeper_config: BeeperConfig,
    pub features: u32,
    pub loop_time: u16,
    pub accelerometer_trims: [i16; 2],
    pub gps_config: GpsConfig,
    pub gps_rescue: GpsRescue,

    pub serial_config: SerialConfig,
    pub led_strip: LedStrip,
    pub led_colors: Vec<LedColor>,
    pub led_mode_colors: Vec<LedModeColor>,
    pub dataflash: Dataflash,
    pub sdcard: SdCard,
    pub blackbox: Blackbox,
    pub transponder: Transponder,
    pub vtx_config: VtxConfig,
    pub vtx_table_band: VtxTableBand,
    pub vtx_table_power_level: VtxTablePowerLevel,
}

impl FcState {
    /// Negotiated API version; [`ApiVersion::UNKNOWN`] until `MSP_API_VERSION` is decoded.
    pub fn api_version(&self) -> ApiVersion {
        self.config.api_version
    }

    /// Snapshot of one config domain (a top-level field name) as JSON.
    pub fn domain(&self, name: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(name),
            _ => None,
        }
    }

    /// Names accepted by [`FcState::domain`].
    pub fn domain_names(&self) -> Vec<String> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_snapshot_by_field_name() {
        let mut state = FcState::default();
        state.board_alignment.yaw = -90;

        let value = state.domain("board_alignment").unwrap();
        assert_eq!(value["yaw"], -90);
        assert!(state.domain("no_such_domain").is_none());
    }

    #[test]
    fn domain_names_cover_records() {
        let names = FcState::default().domain_names();
        assert!(names.iter().any(|n| n == "rc_tuning"));
        assert!(names.iter().any(|n| n == "vtx_config"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let state: FcState =
            serde_json::from_str(r#"{"config":{"api_version":"1.41.0"},"features":5}"#).unwrap();
        assert_eq!(state.api_version(), ApiVersion::V1_41);
        assert_eq!(state.features, 5);
        assert!(state.mode_ranges.is_empty());
    }
}
