//! Per-code decoders and encoders.
//!
//! [`MspCode::codec`] is the single dispatch point: an exhaustive match that
//! pairs every code with the routine that parses its reply into [`FcState`]
//! and the routine that builds its request payload from it.

mod hardware;
mod identity;
mod peripherals;
mod power;
mod rx;
mod telemetry;
mod tuning;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::code::MspCode;
use crate::cursor::{FieldReader, FieldWriter};
use crate::error::Result;
use crate::state::FcState;
use crate::upload;

pub use identity::write_rtc;
pub use tuning::reorder_pwm_protocol;

pub(crate) use hardware::{encode_set_servo_configuration, write_servo_item};
pub(crate) use peripherals::{write_led_item, write_led_mode_color_item};
pub(crate) use power::{
    encode_set_current_meter_config, encode_set_voltage_meter_config, write_current_meter_item,
    write_voltage_meter_item,
};
pub(crate) use rx::{write_adjustment_range_item, write_mode_range_item, write_rxfail_item};

/// Parses a reply payload into the state store.
pub type DecodeFn = fn(&mut FieldReader<'_>, &mut FcState) -> Result<()>;
/// Builds a request payload from the state store.
pub type EncodeFn = fn(&mut FieldWriter, &FcState);

/// Decode/encode pair for one code.
///
/// `decode` is `None` for the structural codes the engine handles itself
/// (`MSP_MULTIPLE_MSP`, `MSP_DATAFLASH_READ`). `encode` is `None` when the
/// request carries no payload or the caller supplies it.
#[derive(Clone, Copy)]
pub struct Codec {
    pub decode: Option<DecodeFn>,
    pub encode: Option<EncodeFn>,
}

impl Codec {
    const fn read(decode: DecodeFn) -> Self {
        Self {
            decode: Some(decode),
            encode: None,
        }
    }

    const fn set(encode: EncodeFn) -> Self {
        Self {
            decode: Some(ack),
            encode: Some(encode),
        }
    }

    const fn pair(decode: DecodeFn, encode: EncodeFn) -> Self {
        Self {
            decode: Some(decode),
            encode: Some(encode),
        }
    }

    const ACK: Self = Self::read(ack);
    const PASSTHROUGH: Self = Self::read(passthrough);
    const STRUCTURAL: Self = Self {
        decode: None,
        encode: None,
    };
}

/// Reply to a command with no state behind it.
fn ack(r: &mut FieldReader<'_>, _: &mut FcState) -> Result<()> {
    let extra = r.rest().len();
    if extra > 0 {
        trace!(extra, "acknowledgement carried a payload");
    }
    Ok(())
}

/// Reply consumed only by request callbacks.
fn passthrough(r: &mut FieldReader<'_>, _: &mut FcState) -> Result<()> {
    let len = r.rest().len();
    trace!(len, "payload left to callbacks");
    Ok(())
}

impl MspCode {
    pub fn codec(self) -> Codec {
        use MspCode::*;

        match self {
            ApiVersion => Codec::read(identity::decode_api_version),
            FcVariant => Codec::read(identity::decode_fc_variant),
            FcVersion => Codec::read(identity::decode_fc_version),
            BoardInfo => Codec::read(identity::decode_board_info),
            BuildInfo => Codec::read(identity::decode_build_info),
            Name => Codec::read(identity::decode_name),
            SetName => Codec::set(identity::encode_set_name),
            Status => Codec::read(identity::decode_status),
            StatusEx => Codec::read(identity::decode_status_ex),
            Uid => Codec::read(identity::decode_uid),
            SetReboot => Codec::pair(identity::decode_reboot, identity::encode_set_reboot),
            ArmingDisable => Codec::set(identity::encode_arming_disable),
            SetRtc => Codec::set(identity::encode_set_rtc),

            RawImu => Codec::read(telemetry::decode_raw_imu),
            Servo => Codec::read(telemetry::decode_servo),
            Motor => Codec::read(telemetry::decode_motor),
            Rc => Codec::read(telemetry::decode_rc),
            RawGps => Codec::read(telemetry::decode_raw_gps),
            CompGps => Codec::read(telemetry::decode_comp_gps),
            GpsSvInfo => Codec::read(telemetry::decode_gps_sv_info),
            Attitude => Codec::read(telemetry::decode_attitude),
            Altitude => Codec::read(telemetry::decode_altitude),
            Sonar => Codec::read(telemetry::decode_sonar),
            Analog => Codec::read(telemetry::decode_analog),
            VoltageMeters => Codec::read(telemetry::decode_voltage_meters),
            CurrentMeters => Codec::read(telemetry::decode_current_meters),
            BatteryState => Codec::read(telemetry::decode_battery_state),
            MotorTelemetry => Codec::read(telemetry::decode_motor_telemetry),
            Debug => Codec::read(telemetry::decode_debug),
            MotorOutputReordering => Codec::read(telemetry::decode_motor_output_reordering),
            SetMotorOutputReordering => {
                Codec::set(telemetry::encode_set_motor_output_reordering)
            }

            BatteryConfig => Codec::read(power::decode_battery_config),
            SetBatteryConfig => Codec::set(power::encode_set_battery_config),
            VoltageMeterConfig => Codec::read(power::decode_voltage_meter_config),
            SetVoltageMeterConfig => Codec::set(power::encode_set_voltage_meter_config),
            CurrentMeterConfig => Codec::read(power::decode_current_meter_config),
            SetCurrentMeterConfig => Codec::set(power::encode_set_current_meter_config),

            RcTuning => Codec::read(tuning::decode_rc_tuning),
            SetRcTuning => Codec::set(tuning::encode_set_rc_tuning),
            Pid => Codec::read(tuning::decode_pid),
            SetPid => Codec::pair(tuning::ack_set_pid, tuning::encode_set_pid),
            PidController => Codec::read(tuning::decode_pid_controller),
            SetPidController => Codec::set(tuning::encode_set_pid_controller),
            PidAdvanced => Codec::read(tuning::decode_pid_advanced),
            SetPidAdvanced => {
                Codec::pair(tuning::ack_set_pid_advanced, tuning::encode_set_pid_advanced)
            }
            FilterConfig => Codec::read(tuning::decode_filter_config),
            SetFilterConfig => Codec::set(tuning::encode_set_filter_config),
            AdvancedConfig => Codec::read(tuning::decode_advanced_config),
            SetAdvancedConfig => Codec::set(tuning::encode_set_advanced_config),
            CopyProfile => Codec::set(tuning::encode_copy_profile),

            RxConfig => Codec::read(rx::decode_rx_config),
            SetRxConfig => Codec::set(rx::encode_set_rx_config),
            RxMap => Codec::read(rx::decode_rx_map),
            SetRxMap => Codec::set(rx::encode_set_rx_map),
            RssiConfig => Codec::read(rx::decode_rssi_config),
            SetRssiConfig => Codec::set(rx::encode_set_rssi_config),
            FailsafeConfig => Codec::read(rx::decode_failsafe_config),
            SetFailsafeConfig => Codec::set(rx::encode_set_failsafe_config),
            RxfailConfig => Codec::read(rx::decode_rxfail_config),
            RcDeadband => Codec::read(rx::decode_rc_deadband),
            SetRcDeadband => Codec::set(rx::encode_set_rc_deadband),
            ModeRanges => Codec::read(rx::decode_mode_ranges),
            ModeRangesExtra => Codec::read(rx::decode_mode_ranges_extra),
            AdjustmentRanges => Codec::read(rx::decode_adjustment_ranges),
            BoxNames => Codec::read(rx::decode_box_names),
            PidNames => Codec::read(rx::decode_pid_names),
            BoxIds => Codec::read(rx::decode_box_ids),

            MotorConfig => Codec::read(hardware::decode_motor_config),
            SetMotorConfig => Codec::set(hardware::encode_set_motor_config),
            Motor3dConfig => Codec::read(hardware::decode_motor_3d_config),
            SetMotor3dConfig => Codec::set(hardware::encode_set_motor_3d_config),
            MixerConfig => Codec::read(hardware::decode_mixer_config),
            SetMixerConfig => Codec::set(hardware::encode_set_mixer_config),
            ServoConfigurations => Codec::read(hardware::decode_servo_configurations),
            SetServoConfiguration => Codec::set(hardware::encode_set_servo_configuration),
            SensorAlignment => Codec::read(hardware::decode_sensor_alignment),
            SetSensorAlignment => Codec::set(hardware::encode_set_sensor_alignment),
            BoardAlignmentConfig => Codec::read(hardware::decode_board_alignment),
            SetBoardAlignmentConfig => Codec::set(hardware::encode_set_board_alignment),
            ArmingConfig => Codec::read(hardware::decode_arming_config),
            SetArmingConfig => Codec::set(hardware::encode_set_arming_config),
            SensorConfig => Codec::read(hardware::decode_sensor_config),
            SetSensorConfig => Codec::set(hardware::encode_set_sensor_config),
            BeeperConfig => Codec::read(hardware::decode_beeper_config),
            SetBeeperConfig => Codec::set(hardware::encode_set_beeper_config),
            FeatureConfig => Codec::read(hardware::decode_feature_config),
            SetFeatureConfig => Codec::set(hardware::encode_set_feature_config),
            LoopTime => Codec::read(hardware::decode_loop_time),
            SetLoopTime => Codec::set(hardware::encode_set_loop_time),
            AccTrim => Codec::read(hardware::decode_acc_trim),
            SetAccTrim => Codec::set(hardware::encode_set_acc_trim),
            Misc => Codec::read(hardware::decode_misc),
            SetMisc => Codec::set(hardware::encode_set_misc),
            GpsConfig => Codec::read(hardware::decode_gps_config),
            SetGpsConfig => Codec::set(hardware::encode_set_gps_config),
            GpsRescue => Codec::read(hardware::decode_gps_rescue),
            SetGpsRescue => Codec::set(hardware::encode_set_gps_rescue),

            CfSerialConfig => Codec::read(peripherals::decode_cf_serial_config),
            SetCfSerialConfig => Codec::set(peripherals::encode_set_cf_serial_config),
            CommonSerialConfig => Codec::read(peripherals::decode_common_serial_config),
            CommonSetSerialConfig => Codec::set(peripherals::encode_common_set_serial_config),
            LedStripConfig => Codec::read(peripherals::decode_led_strip_config),
            LedColors => Codec::read(peripherals::decode_led_colors),
            SetLedColors => Codec::set(peripherals::encode_set_led_colors),
            LedStripModeColor => Codec::read(peripherals::decode_led_strip_modecolor),
            DataflashSummary => Codec::read(peripherals::decode_dataflash_summary),
            SdcardSummary => Codec::read(peripherals::decode_sdcard_summary),
            BlackboxConfig => Codec::read(peripherals::decode_blackbox_config),
            SetBlackboxConfig => Codec::set(peripherals::encode_set_blackbox_config),
            TransponderConfig => Codec::read(peripherals::decode_transponder_config),
            SetTransponderConfig => Codec::set(peripherals::encode_set_transponder_config),
            VtxConfig => Codec::read(peripherals::decode_vtx_config),
            SetVtxConfig => Codec::set(peripherals::encode_set_vtx_config),
            VtxTableBand => Codec::read(peripherals::decode_vtxtable_band),
            SetVtxTableBand => Codec::set(peripherals::encode_set_vtxtable_band),
            VtxTablePowerLevel => Codec::read(peripherals::decode_vtxtable_powerlevel),
            SetVtxTablePowerLevel => Codec::set(peripherals::encode_set_vtxtable_powerlevel),

            // One frame per item, built by the upload sequencer.
            SetModeRange | SetAdjustmentRange | SetLedStripConfig | SetLedStripModeColor
            | SetRxfailConfig => Codec::ACK,

            // Payload supplied by the caller, or none at all.
            SetRawRc | SetMotor | SelectSetting | AccCalibration | MagCalibration | ResetConf
            | SetResetCurrPid | EepromWrite | DataflashErase | SetOsdConfig | OsdCharWrite => {
                Codec::ACK
            }

            OsdConfig | OsdCharRead | DisplayPort | ServoMixRules => Codec::PASSTHROUGH,

            MultipleMsp | DataflashRead => Codec::STRUCTURAL,
        }
    }
}

fn run_decoder(code: MspCode, r: &mut FieldReader<'_>, state: &mut FcState) -> Result<()> {
    match code.codec().decode {
        Some(decode) => decode(r, state),
        None => {
            debug!(%code, "structural code is not decoded into state");
            r.rest();
            Ok(())
        }
    }
}

/// Decode one reply, requiring the payload to be consumed exactly.
pub fn decode(code: MspCode, payload: &[u8], state: &mut FcState) -> Result<()> {
    let mut r = FieldReader::new(payload);
    run_decoder(code, &mut r, state)?;
    r.finish()
}

/// Decode one reply, returning how many trailing bytes were left unread.
///
/// Newer firmware may append fields this schema does not know yet.
pub fn decode_lenient(code: MspCode, payload: &[u8], state: &mut FcState) -> Result<usize> {
    let mut r = FieldReader::new(payload);
    run_decoder(code, &mut r, state)?;
    Ok(r.remaining())
}

/// Build the request payload for `code` from the current state.
///
/// `None` when the code has no encoder or, at this API version, is written
/// one item per frame by an upload sequence instead.
pub fn encode(code: MspCode, state: &FcState) -> Option<Bytes> {
    let encode = code.codec().encode?;
    if upload::is_sequenced(code, state.api_version()) {
        return None;
    }
    let mut w = FieldWriter::new();
    encode(&mut w, state);
    Some(w.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::version::ApiVersion;

    const BANDS: [ApiVersion; 7] = [
        ApiVersion::new(1, 5, 0),
        ApiVersion::V1_16,
        ApiVersion::V1_31,
        ApiVersion::V1_36,
        ApiVersion::V1_40,
        ApiVersion::V1_42,
        ApiVersion::V1_44,
    ];

    /// Query/set pairs whose layouts coincide at every version band.
    const SYMMETRIC: &[(MspCode, MspCode)] = &[
        (MspCode::Name, MspCode::SetName),
        (MspCode::BatteryConfig, MspCode::SetBatteryConfig),
        (MspCode::FeatureConfig, MspCode::SetFeatureConfig),
        (MspCode::BoardAlignmentConfig, MspCode::SetBoardAlignmentConfig),
        (MspCode::MixerConfig, MspCode::SetMixerConfig),
        (MspCode::RxConfig, MspCode::SetRxConfig),
        (MspCode::RssiConfig, MspCode::SetRssiConfig),
        (MspCode::CfSerialConfig, MspCode::SetCfSerialConfig),
        (MspCode::PidController, MspCode::SetPidController),
        (MspCode::ArmingConfig, MspCode::SetArmingConfig),
        (MspCode::RxMap, MspCode::SetRxMap),
        (MspCode::LoopTime, MspCode::SetLoopTime),
        (MspCode::FailsafeConfig, MspCode::SetFailsafeConfig),
        (MspCode::FilterConfig, MspCode::SetFilterConfig),
        (MspCode::PidAdvanced, MspCode::SetPidAdvanced),
        (MspCode::SensorConfig, MspCode::SetSensorConfig),
        (MspCode::RcTuning, MspCode::SetRcTuning),
        (MspCode::Pid, MspCode::SetPid),
        (MspCode::Misc, MspCode::SetMisc),
        (MspCode::Motor3dConfig, MspCode::SetMotor3dConfig),
        (MspCode::RcDeadband, MspCode::SetRcDeadband),
        (MspCode::GpsConfig, MspCode::SetGpsConfig),
        (MspCode::GpsRescue, MspCode::SetGpsRescue),
        (MspCode::AccTrim, MspCode::SetAccTrim),
        (MspCode::BeeperConfig, MspCode::SetBeeperConfig),
        (MspCode::LedColors, MspCode::SetLedColors),
        (MspCode::VtxTableBand, MspCode::SetVtxTableBand),
        (MspCode::VtxTablePowerLevel, MspCode::SetVtxTablePowerLevel),
        (MspCode::CommonSerialConfig, MspCode::CommonSetSerialConfig),
        (MspCode::MotorOutputReordering, MspCode::SetMotorOutputReordering),
    ];

    fn sample_state(version: ApiVersion) -> FcState {
        let mut s: FcState = serde_json::from_value(serde_json::json!({
            "config": { "name": "quad" },
            "features": 0x2000_0401u32,
            "board_alignment": { "roll": -5, "pitch": 2, "yaw": 180 },
            "pids": [[45, 80, 30], [47, 84, 32], [45, 80, 0]],
            "rx_map": [0, 1, 3, 2, 4, 5, 6, 7],
            "rssi_channel": 8,
            "loop_time": 125,
            "accelerometer_trims": [3, -2],
            "led_colors": [{ "h": 120, "s": 0, "v": 255 }, { "h": 0, "s": 255, "v": 255 }],
            "motor_output_order": [1, 0, 3, 2],
            "serial_config": { "ports": [{ "identifier": 20, "functions": 1, "msp_baudrate": 5 }] },
            "vtx_table_band": { "number": 1, "name": "RACE", "letter": "R", "frequencies": [5658, 5695] },
            "vtx_table_power_level": { "number": 1, "value": 25, "label": "25 " }
        }))
        .unwrap();
        s.config.api_version = version;
        s
    }

    #[test]
    fn symmetric_pairs_roundtrip_at_every_band() {
        for version in BANDS {
            let original = sample_state(version);
            let mut decoded = FcState::default();
            decoded.config.api_version = version;

            for &(query, set) in SYMMETRIC {
                // Empty set payload before 1.20, while the query still carries five fields.
                if set == MspCode::SetPidAdvanced && version.less_than(ApiVersion::V1_20) {
                    continue;
                }
                let payload = encode(set, &original)
                    .unwrap_or_else(|| panic!("{set} has no encoder at {version}"));
                decode(query, &payload, &mut decoded)
                    .unwrap_or_else(|e| panic!("{query} at {version}: {e}"));
            }

            for domain in [
                "features",
                "board_alignment",
                "pids",
                "rx_map",
                "loop_time",
                "accelerometer_trims",
                "led_colors",
                "motor_output_order",
                "vtx_table_band",
                "vtx_table_power_level",
            ] {
                assert_eq!(decoded.domain(domain), original.domain(domain), "{domain} at {version}");
            }
            assert_eq!(decoded.config.name, "quad");
        }
    }

    #[test]
    fn strict_decode_rejects_trailing_bytes() {
        let mut s = FcState::default();
        let err = decode(MspCode::LoopTime, &[0x7D, 0x00, 0xFF], &mut s).unwrap_err();
        assert_eq!(err, DecodeError::TrailingBytes { remaining: 1 });
        assert_eq!(s.loop_time, 125);

        let trailing = decode_lenient(MspCode::LoopTime, &[0xFA, 0x00, 0xFF, 0xFF], &mut s).unwrap();
        assert_eq!(trailing, 2);
        assert_eq!(s.loop_time, 250);
    }

    #[test]
    fn raw_imu_through_dispatch() {
        let payload: Vec<u8> = [512i16, 0, -512, 0, 0, 0, 1090, 0, 0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let mut s = FcState::default();
        decode(MspCode::RawImu, &payload, &mut s).unwrap();
        assert_eq!(s.sensors.accelerometer, [1.0, 0.0, -1.0]);
        assert_eq!(s.sensors.magnetometer[0], 1.0);
    }

    #[test]
    fn short_frame_is_malformed() {
        let mut s = FcState::default();
        let err = decode(MspCode::BoardAlignmentConfig, &[1, 0, 2], &mut s).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn query_codes_have_no_payload() {
        let s = FcState::default();
        assert!(encode(MspCode::RawImu, &s).is_none());
        assert!(encode(MspCode::ApiVersion, &s).is_none());
        assert!(encode(MspCode::EepromWrite, &s).is_none());
    }

    #[test]
    fn sequenced_codes_do_not_encode_as_one_frame() {
        let mut s = FcState::default();
        s.config.api_version = ApiVersion::V1_35;
        assert!(encode(MspCode::SetVoltageMeterConfig, &s).is_some());
        s.config.api_version = ApiVersion::V1_36;
        assert!(encode(MspCode::SetVoltageMeterConfig, &s).is_none());
        assert!(encode(MspCode::SetCurrentMeterConfig, &s).is_none());
        assert!(encode(MspCode::SetServoConfiguration, &s).is_none());
    }

    #[test]
    fn structural_codes_are_left_to_the_engine() {
        assert!(MspCode::MultipleMsp.codec().decode.is_none());
        assert!(MspCode::DataflashRead.codec().decode.is_none());
        let mut s = FcState::default();
        assert!(decode_lenient(MspCode::DataflashRead, &[1, 2, 3], &mut s).is_ok());
    }

    #[test]
    fn set_pid_ack_promotes_pending_values() {
        let mut s = sample_state(ApiVersion::V1_42);
        decode(MspCode::SetPid, &[], &mut s).unwrap();
        assert_eq!(s.pids_active, s.pids);
        s.pid_advanced.feedforward_yaw = 90;
        decode(MspCode::SetPidAdvanced, &[], &mut s).unwrap();
        assert_eq!(s.pid_advanced_active.feedforward_yaw, 90);
    }

    #[test]
    fn ladders_are_ordered_by_version() {
        use crate::ladder::is_ascending;

        assert!(is_ascending(identity::BOARD_INFO));
        assert!(is_ascending(identity::STATUS_EX));
        assert!(is_ascending(telemetry::ANALOG));
        assert!(is_ascending(telemetry::BATTERY_STATE));
        assert!(is_ascending(tuning::RC_TUNING));
        assert!(is_ascending(tuning::PID_ADVANCED));
        assert!(is_ascending(tuning::FILTER_CONFIG));
        assert!(is_ascending(tuning::ADVANCED_CONFIG));
        assert!(is_ascending(rx::RX_CONFIG));
        assert!(is_ascending(hardware::MOTOR_CONFIG));
        assert!(is_ascending(hardware::SENSOR_ALIGNMENT));
        assert!(is_ascending(hardware::GPS_CONFIG));
        assert!(is_ascending(hardware::GPS_RESCUE));
    }

    #[test]
    fn every_code_has_a_codec_entry() {
        let structural = MspCode::ALL
            .iter()
            .filter(|code| code.codec().decode.is_none())
            .count();
        assert_eq!(structural, 2);
    }
}
