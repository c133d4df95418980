//! MSP message codes.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! msp_codes {
    ($($name:ident = $value:literal => $wire:literal,)*) => {
        /// Every message code this crate knows how to frame.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum MspCode {
            $($name,)*
        }

        impl MspCode {
            /// All codes in wire order.
            pub const ALL: &'static [MspCode] = &[$(MspCode::$name,)*];

            /// Numeric wire value.
            pub const fn value(self) -> u16 {
                match self {
                    $(MspCode::$name => $value,)*
                }
            }

            /// Look up a code by wire value.
            pub const fn from_value(value: u16) -> Option<Self> {
                match value {
                    $($value => Some(MspCode::$name),)*
                    _ => None,
                }
            }

            /// Conventional firmware name, e.g. `MSP_RAW_IMU`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(MspCode::$name => $wire,)*
                }
            }

            /// Look up a code by its firmware name, with or without the `MSP_` prefix.
            pub fn from_name(name: &str) -> Option<Self> {
                let upper = name.trim().to_ascii_uppercase();
                Self::ALL.iter().copied().find(|code| {
                    let wire = code.name();
                    wire == upper
                        || wire.strip_prefix("MSP_") == Some(upper.as_str())
                        || wire.strip_prefix("MSP2_") == Some(upper.as_str())
                })
            }
        }
    };
}

msp_codes! {
    ApiVersion = 1 => "MSP_API_VERSION",
    FcVariant = 2 => "MSP_FC_VARIANT",
    FcVersion = 3 => "MSP_FC_VERSION",
    BoardInfo = 4 => "MSP_BOARD_INFO",
    BuildInfo = 5 => "MSP_BUILD_INFO",
    Name = 10 => "MSP_NAME",
    SetName = 11 => "MSP_SET_NAME",
    BatteryConfig = 32 => "MSP_BATTERY_CONFIG",
    SetBatteryConfig = 33 => "MSP_SET_BATTERY_CONFIG",
    ModeRanges = 34 => "MSP_MODE_RANGES",
    SetModeRange = 35 => "MSP_SET_MODE_RANGE",
    FeatureConfig = 36 => "MSP_FEATURE_CONFIG",
    SetFeatureConfig = 37 => "MSP_SET_FEATURE_CONFIG",
    BoardAlignmentConfig = 38 => "MSP_BOARD_ALIGNMENT_CONFIG",
    SetBoardAlignmentConfig = 39 => "MSP_SET_BOARD_ALIGNMENT_CONFIG",
    CurrentMeterConfig = 40 => "MSP_CURRENT_METER_CONFIG",
    SetCurrentMeterConfig = 41 => "MSP_SET_CURRENT_METER_CONFIG",
    MixerConfig = 42 => "MSP_MIXER_CONFIG",
    SetMixerConfig = 43 => "MSP_SET_MIXER_CONFIG",
    RxConfig = 44 => "MSP_RX_CONFIG",
    SetRxConfig = 45 => "MSP_SET_RX_CONFIG",
    LedColors = 46 => "MSP_LED_COLORS",
    SetLedColors = 47 => "MSP_SET_LED_COLORS",
    LedStripConfig = 48 => "MSP_LED_STRIP_CONFIG",
    SetLedStripConfig = 49 => "MSP_SET_LED_STRIP_CONFIG",
    RssiConfig = 50 => "MSP_RSSI_CONFIG",
    SetRssiConfig = 51 => "MSP_SET_RSSI_CONFIG",
    AdjustmentRanges = 52 => "MSP_ADJUSTMENT_RANGES",
    SetAdjustmentRange = 53 => "MSP_SET_ADJUSTMENT_RANGE",
    CfSerialConfig = 54 => "MSP_CF_SERIAL_CONFIG",
    SetCfSerialConfig = 55 => "MSP_SET_CF_SERIAL_CONFIG",
    VoltageMeterConfig = 56 => "MSP_VOLTAGE_METER_CONFIG",
    SetVoltageMeterConfig = 57 => "MSP_SET_VOLTAGE_METER_CONFIG",
    Sonar = 58 => "MSP_SONAR",
    PidController = 59 => "MSP_PID_CONTROLLER",
    SetPidController = 60 => "MSP_SET_PID_CONTROLLER",
    ArmingConfig = 61 => "MSP_ARMING_CONFIG",
    SetArmingConfig = 62 => "MSP_SET_ARMING_CONFIG",
    RxMap = 64 => "MSP_RX_MAP",
    SetRxMap = 65 => "MSP_SET_RX_MAP",
    SetReboot = 68 => "MSP_SET_REBOOT",
    DataflashSummary = 70 => "MSP_DATAFLASH_SUMMARY",
    DataflashRead = 71 => "MSP_DATAFLASH_READ",
    DataflashErase = 72 => "MSP_DATAFLASH_ERASE",
    LoopTime = 73 => "MSP_LOOP_TIME",
    SetLoopTime = 74 => "MSP_SET_LOOP_TIME",
    FailsafeConfig = 75 => "MSP_FAILSAFE_CONFIG",
    SetFailsafeConfig = 76 => "MSP_SET_FAILSAFE_CONFIG",
    RxfailConfig = 77 => "MSP_RXFAIL_CONFIG",
    SetRxfailConfig = 78 => "MSP_SET_RXFAIL_CONFIG",
    SdcardSummary = 79 => "MSP_SDCARD_SUMMARY",
    BlackboxConfig = 80 => "MSP_BLACKBOX_CONFIG",
    SetBlackboxConfig = 81 => "MSP_SET_BLACKBOX_CONFIG",
    TransponderConfig = 82 => "MSP_TRANSPONDER_CONFIG",
    SetTransponderConfig = 83 => "MSP_SET_TRANSPONDER_CONFIG",
    OsdConfig = 84 => "MSP_OSD_CONFIG",
    SetOsdConfig = 85 => "MSP_SET_OSD_CONFIG",
    OsdCharRead = 86 => "MSP_OSD_CHAR_READ",
    OsdCharWrite = 87 => "MSP_OSD_CHAR_WRITE",
    VtxConfig = 88 => "MSP_VTX_CONFIG",
    SetVtxConfig = 89 => "MSP_SET_VTX_CONFIG",
    AdvancedConfig = 90 => "MSP_ADVANCED_CONFIG",
    SetAdvancedConfig = 91 => "MSP_SET_ADVANCED_CONFIG",
    FilterConfig = 92 => "MSP_FILTER_CONFIG",
    SetFilterConfig = 93 => "MSP_SET_FILTER_CONFIG",
    PidAdvanced = 94 => "MSP_PID_ADVANCED",
    SetPidAdvanced = 95 => "MSP_SET_PID_ADVANCED",
    SensorConfig = 96 => "MSP_SENSOR_CONFIG",
    SetSensorConfig = 97 => "MSP_SET_SENSOR_CONFIG",
    ArmingDisable = 99 => "MSP_ARMING_DISABLE",
    Status = 101 => "MSP_STATUS",
    RawImu = 102 => "MSP_RAW_IMU",
    Servo = 103 => "MSP_SERVO",
    Motor = 104 => "MSP_MOTOR",
    Rc = 105 => "MSP_RC",
    RawGps = 106 => "MSP_RAW_GPS",
    CompGps = 107 => "MSP_COMP_GPS",
    Attitude = 108 => "MSP_ATTITUDE",
    Altitude = 109 => "MSP_ALTITUDE",
    Analog = 110 => "MSP_ANALOG",
    RcTuning = 111 => "MSP_RC_TUNING",
    Pid = 112 => "MSP_PID",
    Misc = 114 => "MSP_MISC",
    BoxNames = 116 => "MSP_BOXNAMES",
    PidNames = 117 => "MSP_PIDNAMES",
    BoxIds = 119 => "MSP_BOXIDS",
    ServoConfigurations = 120 => "MSP_SERVO_CONFIGURATIONS",
    Motor3dConfig = 124 => "MSP_MOTOR_3D_CONFIG",
    RcDeadband = 125 => "MSP_RC_DEADBAND",
    SensorAlignment = 126 => "MSP_SENSOR_ALIGNMENT",
    LedStripModeColor = 127 => "MSP_LED_STRIP_MODECOLOR",
    VoltageMeters = 128 => "MSP_VOLTAGE_METERS",
    CurrentMeters = 129 => "MSP_CURRENT_METERS",
    BatteryState = 130 => "MSP_BATTERY_STATE",
    MotorConfig = 131 => "MSP_MOTOR_CONFIG",
    GpsConfig = 132 => "MSP_GPS_CONFIG",
    GpsRescue = 135 => "MSP_GPS_RESCUE",
    VtxTableBand = 137 => "MSP_VTXTABLE_BAND",
    VtxTablePowerLevel = 138 => "MSP_VTXTABLE_POWERLEVEL",
    MotorTelemetry = 139 => "MSP_MOTOR_TELEMETRY",
    StatusEx = 150 => "MSP_STATUS_EX",
    Uid = 160 => "MSP_UID",
    GpsSvInfo = 164 => "MSP_GPSSVINFO",
    DisplayPort = 182 => "MSP_DISPLAYPORT",
    CopyProfile = 183 => "MSP_COPY_PROFILE",
    BeeperConfig = 184 => "MSP_BEEPER_CONFIG",
    SetBeeperConfig = 185 => "MSP_SET_BEEPER_CONFIG",
    SetRawRc = 200 => "MSP_SET_RAW_RC",
    SetPid = 202 => "MSP_SET_PID",
    SetRcTuning = 204 => "MSP_SET_RC_TUNING",
    AccCalibration = 205 => "MSP_ACC_CALIBRATION",
    MagCalibration = 206 => "MSP_MAG_CALIBRATION",
    SetMisc = 207 => "MSP_SET_MISC",
    ResetConf = 208 => "MSP_RESET_CONF",
    SelectSetting = 210 => "MSP_SELECT_SETTING",
    SetServoConfiguration = 212 => "MSP_SET_SERVO_CONFIGURATION",
    SetMotor = 214 => "MSP_SET_MOTOR",
    SetMotor3dConfig = 217 => "MSP_SET_MOTOR_3D_CONFIG",
    SetRcDeadband = 218 => "MSP_SET_RC_DEADBAND",
    SetResetCurrPid = 219 => "MSP_SET_RESET_CURR_PID",
    SetSensorAlignment = 220 => "MSP_SET_SENSOR_ALIGNMENT",
    SetLedStripModeColor = 221 => "MSP_SET_LED_STRIP_MODECOLOR",
    SetMotorConfig = 222 => "MSP_SET_MOTOR_CONFIG",
    SetGpsConfig = 223 => "MSP_SET_GPS_CONFIG",
    SetGpsRescue = 225 => "MSP_SET_GPS_RESCUE",
    SetVtxTableBand = 227 => "MSP_SET_VTXTABLE_BAND",
    SetVtxTablePowerLevel = 228 => "MSP_SET_VTXTABLE_POWERLEVEL",
    MultipleMsp = 230 => "MSP_MULTIPLE_MSP",
    ModeRangesExtra = 238 => "MSP_MODE_RANGES_EXTRA",
    SetAccTrim = 239 => "MSP_SET_ACC_TRIM",
    AccTrim = 240 => "MSP_ACC_TRIM",
    ServoMixRules = 241 => "MSP_SERVO_MIX_RULES",
    SetRtc = 246 => "MSP_SET_RTC",
    EepromWrite = 250 => "MSP_EEPROM_WRITE",
    Debug = 254 => "MSP_DEBUG",
    CommonSerialConfig = 0x1009 => "MSP2_COMMON_SERIAL_CONFIG",
    CommonSetSerialConfig = 0x100A => "MSP2_COMMON_SET_SERIAL_CONFIG",
    MotorOutputReordering = 0x3001 => "MSP2_MOTOR_OUTPUT_REORDERING",
    SetMotorOutputReordering = 0x3002 => "MSP2_SET_MOTOR_OUTPUT_REORDERING",
}

impl MspCode {
    /// Whether the code fits the one-byte code field used by v1 framing and batching.
    pub fn fits_v1(self) -> bool {
        self.value() <= 254
    }
}

impl fmt::Display for MspCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u16> for MspCode {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, u16> {
        Self::from_value(value).ok_or(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn wire_values_are_unique() {
        let values: HashSet<u16> = MspCode::ALL.iter().map(|c| c.value()).collect();
        assert_eq!(values.len(), MspCode::ALL.len());
    }

    #[test]
    fn value_lookup_roundtrip() {
        for &code in MspCode::ALL {
            assert_eq!(MspCode::from_value(code.value()), Some(code));
        }
        assert_eq!(MspCode::from_value(9999), None);
    }

    #[test]
    fn name_lookup_accepts_short_forms() {
        assert_eq!(MspCode::from_name("MSP_RAW_IMU"), Some(MspCode::RawImu));
        assert_eq!(MspCode::from_name("raw_imu"), Some(MspCode::RawImu));
        assert_eq!(
            MspCode::from_name("common_serial_config"),
            Some(MspCode::CommonSerialConfig)
        );
        assert_eq!(MspCode::from_name("nope"), None);
    }

    #[test]
    fn well_known_values() {
        assert_eq!(MspCode::ApiVersion.value(), 1);
        assert_eq!(MspCode::RawImu.value(), 102);
        assert_eq!(MspCode::MultipleMsp.value(), 230);
        assert!(!MspCode::MotorOutputReordering.fits_v1());
        assert_eq!(MspCode::try_from(108u16), Ok(MspCode::Attitude));
    }
}
