use serde::{Deserialize, Serialize};

/// Receiver protocol, stick calibration and RC smoothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RxConfig {
    pub serialrx_provider: u8,
    pub stick_max: u16,
    pub stick_center: u16,
    pub stick_min: u16,
    pub spektrum_sat_bind: u8,
    pub rx_min_usec: u16,
    pub rx_max_usec: u16,
    pub rc_interpolation: u8,
    pub rc_interpolation_interval: u8,
    pub air_mode_activate_threshold: u16,
    pub rx_spi_protocol: u8,
    pub rx_spi_id: u32,
    pub rx_spi_rf_channel_count: u8,
    pub fpv_cam_angle_degrees: u8,
    pub rc_interpolation_channels: u8,
    pub rc_smoothing_type: u8,
    pub rc_smoothing_input_cutoff: u8,
    pub rc_smoothing_derivative_cutoff: u8,
    pub rc_smoothing_input_type: u8,
    pub rc_smoothing_derivative_type: u8,
    pub usb_cdc_hid_type: u8,
    pub rc_smoothing_auto_smoothness: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailsafeConfig {
    pub failsafe_delay: u8,
    pub failsafe_off_delay: u8,
    pub failsafe_throttle: u16,
    pub failsafe_switch_mode: u8,
    pub failsafe_throttle_low_delay: u16,
    pub failsafe_procedure: u8,
}

/// Per-channel behaviour when the receiver signal is lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RxFailChannel {
    pub mode: u8,
    pub value: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcDeadband {
    pub deadband: u8,
    pub yaw_deadband: u8,
    pub alt_hold_deadband: u8,
    pub deadband3d_throttle: u16,
}

/// A pulse-width window on an aux channel, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelRange {
    pub start: u16,
    pub end: u16,
}

/// Channel ranges travel as `(us - 900) / 25` steps.
pub(crate) const RANGE_BASE_US: u16 = 900;
pub(crate) const RANGE_STEP_US: u16 = 25;

impl ChannelRange {
    pub(crate) fn from_steps(start: u8, end: u8) -> Self {
        Self {
            start: RANGE_BASE_US + u16::from(start) * RANGE_STEP_US,
            end: RANGE_BASE_US + u16::from(end) * RANGE_STEP_US,
        }
    }

    pub(crate) fn to_steps(self) -> (u8, u8) {
        let step = |us: u16| (us.saturating_sub(RANGE_BASE_US) / RANGE_STEP_US).min(255) as u8;
        (step(self.start), step(self.end))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeRange {
    pub id: u8,
    pub aux_channel_index: u8,
    pub range: ChannelRange,
}

/// Mode linking added by `MSP_MODE_RANGES_EXTRA`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeRangeExtra {
    pub id: u8,
    /// 0 = OR, 1 = AND.
    pub mode_logic: u8,
    pub linked_to: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentRange {
    pub slot_index: u8,
    pub aux_channel_index: u8,
    pub range: ChannelRange,
    pub adjustment_function: u8,
    pub aux_switch_channel_index: u8,
}
