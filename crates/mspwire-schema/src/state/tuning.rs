use serde::{Deserialize, Serialize};

/// Stick rates and throttle shaping. Ratios are stored unscaled (wire value / 100).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcTuning {
    pub rc_rate: f64,
    pub rc_expo: f64,
    /// Combined roll/pitch rate used before API 1.7.
    pub roll_pitch_rate: f64,
    pub roll_rate: f64,
    pub pitch_rate: f64,
    pub yaw_rate: f64,
    pub dynamic_thr_pid: f64,
    pub throttle_mid: f64,
    pub throttle_expo: f64,
    pub dynamic_thr_breakpoint: u16,
    pub rc_yaw_expo: f64,
    pub rc_yaw_rate: f64,
    pub rc_pitch_rate: f64,
    pub rc_pitch_expo: f64,
    pub throttle_limit_type: u8,
    pub throttle_limit_percent: u8,
    pub roll_rate_limit: u16,
    pub pitch_rate_limit: u16,
    pub yaw_rate_limit: u16,
    pub rates_type: u8,
}

/// Advanced PID controller tuning (`MSP_PID_ADVANCED`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidAdvanced {
    pub roll_pitch_iterm_ignore_rate: u16,
    pub yaw_iterm_ignore_rate: u16,
    pub yaw_p_limit: u16,
    pub delta_method: u8,
    pub vbat_pid_compensation: u8,
    pub dterm_setpoint_transition: u8,
    pub feedforward_transition: u8,
    pub dterm_setpoint_weight: u16,
    pub tolerance_band: u8,
    pub tolerance_band_reduction: u8,
    pub iterm_throttle_gain: u8,
    pub pid_max_velocity: u16,
    pub pid_max_velocity_yaw: u16,
    pub level_angle_limit: u8,
    pub level_sensitivity: u8,
    pub iterm_throttle_threshold: u16,
    pub iterm_accelerator_gain: u16,
    pub iterm_rotation: u8,
    pub smart_feedforward: u8,
    pub iterm_relax: u8,
    pub iterm_relax_type: u8,
    pub absolute_control_gain: u8,
    pub throttle_boost: u8,
    pub acro_trainer_angle_limit: u8,
    pub feedforward_roll: u16,
    pub feedforward_pitch: u16,
    pub feedforward_yaw: u16,
    pub anti_gravity_mode: u8,
    pub d_min_roll: u8,
    pub d_min_pitch: u8,
    pub d_min_yaw: u8,
    pub d_min_gain: u8,
    pub d_min_advance: u8,
    pub use_integrated_yaw: u8,
    pub integrated_yaw_relax: u8,
    pub iterm_relax_cutoff: u8,
    pub motor_output_limit: u8,
    pub auto_profile_cell_count: i8,
    pub idle_min_rpm: u8,
    pub ff_interpolate_sp: u8,
    pub ff_smooth_factor: u8,
    pub ff_boost: u8,
    pub vbat_sag_compensation: u8,
}

/// Gyro and D-term filtering (`MSP_FILTER_CONFIG`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub gyro_lowpass_hz: u16,
    pub dterm_lowpass_hz: u16,
    pub yaw_lowpass_hz: u16,
    pub gyro_notch_hz: u16,
    pub gyro_notch_cutoff: u16,
    pub dterm_notch_hz: u16,
    pub dterm_notch_cutoff: u16,
    pub gyro_notch2_hz: u16,
    pub gyro_notch2_cutoff: u16,
    pub dterm_lowpass_type: u8,
    pub gyro_hardware_lpf: u8,
    pub gyro_32khz_hardware_lpf: u8,
    pub gyro_lowpass2_hz: u16,
    pub gyro_lowpass_type: u8,
    pub gyro_lowpass2_type: u8,
    pub dterm_lowpass2_hz: u16,
    pub dterm_lowpass2_type: u8,
    pub gyro_lowpass_dyn_min_hz: u16,
    pub gyro_lowpass_dyn_max_hz: u16,
    pub dterm_lowpass_dyn_min_hz: u16,
    pub dterm_lowpass_dyn_max_hz: u16,
    pub dyn_notch_range: u8,
    pub dyn_notch_width_percent: u8,
    pub dyn_notch_q: u16,
    pub dyn_notch_min_hz: u16,
    pub gyro_rpm_notch_harmonics: u8,
    pub gyro_rpm_notch_min_hz: u8,
    pub dyn_notch_max_hz: u16,
    pub dyn_lpf_curve_expo: u8,
    pub dyn_notch_count: u8,
}

/// Loop timing, motor protocol and gyro housekeeping (`MSP_ADVANCED_CONFIG`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    pub gyro_sync_denom: u8,
    pub pid_process_denom: u8,
    pub use_unsynced_pwm: u8,
    pub fast_pwm_protocol: u8,
    pub motor_pwm_rate: u16,
    /// Percent, two decimals.
    pub digital_idle_percent: f64,
    pub gyro_use_32khz: u8,
    pub motor_pwm_inversion: u8,
    pub gyro_high_fsr: u8,
    pub gyro_movement_calib_threshold: u8,
    pub gyro_calib_duration: u16,
    pub gyro_offset_yaw: u16,
    pub gyro_check_overflow: u8,
    pub debug_mode: u8,
    pub debug_mode_count: u8,
}

/// Arguments for `MSP_COPY_PROFILE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyProfile {
    /// 0 = PID profile, 1 = rate profile.
    pub profile_type: u8,
    pub dst_profile: u8,
    pub src_profile: u8,
}
