//! Rates, PID and filter tuning.

use crate::cursor::{scaled_u16, scaled_u8, FieldReader, FieldWriter};
use crate::error::Result;
use crate::ladder::{read_ladder, write_ladder, Rung};
use crate::state::{FcState, FilterConfig, PidAdvanced, PidTerm, RcTuning};
use crate::version::ApiVersion;

fn ratio(r: &mut FieldReader<'_>) -> Result<f64> {
    Ok(f64::from(r.read_u8()?) / 100.0)
}

fn put_ratio(w: &mut FieldWriter, value: f64) {
    w.write_u8(scaled_u8(value, 100.0));
}

fn rc_base(r: &mut FieldReader<'_>, t: &mut RcTuning, version: ApiVersion) -> Result<()> {
    t.rc_rate = ratio(r)?;
    t.rc_expo = ratio(r)?;
    if version.less_than(ApiVersion::V1_7) {
        t.roll_pitch_rate = ratio(r)?;
    } else {
        t.roll_rate = ratio(r)?;
        t.pitch_rate = ratio(r)?;
    }
    t.yaw_rate = ratio(r)?;
    t.dynamic_thr_pid = ratio(r)?;
    t.throttle_mid = ratio(r)?;
    t.throttle_expo = ratio(r)?;
    Ok(())
}

fn rc_base_write(w: &mut FieldWriter, t: &RcTuning, version: ApiVersion) {
    put_ratio(w, t.rc_rate);
    put_ratio(w, t.rc_expo);
    if version.less_than(ApiVersion::V1_7) {
        put_ratio(w, t.roll_pitch_rate);
    } else {
        put_ratio(w, t.roll_rate);
        put_ratio(w, t.pitch_rate);
    }
    put_ratio(w, t.yaw_rate);
    put_ratio(w, t.dynamic_thr_pid);
    put_ratio(w, t.throttle_mid);
    put_ratio(w, t.throttle_expo);
}

fn rc_breakpoint(r: &mut FieldReader<'_>, t: &mut RcTuning, _: ApiVersion) -> Result<()> {
    t.dynamic_thr_breakpoint = r.read_u16()?;
    Ok(())
}

fn rc_breakpoint_write(w: &mut FieldWriter, t: &RcTuning, _: ApiVersion) {
    w.write_u16(t.dynamic_thr_breakpoint);
}

fn rc_yaw_expo(r: &mut FieldReader<'_>, t: &mut RcTuning, _: ApiVersion) -> Result<()> {
    t.rc_yaw_expo = ratio(r)?;
    Ok(())
}

fn rc_yaw_expo_write(w: &mut FieldWriter, t: &RcTuning, _: ApiVersion) {
    put_ratio(w, t.rc_yaw_expo);
}

fn rc_yaw_rate(r: &mut FieldReader<'_>, t: &mut RcTuning, _: ApiVersion) -> Result<()> {
    t.rc_yaw_rate = ratio(r)?;
    Ok(())
}

fn rc_yaw_rate_write(w: &mut FieldWriter, t: &RcTuning, _: ApiVersion) {
    put_ratio(w, t.rc_yaw_rate);
}

fn rc_pitch(r: &mut FieldReader<'_>, t: &mut RcTuning, _: ApiVersion) -> Result<()> {
    t.rc_pitch_rate = ratio(r)?;
    t.rc_pitch_expo = ratio(r)?;
    Ok(())
}

fn rc_pitch_write(w: &mut FieldWriter, t: &RcTuning, _: ApiVersion) {
    put_ratio(w, t.rc_pitch_rate);
    put_ratio(w, t.rc_pitch_expo);
}

fn rc_throttle_limit(r: &mut FieldReader<'_>, t: &mut RcTuning, _: ApiVersion) -> Result<()> {
    t.throttle_limit_type = r.read_u8()?;
    t.throttle_limit_percent = r.read_u8()?;
    Ok(())
}

fn rc_throttle_limit_write(w: &mut FieldWriter, t: &RcTuning, _: ApiVersion) {
    w.write_u8(t.throttle_limit_type)
        .write_u8(t.throttle_limit_percent);
}

fn rc_rate_limits(r: &mut FieldReader<'_>, t: &mut RcTuning, _: ApiVersion) -> Result<()> {
    t.roll_rate_limit = r.read_u16()?;
    t.pitch_rate_limit = r.read_u16()?;
    t.yaw_rate_limit = r.read_u16()?;
    Ok(())
}

fn rc_rate_limits_write(w: &mut FieldWriter, t: &RcTuning, _: ApiVersion) {
    w.write_u16(t.roll_rate_limit)
        .write_u16(t.pitch_rate_limit)
        .write_u16(t.yaw_rate_limit);
}

fn rc_rates_type(r: &mut FieldReader<'_>, t: &mut RcTuning, _: ApiVersion) -> Result<()> {
    t.rates_type = r.read_u8()?;
    Ok(())
}

fn rc_rates_type_write(w: &mut FieldWriter, t: &RcTuning, _: ApiVersion) {
    w.write_u8(t.rates_type);
}

pub(crate) const RC_TUNING: &[Rung<RcTuning>] = &[
    Rung::new(ApiVersion::UNKNOWN, rc_base, rc_base_write),
    Rung::new(ApiVersion::V1_7, rc_breakpoint, rc_breakpoint_write),
    Rung::new(ApiVersion::V1_10, rc_yaw_expo, rc_yaw_expo_write),
    Rung::new(ApiVersion::V1_16, rc_yaw_rate, rc_yaw_rate_write),
    Rung::new(ApiVersion::V1_37, rc_pitch, rc_pitch_write),
    Rung::new(ApiVersion::V1_41, rc_throttle_limit, rc_throttle_limit_write),
    Rung::new(ApiVersion::V1_42, rc_rate_limits, rc_rate_limits_write),
    Rung::new(ApiVersion::V1_43, rc_rates_type, rc_rates_type_write),
];

pub(crate) fn decode_rc_tuning(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(RC_TUNING, version, r, &mut s.rc_tuning)
}

pub(crate) fn encode_set_rc_tuning(w: &mut FieldWriter, s: &FcState) {
    write_ladder(RC_TUNING, s.api_version(), w, &s.rc_tuning);
}

pub(crate) fn decode_pid(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let axes = r.records(3)?;
    s.pids.clear();
    for _ in 0..axes {
        let mut term: PidTerm = [0; 3];
        for gain in term.iter_mut() {
            *gain = r.read_u8()?;
        }
        s.pids.push(term);
    }
    s.pids_active = s.pids.clone();
    Ok(())
}

pub(crate) fn encode_set_pid(w: &mut FieldWriter, s: &FcState) {
    for term in &s.pids {
        w.write_bytes(term);
    }
}

/// The device accepted the pending PID set.
pub(crate) fn ack_set_pid(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    r.rest();
    s.pids_active = s.pids.clone();
    Ok(())
}

pub(crate) fn decode_pid_controller(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.pid_controller = r.read_u8()?;
    Ok(())
}

pub(crate) fn encode_set_pid_controller(w: &mut FieldWriter, s: &FcState) {
    w.write_u8(s.pid_controller);
}

/// Largest setpoint weight that fits the legacy one-byte slot.
const LEGACY_SETPOINT_WEIGHT_MAX: u16 = 254;

fn pa_legacy(r: &mut FieldReader<'_>, p: &mut PidAdvanced, _: ApiVersion) -> Result<()> {
    p.roll_pitch_iterm_ignore_rate = r.read_u16()?;
    p.yaw_iterm_ignore_rate = r.read_u16()?;
    p.yaw_p_limit = r.read_u16()?;
    p.delta_method = r.read_u8()?;
    p.vbat_pid_compensation = r.read_u8()?;
    Ok(())
}

fn pa_legacy_write(w: &mut FieldWriter, p: &PidAdvanced, _: ApiVersion) {
    w.write_u16(p.roll_pitch_iterm_ignore_rate)
        .write_u16(p.yaw_iterm_ignore_rate)
        .write_u16(p.yaw_p_limit)
        .write_u8(p.delta_method)
        .write_u8(p.vbat_pid_compensation);
}

fn pa_transition(r: &mut FieldReader<'_>, p: &mut PidAdvanced, version: ApiVersion) -> Result<()> {
    if version.at_least(ApiVersion::V1_40) {
        p.feedforward_transition = r.read_u8()?;
    } else {
        p.dterm_setpoint_transition = r.read_u8()?;
    }
    p.dterm_setpoint_weight = u16::from(r.read_u8()?);
    p.tolerance_band = r.read_u8()?;
    p.tolerance_band_reduction = r.read_u8()?;
    p.iterm_throttle_gain = r.read_u8()?;
    p.pid_max_velocity = r.read_u16()?;
    p.pid_max_velocity_yaw = r.read_u16()?;
    Ok(())
}

fn pa_transition_write(w: &mut FieldWriter, p: &PidAdvanced, version: ApiVersion) {
    let transition = if version.at_least(ApiVersion::V1_40) {
        p.feedforward_transition
    } else {
        p.dterm_setpoint_transition
    };
    let legacy_weight = p.dterm_setpoint_weight.min(LEGACY_SETPOINT_WEIGHT_MAX) as u8;
    w.write_u8(transition)
        .write_u8(legacy_weight)
        .write_u8(p.tolerance_band)
        .write_u8(p.tolerance_band_reduction)
        .write_u8(p.iterm_throttle_gain)
        .write_u16(p.pid_max_velocity)
        .write_u16(p.pid_max_velocity_yaw);
}

fn pa_level(r: &mut FieldReader<'_>, p: &mut PidAdvanced, _: ApiVersion) -> Result<()> {
    p.level_angle_limit = r.read_u8()?;
    p.level_sensitivity = r.read_u8()?;
    Ok(())
}

fn pa_level_write(w: &mut FieldWriter, p: &PidAdvanced, _: ApiVersion) {
    w.write_u8(p.level_angle_limit).write_u8(p.level_sensitivity);
}

fn pa_iterm_throttle(r: &mut FieldReader<'_>, p: &mut PidAdvanced, _: ApiVersion) -> Result<()> {
    p.iterm_throttle_threshold = r.read_u16()?;
    p.iterm_accelerator_gain = r.read_u16()?;
    Ok(())
}

fn pa_iterm_throttle_write(w: &mut FieldWriter, p: &PidAdvanced, _: ApiVersion) {
    w.write_u16(p.iterm_throttle_threshold)
        .write_u16(p.iterm_accelerator_gain);
}

fn pa_setpoint_weight(r: &mut FieldReader<'_>, p: &mut PidAdvanced, _: ApiVersion) -> Result<()> {
    p.dterm_setpoint_weight = r.read_u16()?;
    Ok(())
}

fn pa_setpoint_weight_write(w: &mut FieldWriter, p: &PidAdvanced, _: ApiVersion) {
    w.write_u16(p.dterm_setpoint_weight);
}

fn pa_feedforward(r: &mut FieldReader<'_>, p: &mut PidAdvanced, _: ApiVersion) -> Result<()> {
    p.iterm_rotation = r.read_u8()?;
    p.smart_feedforward = r.read_u8()?;
    p.iterm_relax = r.read_u8()?;
    p.iterm_relax_type = r.read_u8()?;
    p.absolute_control_gain = r.read_u8()?;
    p.throttle_boost = r.read_u8()?;
    p.acro_trainer_angle_limit = r.read_u8()?;
    p.feedforward_roll = r.read_u16()?;
    p.feedforward_pitch = r.read_u16()?;
    p.feedforward_yaw = r.read_u16()?;
    p.anti_gravity_mode = r.read_u8()?;
    Ok(())
}

fn pa_feedforward_write(w: &mut FieldWriter, p: &PidAdvanced, _: ApiVersion) {
    w.write_u8(p.iterm_rotation)
        .write_u8(p.smart_feedforward)
        .write_u8(p.iterm_relax)
        .write_u8(p.iterm_relax_type)
        .write_u8(p.absolute_control_gain)
        .write_u8(p.throttle_boost)
        .write_u8(p.acro_trainer_angle_limit)
        .write_u16(p.feedforward_roll)
        .write_u16(p.feedforward_pitch)
        .write_u16(p.feedforward_yaw)
        .write_u8(p.anti_gravity_mode);
}

fn pa_d_min(r: &mut FieldReader<'_>, p: &mut PidAdvanced, _: ApiVersion) -> Result<()> {
    p.d_min_roll = r.read_u8()?;
    p.d_min_pitch = r.read_u8()?;
    p.d_min_yaw = r.read_u8()?;
    p.d_min_gain = r.read_u8()?;
    p.d_min_advance = r.read_u8()?;
    p.use_integrated_yaw = r.read_u8()?;
    p.integrated_yaw_relax = r.read_u8()?;
    Ok(())
}

fn pa_d_min_write(w: &mut FieldWriter, p: &PidAdvanced, _: ApiVersion) {
    w.write_u8(p.d_min_roll)
        .write_u8(p.d_min_pitch)
        .write_u8(p.d_min_yaw)
        .write_u8(p.d_min_gain)
        .write_u8(p.d_min_advance)
        .write_u8(p.use_integrated_yaw)
        .write_u8(p.integrated_yaw_relax);
}

fn pa_relax_cutoff(r: &mut FieldReader<'_>, p: &mut PidAdvanced, _: ApiVersion) -> Result<()> {
    p.iterm_relax_cutoff = r.read_u8()?;
    Ok(())
}

fn pa_relax_cutoff_write(w: &mut FieldWriter, p: &PidAdvanced, _: ApiVersion) {
    w.write_u8(p.iterm_relax_cutoff);
}

fn pa_motor_limits(r: &mut FieldReader<'_>, p: &mut PidAdvanced, _: ApiVersion) -> Result<()> {
    p.motor_output_limit = r.read_u8()?;
    p.auto_profile_cell_count = r.read_i8()?;
    p.idle_min_rpm = r.read_u8()?;
    Ok(())
}

fn pa_motor_limits_write(w: &mut FieldWriter, p: &PidAdvanced, _: ApiVersion) {
    w.write_u8(p.motor_output_limit)
        .write_i8(p.auto_profile_cell_count)
        .write_u8(p.idle_min_rpm);
}

fn pa_ff_shaping(r: &mut FieldReader<'_>, p: &mut PidAdvanced, _: ApiVersion) -> Result<()> {
    p.ff_interpolate_sp = r.read_u8()?;
    p.ff_smooth_factor = r.read_u8()?;
    p.ff_boost = r.read_u8()?;
    p.vbat_sag_compensation = r.read_u8()?;
    Ok(())
}

fn pa_ff_shaping_write(w: &mut FieldWriter, p: &PidAdvanced, _: ApiVersion) {
    w.write_u8(p.ff_interpolate_sp)
        .write_u8(p.ff_smooth_factor)
        .write_u8(p.ff_boost)
        .write_u8(p.vbat_sag_compensation);
}

pub(crate) const PID_ADVANCED: &[Rung<PidAdvanced>] = &[
    Rung::new(ApiVersion::UNKNOWN, pa_legacy, pa_legacy_write),
    Rung::new(ApiVersion::V1_20, pa_transition, pa_transition_write),
    Rung::new(ApiVersion::V1_24, pa_level, pa_level_write),
    Rung::new(ApiVersion::V1_36, pa_iterm_throttle, pa_iterm_throttle_write),
    Rung::new(ApiVersion::V1_39, pa_setpoint_weight, pa_setpoint_weight_write),
    Rung::new(ApiVersion::V1_40, pa_feedforward, pa_feedforward_write),
    Rung::new(ApiVersion::V1_41, pa_d_min, pa_d_min_write),
    Rung::new(ApiVersion::V1_42, pa_relax_cutoff, pa_relax_cutoff_write),
    Rung::new(ApiVersion::V1_43, pa_motor_limits, pa_motor_limits_write),
    Rung::new(ApiVersion::V1_44, pa_ff_shaping, pa_ff_shaping_write),
];

pub(crate) fn decode_pid_advanced(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(PID_ADVANCED, version, r, &mut s.pid_advanced)?;
    s.pid_advanced_active = s.pid_advanced.clone();
    Ok(())
}

/// Firmware before 1.20 reads no advanced tuning from a set request, so the payload is empty.
pub(crate) fn encode_set_pid_advanced(w: &mut FieldWriter, s: &FcState) {
    let version = s.api_version();
    if version.less_than(ApiVersion::V1_20) {
        return;
    }
    write_ladder(PID_ADVANCED, version, w, &s.pid_advanced);
}

pub(crate) fn ack_set_pid_advanced(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    r.rest();
    s.pid_advanced_active = s.pid_advanced.clone();
    Ok(())
}

fn filter_base(r: &mut FieldReader<'_>, f: &mut FilterConfig, _: ApiVersion) -> Result<()> {
    f.gyro_lowpass_hz = u16::from(r.read_u8()?);
    f.dterm_lowpass_hz = r.read_u16()?;
    f.yaw_lowpass_hz = r.read_u16()?;
    Ok(())
}

fn filter_base_write(w: &mut FieldWriter, f: &FilterConfig, _: ApiVersion) {
    w.write_u8(f.gyro_lowpass_hz.min(u16::from(u8::MAX)) as u8)
        .write_u16(f.dterm_lowpass_hz)
        .write_u16(f.yaw_lowpass_hz);
}

fn filter_notch(r: &mut FieldReader<'_>, f: &mut FilterConfig, _: ApiVersion) -> Result<()> {
    f.gyro_notch_hz = r.read_u16()?;
    f.gyro_notch_cutoff = r.read_u16()?;
    f.dterm_notch_hz = r.read_u16()?;
    f.dterm_notch_cutoff = r.read_u16()?;
    Ok(())
}

fn filter_notch_write(w: &mut FieldWriter, f: &FilterConfig, _: ApiVersion) {
    w.write_u16(f.gyro_notch_hz)
        .write_u16(f.gyro_notch_cutoff)
        .write_u16(f.dterm_notch_hz)
        .write_u16(f.dterm_notch_cutoff);
}

fn filter_notch2(r: &mut FieldReader<'_>, f: &mut FilterConfig, _: ApiVersion) -> Result<()> {
    f.gyro_notch2_hz = r.read_u16()?;
    f.gyro_notch2_cutoff = r.read_u16()?;
    Ok(())
}

fn filter_notch2_write(w: &mut FieldWriter, f: &FilterConfig, _: ApiVersion) {
    w.write_u16(f.gyro_notch2_hz).write_u16(f.gyro_notch2_cutoff);
}

fn filter_dterm_type(r: &mut FieldReader<'_>, f: &mut FilterConfig, _: ApiVersion) -> Result<()> {
    f.dterm_lowpass_type = r.read_u8()?;
    Ok(())
}

fn filter_dterm_type_write(w: &mut FieldWriter, f: &FilterConfig, _: ApiVersion) {
    w.write_u8(f.dterm_lowpass_type);
}

/// 32 kHz gyro sampling is gone from 1.41; the slot stays on the wire but always reads as 0.
fn filter_lowpass2(r: &mut FieldReader<'_>, f: &mut FilterConfig, version: ApiVersion) -> Result<()> {
    f.gyro_hardware_lpf = r.read_u8()?;
    let gyro_32khz = r.read_u8()?;
    f.gyro_32khz_hardware_lpf = if version.less_than(ApiVersion::V1_41) {
        gyro_32khz
    } else {
        0
    };
    f.gyro_lowpass_hz = r.read_u16()?;
    f.gyro_lowpass2_hz = r.read_u16()?;
    f.gyro_lowpass_type = r.read_u8()?;
    f.gyro_lowpass2_type = r.read_u8()?;
    f.dterm_lowpass2_hz = r.read_u16()?;
    Ok(())
}

fn filter_lowpass2_write(w: &mut FieldWriter, f: &FilterConfig, version: ApiVersion) {
    let gyro_32khz = if version.less_than(ApiVersion::V1_41) {
        f.gyro_32khz_hardware_lpf
    } else {
        0
    };
    w.write_u8(f.gyro_hardware_lpf)
        .write_u8(gyro_32khz)
        .write_u16(f.gyro_lowpass_hz)
        .write_u16(f.gyro_lowpass2_hz)
        .write_u8(f.gyro_lowpass_type)
        .write_u8(f.gyro_lowpass2_type)
        .write_u16(f.dterm_lowpass2_hz);
}

fn filter_dynamic_lowpass(r: &mut FieldReader<'_>, f: &mut FilterConfig, _: ApiVersion) -> Result<()> {
    f.dterm_lowpass2_type = r.read_u8()?;
    f.gyro_lowpass_dyn_min_hz = r.read_u16()?;
    f.gyro_lowpass_dyn_max_hz = r.read_u16()?;
    f.dterm_lowpass_dyn_min_hz = r.read_u16()?;
    f.dterm_lowpass_dyn_max_hz = r.read_u16()?;
    Ok(())
}

fn filter_dynamic_lowpass_write(w: &mut FieldWriter, f: &FilterConfig, _: ApiVersion) {
    w.write_u8(f.dterm_lowpass2_type)
        .write_u16(f.gyro_lowpass_dyn_min_hz)
        .write_u16(f.gyro_lowpass_dyn_max_hz)
        .write_u16(f.dterm_lowpass_dyn_min_hz)
        .write_u16(f.dterm_lowpass_dyn_max_hz);
}

fn filter_dyn_notch(r: &mut FieldReader<'_>, f: &mut FilterConfig, _: ApiVersion) -> Result<()> {
    f.dyn_notch_range = r.read_u8()?;
    f.dyn_notch_width_percent = r.read_u8()?;
    f.dyn_notch_q = r.read_u16()?;
    f.dyn_notch_min_hz = r.read_u16()?;
    f.gyro_rpm_notch_harmonics = r.read_u8()?;
    f.gyro_rpm_notch_min_hz = r.read_u8()?;
    Ok(())
}

fn filter_dyn_notch_write(w: &mut FieldWriter, f: &FilterConfig, _: ApiVersion) {
    w.write_u8(f.dyn_notch_range)
        .write_u8(f.dyn_notch_width_percent)
        .write_u16(f.dyn_notch_q)
        .write_u16(f.dyn_notch_min_hz)
        .write_u8(f.gyro_rpm_notch_harmonics)
        .write_u8(f.gyro_rpm_notch_min_hz);
}

fn filter_dyn_notch_max(r: &mut FieldReader<'_>, f: &mut FilterConfig, _: ApiVersion) -> Result<()> {
    f.dyn_notch_max_hz = r.read_u16()?;
    Ok(())
}

fn filter_dyn_notch_max_write(w: &mut FieldWriter, f: &FilterConfig, _: ApiVersion) {
    w.write_u16(f.dyn_notch_max_hz);
}

fn filter_curve(r: &mut FieldReader<'_>, f: &mut FilterConfig, _: ApiVersion) -> Result<()> {
    f.dyn_lpf_curve_expo = r.read_u8()?;
    f.dyn_notch_count = r.read_u8()?;
    Ok(())
}

fn filter_curve_write(w: &mut FieldWriter, f: &FilterConfig, _: ApiVersion) {
    w.write_u8(f.dyn_lpf_curve_expo).write_u8(f.dyn_notch_count);
}

pub(crate) const FILTER_CONFIG: &[Rung<FilterConfig>] = &[
    Rung::new(ApiVersion::UNKNOWN, filter_base, filter_base_write),
    Rung::new(ApiVersion::V1_20, filter_notch, filter_notch_write),
    Rung::new(ApiVersion::V1_21, filter_notch2, filter_notch2_write),
    Rung::new(ApiVersion::V1_36, filter_dterm_type, filter_dterm_type_write),
    Rung::new(ApiVersion::V1_39, filter_lowpass2, filter_lowpass2_write),
    Rung::new(ApiVersion::V1_41, filter_dynamic_lowpass, filter_dynamic_lowpass_write),
    Rung::new(ApiVersion::V1_42, filter_dyn_notch, filter_dyn_notch_write),
    Rung::new(ApiVersion::V1_43, filter_dyn_notch_max, filter_dyn_notch_max_write),
    Rung::new(ApiVersion::V1_44, filter_curve, filter_curve_write),
];

pub(crate) fn decode_filter_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(FILTER_CONFIG, version, r, &mut s.filter_config)
}

pub(crate) fn encode_set_filter_config(w: &mut FieldWriter, s: &FcState) {
    write_ladder(FILTER_CONFIG, s.api_version(), w, &s.filter_config);
}

/// Firmware before API 1.26 numbered the PWM protocols 5 and 7 the other way round.
pub fn reorder_pwm_protocol(protocol: u8, version: ApiVersion) -> u8 {
    if version.at_least(ApiVersion::V1_26) {
        return protocol;
    }
    match protocol {
        5 => 7,
        7 => 5,
        other => other,
    }
}

// ADVANCED_CONFIG reaches into the sensor alignment record, so its ladder runs over the whole state.

fn adv_base(r: &mut FieldReader<'_>, s: &mut FcState, version: ApiVersion) -> Result<()> {
    let a = &mut s.advanced_config;
    a.gyro_sync_denom = r.read_u8()?;
    a.pid_process_denom = r.read_u8()?;
    a.use_unsynced_pwm = r.read_u8()?;
    a.fast_pwm_protocol = reorder_pwm_protocol(r.read_u8()?, version);
    a.motor_pwm_rate = r.read_u16()?;
    Ok(())
}

fn adv_base_write(w: &mut FieldWriter, s: &FcState, version: ApiVersion) {
    let a = &s.advanced_config;
    w.write_u8(a.gyro_sync_denom)
        .write_u8(a.pid_process_denom)
        .write_u8(a.use_unsynced_pwm)
        .write_u8(reorder_pwm_protocol(a.fast_pwm_protocol, version))
        .write_u16(a.motor_pwm_rate);
}

fn adv_idle(r: &mut FieldReader<'_>, s: &mut FcState, _: ApiVersion) -> Result<()> {
    s.advanced_config.digital_idle_percent = f64::from(r.read_u16()?) / 100.0;
    Ok(())
}

fn adv_idle_write(w: &mut FieldWriter, s: &FcState, _: ApiVersion) {
    w.write_u16(scaled_u16(s.advanced_config.digital_idle_percent, 100.0));
}

fn adv_32khz(r: &mut FieldReader<'_>, s: &mut FcState, _: ApiVersion) -> Result<()> {
    s.advanced_config.gyro_use_32khz = r.read_u8()?;
    Ok(())
}

fn adv_32khz_write(w: &mut FieldWriter, s: &FcState, _: ApiVersion) {
    w.write_u8(s.advanced_config.gyro_use_32khz);
}

fn adv_gyro(r: &mut FieldReader<'_>, s: &mut FcState, _: ApiVersion) -> Result<()> {
    let a = &mut s.advanced_config;
    a.motor_pwm_inversion = r.read_u8()?;
    s.sensor_alignment.gyro_to_use = r.read_u8()?;
    a.gyro_high_fsr = r.read_u8()?;
    a.gyro_movement_calib_threshold = r.read_u8()?;
    a.gyro_calib_duration = r.read_u16()?;
    a.gyro_offset_yaw = r.read_u16()?;
    a.gyro_check_overflow = r.read_u8()?;
    a.debug_mode = r.read_u8()?;
    Ok(())
}

fn adv_gyro_write(w: &mut FieldWriter, s: &FcState, _: ApiVersion) {
    let a = &s.advanced_config;
    w.write_u8(a.motor_pwm_inversion)
        .write_u8(s.sensor_alignment.gyro_to_use)
        .write_u8(a.gyro_high_fsr)
        .write_u8(a.gyro_movement_calib_threshold)
        .write_u16(a.gyro_calib_duration)
        .write_u16(a.gyro_offset_yaw)
        .write_u8(a.gyro_check_overflow)
        .write_u8(a.debug_mode);
}

fn adv_debug_count(r: &mut FieldReader<'_>, s: &mut FcState, _: ApiVersion) -> Result<()> {
    s.advanced_config.debug_mode_count = r.read_u8()?;
    Ok(())
}

pub(crate) const ADVANCED_CONFIG: &[Rung<FcState>] = &[
    Rung::new(ApiVersion::UNKNOWN, adv_base, adv_base_write),
    Rung::new(ApiVersion::V1_24, adv_idle, adv_idle_write),
    Rung::new(ApiVersion::V1_25, adv_32khz, adv_32khz_write),
    Rung::new(ApiVersion::V1_42, adv_gyro, adv_gyro_write),
    // Reported by the device, not settable.
    Rung::read_only(ApiVersion::V1_42, adv_debug_count),
];

pub(crate) fn decode_advanced_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(ADVANCED_CONFIG, version, r, s)
}

pub(crate) fn encode_set_advanced_config(w: &mut FieldWriter, s: &FcState) {
    write_ladder(ADVANCED_CONFIG, s.api_version(), w, s);
}

pub(crate) fn encode_copy_profile(w: &mut FieldWriter, s: &FcState) {
    let c = &s.copy_profile;
    w.write_u8(c.profile_type)
        .write_u8(c.dst_profile)
        .write_u8(c.src_profile);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::ladder::is_ascending;

    const BANDS: [ApiVersion; 6] = [
        ApiVersion::V1_6,
        ApiVersion::V1_16,
        ApiVersion::V1_36,
        ApiVersion::V1_40,
        ApiVersion::V1_42,
        ApiVersion::V1_44,
    ];

    fn state_at(version: ApiVersion) -> FcState {
        let mut s = FcState::default();
        s.config.api_version = version;
        s
    }

    #[test]
    fn ladders_are_ascending() {
        assert!(is_ascending(RC_TUNING));
        assert!(is_ascending(PID_ADVANCED));
        assert!(is_ascending(FILTER_CONFIG));
        assert!(is_ascending(ADVANCED_CONFIG));
    }

    fn sample_rc_tuning(version: ApiVersion) -> RcTuning {
        let mut t = RcTuning {
            rc_rate: 1.0,
            rc_expo: 0.07,
            yaw_rate: 0.7,
            dynamic_thr_pid: 0.1,
            throttle_mid: 0.5,
            throttle_expo: 0.2,
            ..Default::default()
        };
        if version.less_than(ApiVersion::V1_7) {
            t.roll_pitch_rate = 0.5;
            return t;
        }
        t.roll_rate = 0.7;
        t.pitch_rate = 0.68;
        t.dynamic_thr_breakpoint = 1650;
        if version.at_least(ApiVersion::V1_10) {
            t.rc_yaw_expo = 0.05;
        }
        if version.at_least(ApiVersion::V1_16) {
            t.rc_yaw_rate = 1.2;
        }
        if version.at_least(ApiVersion::V1_37) {
            t.rc_pitch_rate = 1.1;
            t.rc_pitch_expo = 0.09;
        }
        if version.at_least(ApiVersion::V1_41) {
            t.throttle_limit_type = 1;
            t.throttle_limit_percent = 90;
        }
        if version.at_least(ApiVersion::V1_42) {
            t.roll_rate_limit = 1998;
            t.pitch_rate_limit = 1998;
            t.yaw_rate_limit = 1800;
        }
        if version.at_least(ApiVersion::V1_43) {
            t.rates_type = 3;
        }
        t
    }

    #[test]
    fn rc_tuning_roundtrip_per_band() {
        for version in BANDS {
            let mut s = state_at(version);
            s.rc_tuning = sample_rc_tuning(version);
            let mut w = FieldWriter::new();
            encode_set_rc_tuning(&mut w, &s);

            let mut decoded = state_at(version);
            let mut r = FieldReader::new(w.as_slice());
            decode_rc_tuning(&mut r, &mut decoded).unwrap();
            assert_eq!(decoded.rc_tuning, s.rc_tuning, "at {version}");
            assert_eq!(r.remaining(), 0);
        }
    }

    #[test]
    fn rc_tuning_legacy_layout_has_combined_rate() {
        let mut s = state_at(ApiVersion::V1_6);
        let payload = [100, 0, 50, 0, 0, 50, 0];
        decode_rc_tuning(&mut FieldReader::new(&payload), &mut s).unwrap();
        assert_eq!(s.rc_tuning.roll_pitch_rate, 0.5);
        assert_eq!(s.rc_tuning.roll_rate, 0.0);
    }

    #[test]
    fn pid_stride_and_promotion() {
        let mut s = FcState::default();
        decode_pid(&mut FieldReader::new(&[45, 80, 30, 47, 84, 32]), &mut s).unwrap();
        assert_eq!(s.pids, vec![[45, 80, 30], [47, 84, 32]]);
        assert_eq!(s.pids_active, s.pids);

        s.pids[1][0] = 50;
        let mut w = FieldWriter::new();
        encode_set_pid(&mut w, &s);
        assert_eq!(w.as_slice(), &[45, 80, 30, 50, 84, 32]);
        assert_eq!(s.pids_active[1][0], 47);

        ack_set_pid(&mut FieldReader::new(&[]), &mut s).unwrap();
        assert_eq!(s.pids_active, s.pids);

        let err = decode_pid(&mut FieldReader::new(&[1, 2, 3, 4]), &mut s).unwrap_err();
        assert_eq!(err, DecodeError::StrideMismatch { len: 4, stride: 3 });
    }

    #[test]
    fn pid_advanced_roundtrip_per_band() {
        for version in BANDS.into_iter().filter(|v| v.at_least(ApiVersion::V1_20)) {
            let mut s = state_at(version);
            let p = &mut s.pid_advanced;
            p.yaw_p_limit = 300;
            p.dterm_setpoint_weight = if version.at_least(ApiVersion::V1_39) { 300 } else { 60 };
            p.pid_max_velocity = 1000;
            if version.at_least(ApiVersion::V1_40) {
                p.feedforward_transition = 20;
            } else {
                p.dterm_setpoint_transition = 20;
            }
            if version.at_least(ApiVersion::V1_24) {
                p.level_angle_limit = 55;
            }
            if version.at_least(ApiVersion::V1_36) {
                p.iterm_accelerator_gain = 3500;
            }
            if version.at_least(ApiVersion::V1_40) {
                p.feedforward_yaw = 100;
            }
            if version.at_least(ApiVersion::V1_44) {
                p.vbat_sag_compensation = 40;
            }

            let mut w = FieldWriter::new();
            encode_set_pid_advanced(&mut w, &s);
            let mut decoded = state_at(version);
            let mut r = FieldReader::new(w.as_slice());
            decode_pid_advanced(&mut r, &mut decoded).unwrap();
            assert_eq!(decoded.pid_advanced, s.pid_advanced, "at {version}");
            assert_eq!(r.remaining(), 0);
        }
    }

    #[test]
    fn pid_advanced_before_1_20_reads_five_fields_and_sets_nothing() {
        let payload = [0x64, 0x00, 0xC8, 0x00, 0x2C, 0x01, 1, 0];
        let mut s = state_at(ApiVersion::V1_16);
        let mut r = FieldReader::new(&payload);
        decode_pid_advanced(&mut r, &mut s).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(s.pid_advanced.roll_pitch_iterm_ignore_rate, 100);
        assert_eq!(s.pid_advanced.yaw_iterm_ignore_rate, 200);
        assert_eq!(s.pid_advanced.yaw_p_limit, 300);
        assert_eq!(s.pid_advanced.delta_method, 1);
        assert_eq!(s.pid_advanced_active, s.pid_advanced);

        let mut w = FieldWriter::new();
        encode_set_pid_advanced(&mut w, &s);
        assert!(w.as_slice().is_empty());
    }

    #[test]
    fn pid_advanced_1_24_layout() {
        let payload = [
            0x00, 0x00, 0x00, 0x00, 0xF4, 0x01, 0, 0, // legacy block
            20, 60, 0, 0, 40, 0xE8, 0x03, 0x00, 0x02, // 1.20
            55, 50, // 1.24
        ];
        let mut s = state_at(ApiVersion::V1_24);
        let mut r = FieldReader::new(&payload);
        decode_pid_advanced(&mut r, &mut s).unwrap();
        assert_eq!(r.remaining(), 0);
        let p = &s.pid_advanced;
        assert_eq!(p.yaw_p_limit, 500);
        assert_eq!(p.dterm_setpoint_transition, 20);
        assert_eq!(p.dterm_setpoint_weight, 60);
        assert_eq!(p.iterm_throttle_gain, 40);
        assert_eq!(p.pid_max_velocity, 1000);
        assert_eq!(p.pid_max_velocity_yaw, 512);
        assert_eq!(p.level_angle_limit, 55);
        assert_eq!(p.level_sensitivity, 50);

        let mut w = FieldWriter::new();
        encode_set_pid_advanced(&mut w, &s);
        assert_eq!(w.as_slice(), &payload);

        let mut older = state_at(ApiVersion::V1_20);
        let mut r = FieldReader::new(&payload);
        decode_pid_advanced(&mut r, &mut older).unwrap();
        assert_eq!(r.remaining(), 2);
        assert_eq!(older.pid_advanced.level_angle_limit, 0);
    }

    #[test]
    fn pid_advanced_legacy_weight_slot_is_clamped() {
        let mut s = state_at(ApiVersion::V1_40);
        s.pid_advanced.dterm_setpoint_weight = 1000;
        let mut w = FieldWriter::new();
        encode_set_pid_advanced(&mut w, &s);
        assert_eq!(w.as_slice()[9], 254);
    }

    #[test]
    fn filter_config_roundtrip_per_band() {
        for version in BANDS {
            let mut s = state_at(version);
            let f = &mut s.filter_config;
            f.gyro_lowpass_hz = if version.at_least(ApiVersion::V1_39) { 300 } else { 90 };
            f.dterm_lowpass_hz = 100;
            if version.at_least(ApiVersion::V1_20) {
                f.gyro_notch_hz = 400;
            }
            if version.at_least(ApiVersion::V1_42) {
                f.dyn_notch_q = 250;
            }
            if version.at_least(ApiVersion::V1_44) {
                f.dyn_notch_count = 3;
            }

            let mut w = FieldWriter::new();
            encode_set_filter_config(&mut w, &s);
            let mut decoded = state_at(version);
            let mut r = FieldReader::new(w.as_slice());
            decode_filter_config(&mut r, &mut decoded).unwrap();
            assert_eq!(decoded.filter_config, s.filter_config, "at {version}");
            assert_eq!(r.remaining(), 0);
        }
    }

    const FILTER_1_16: [u8; 5] = [0x5A, 0x64, 0x00, 0x00, 0x00];

    const FILTER_1_40: [u8; 28] = [
        0xFA, 0x64, 0x00, 0x00, 0x00, // base
        0x90, 0x01, 0x2C, 0x01, 0x00, 0x00, 0xA0, 0x00, // 1.20 notches
        0xC8, 0x00, 0x64, 0x00, // 1.21 second notch
        1,    // 1.36 dterm type
        0, 1, 0xFA, 0x00, 0xF4, 0x01, 0, 0, 0x96, 0x00, // 1.39 lowpass2
    ];

    #[test]
    fn filter_config_1_16_layout() {
        let mut s = state_at(ApiVersion::V1_16);
        let mut r = FieldReader::new(&FILTER_1_16);
        decode_filter_config(&mut r, &mut s).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(s.filter_config.gyro_lowpass_hz, 90);
        assert_eq!(s.filter_config.dterm_lowpass_hz, 100);

        let mut w = FieldWriter::new();
        encode_set_filter_config(&mut w, &s);
        assert_eq!(w.as_slice(), &FILTER_1_16);

        let mut r = FieldReader::new(&FILTER_1_40);
        decode_filter_config(&mut r, &mut state_at(ApiVersion::V1_16)).unwrap();
        assert_eq!(r.remaining(), FILTER_1_40.len() - FILTER_1_16.len());
    }

    #[test]
    fn filter_config_1_40_keeps_32khz_lpf() {
        let mut s = state_at(ApiVersion::V1_40);
        let mut r = FieldReader::new(&FILTER_1_40);
        decode_filter_config(&mut r, &mut s).unwrap();
        assert_eq!(r.remaining(), 0);
        let f = &s.filter_config;
        assert_eq!(f.gyro_notch_hz, 400);
        assert_eq!(f.dterm_notch_cutoff, 160);
        assert_eq!(f.gyro_notch2_hz, 200);
        assert_eq!(f.dterm_lowpass_type, 1);
        assert_eq!(f.gyro_32khz_hardware_lpf, 1);
        assert_eq!(f.gyro_lowpass_hz, 250);
        assert_eq!(f.gyro_lowpass2_hz, 500);
        assert_eq!(f.dterm_lowpass2_hz, 150);

        let mut w = FieldWriter::new();
        encode_set_filter_config(&mut w, &s);
        assert_eq!(w.as_slice(), &FILTER_1_40);
    }

    #[test]
    fn filter_config_1_41_zeroes_32khz_lpf() {
        let mut payload = FILTER_1_40.to_vec();
        payload.extend_from_slice(&[0, 0xFA, 0x00, 0xF4, 0x01, 0x46, 0x00, 0xAA, 0x00]);
        let mut s = state_at(ApiVersion::V1_41);
        let mut r = FieldReader::new(&payload);
        decode_filter_config(&mut r, &mut s).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(s.filter_config.gyro_32khz_hardware_lpf, 0);
        assert_eq!(s.filter_config.gyro_lowpass_dyn_max_hz, 500);
        assert_eq!(s.filter_config.dterm_lowpass_dyn_max_hz, 170);

        s.filter_config.gyro_32khz_hardware_lpf = 2;
        let mut w = FieldWriter::new();
        encode_set_filter_config(&mut w, &s);
        payload[19] = 0;
        assert_eq!(w.as_slice(), &payload[..]);
    }

    #[test]
    fn rc_tuning_1_16_layout() {
        let payload = [100, 0, 70, 70, 0, 10, 50, 0, 0x72, 0x06, 0, 120];
        let mut s = state_at(ApiVersion::V1_16);
        let mut r = FieldReader::new(&payload);
        decode_rc_tuning(&mut r, &mut s).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(s.rc_tuning.rc_rate, 1.0);
        assert_eq!(s.rc_tuning.pitch_rate, 0.7);
        assert_eq!(s.rc_tuning.dynamic_thr_breakpoint, 1650);
        assert_eq!(s.rc_tuning.rc_yaw_rate, 1.2);

        let mut w = FieldWriter::new();
        encode_set_rc_tuning(&mut w, &s);
        assert_eq!(w.as_slice(), &payload);
    }

    #[test]
    fn rc_tuning_1_43_layout() {
        let payload = [
            100, 0, 70, 70, 0, 10, 50, 0, 0x72, 0x06, 0, 120, // through 1.16
            110, 9, // 1.37 pitch
            1, 90, // 1.41 throttle limit
            0xCE, 0x07, 0xCE, 0x07, 0x08, 0x07, // 1.42 rate limits
            3,    // 1.43 rates type
        ];
        let mut s = state_at(ApiVersion::V1_43);
        let mut r = FieldReader::new(&payload);
        decode_rc_tuning(&mut r, &mut s).unwrap();
        assert_eq!(r.remaining(), 0);
        let t = &s.rc_tuning;
        assert_eq!(t.rc_pitch_rate, 1.1);
        assert_eq!(t.throttle_limit_percent, 90);
        assert_eq!(t.roll_rate_limit, 1998);
        assert_eq!(t.yaw_rate_limit, 1800);
        assert_eq!(t.rates_type, 3);

        let mut w = FieldWriter::new();
        encode_set_rc_tuning(&mut w, &s);
        assert_eq!(w.as_slice(), &payload);

        let mut r = FieldReader::new(&payload);
        decode_rc_tuning(&mut r, &mut state_at(ApiVersion::V1_16)).unwrap();
        assert_eq!(r.remaining(), 11);
    }

    #[test]
    fn advanced_config_swaps_legacy_protocol_ids() {
        let payload = [1, 2, 0, 5, 0xE0, 0x01];
        let mut s = state_at(ApiVersion::V1_21);
        decode_advanced_config(&mut FieldReader::new(&payload), &mut s).unwrap();
        assert_eq!(s.advanced_config.fast_pwm_protocol, 7);

        let mut w = FieldWriter::new();
        encode_set_advanced_config(&mut w, &s);
        assert_eq!(w.as_slice(), &payload);

        let mut s = state_at(ApiVersion::V1_26);
        let payload = [1, 2, 0, 5, 0xE0, 0x01, 0x2C, 0x01, 0];
        decode_advanced_config(&mut FieldReader::new(&payload), &mut s).unwrap();
        assert_eq!(s.advanced_config.fast_pwm_protocol, 5);
        assert_eq!(s.advanced_config.digital_idle_percent, 3.0);
    }

    #[test]
    fn advanced_config_writes_gyro_to_use_into_alignment() {
        let mut payload = vec![1, 2, 0, 6, 0xE0, 0x01, 0x2C, 0x01, 0];
        payload.extend_from_slice(&[0, 2, 1, 48, 0x7D, 0x00, 0, 0, 2, 0, 44]);
        let mut s = state_at(ApiVersion::V1_42);
        let mut r = FieldReader::new(&payload);
        decode_advanced_config(&mut r, &mut s).unwrap();

        assert_eq!(s.sensor_alignment.gyro_to_use, 2);
        assert_eq!(s.advanced_config.gyro_calib_duration, 125);
        assert_eq!(s.advanced_config.debug_mode_count, 44);
        assert_eq!(r.remaining(), 0);

        let mut w = FieldWriter::new();
        encode_set_advanced_config(&mut w, &s);
        assert_eq!(w.as_slice(), &payload[..payload.len() - 1]);
    }
}
