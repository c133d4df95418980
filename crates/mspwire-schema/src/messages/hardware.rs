//! Motors, servos, sensors, GPS and board setup.

use tracing::debug;

use crate::cursor::{scaled_u8, FieldReader, FieldWriter};
use crate::error::Result;
use crate::ladder::{read_ladder, write_ladder, Rung};
use crate::state::{FcState, GpsConfig, GpsRescue, MotorConfig, SensorAlignment, ServoConfig};
use crate::version::ApiVersion;

/// Wire value for "no forwarded channel".
const NO_FORWARD_CHANNEL: u8 = 255;
/// API 1.10.0 reports ten servo slots but only drives eight.
const SERVO_LIMIT_1_10: usize = 8;
const API_1_10_0: ApiVersion = ApiVersion::new(1, 10, 0);

fn motor_limits(r: &mut FieldReader<'_>, m: &mut MotorConfig, _: ApiVersion) -> Result<()> {
    m.minthrottle = r.read_u16()?;
    m.maxthrottle = r.read_u16()?;
    m.mincommand = r.read_u16()?;
    Ok(())
}

fn motor_limits_write(w: &mut FieldWriter, m: &MotorConfig, _: ApiVersion) {
    w.write_u16(m.minthrottle)
        .write_u16(m.maxthrottle)
        .write_u16(m.mincommand);
}

fn motor_count(r: &mut FieldReader<'_>, m: &mut MotorConfig, _: ApiVersion) -> Result<()> {
    m.motor_count = r.read_u8()?;
    Ok(())
}

fn motor_telemetry(r: &mut FieldReader<'_>, m: &mut MotorConfig, _: ApiVersion) -> Result<()> {
    m.motor_poles = r.read_u8()?;
    m.use_dshot_telemetry = r.read_bool()?;
    m.use_esc_sensor = r.read_bool()?;
    Ok(())
}

/// The set layout stops before the ESC sensor flag.
fn motor_telemetry_write(w: &mut FieldWriter, m: &MotorConfig, _: ApiVersion) {
    w.write_u8(m.motor_poles).write_bool(m.use_dshot_telemetry);
}

pub(crate) const MOTOR_CONFIG: &[Rung<MotorConfig>] = &[
    Rung::new(ApiVersion::UNKNOWN, motor_limits, motor_limits_write),
    Rung::read_only(ApiVersion::V1_42, motor_count),
    Rung::new(ApiVersion::V1_42, motor_telemetry, motor_telemetry_write),
];

pub(crate) fn decode_motor_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(MOTOR_CONFIG, version, r, &mut s.motor_config)
}

pub(crate) fn encode_set_motor_config(w: &mut FieldWriter, s: &FcState) {
    write_ladder(MOTOR_CONFIG, s.api_version(), w, &s.motor_config);
}

pub(crate) fn decode_motor_3d_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let m = &mut s.motor_3d_config;
    m.deadband3d_low = r.read_u16()?;
    m.deadband3d_high = r.read_u16()?;
    m.neutral = r.read_u16()?;
    if s.config.api_version.less_than(ApiVersion::V1_17) {
        s.rc_deadband.deadband3d_throttle = r.read_u16()?;
    }
    Ok(())
}

pub(crate) fn encode_set_motor_3d_config(w: &mut FieldWriter, s: &FcState) {
    let m = &s.motor_3d_config;
    w.write_u16(m.deadband3d_low)
        .write_u16(m.deadband3d_high)
        .write_u16(m.neutral);
    if s.api_version().less_than(ApiVersion::V1_17) {
        w.write_u16(s.rc_deadband.deadband3d_throttle);
    }
}

pub(crate) fn decode_mixer_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.mixer_config.mixer = r.read_u8()?;
    if s.api_version().at_least(ApiVersion::V1_36) {
        s.mixer_config.reverse_motor_dir = r.read_u8()?;
    }
    Ok(())
}

pub(crate) fn encode_set_mixer_config(w: &mut FieldWriter, s: &FcState) {
    w.write_u8(s.mixer_config.mixer);
    if s.api_version().at_least(ApiVersion::V1_36) {
        w.write_u8(s.mixer_config.reverse_motor_dir);
    }
}

fn forward_channel(raw: u8) -> Option<u8> {
    (raw != NO_FORWARD_CHANNEL).then_some(raw)
}

pub(crate) fn decode_servo_configurations(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    let stride = if version.at_least(ApiVersion::V1_33) {
        12
    } else if version.at_least(ApiVersion::V1_12) {
        14
    } else {
        7
    };
    let count = r.records(stride)?;
    s.servo_configs.clear();
    for _ in 0..count {
        let mut servo = ServoConfig {
            min: r.read_u16()?,
            max: r.read_u16()?,
            middle: r.read_u16()?,
            rate: r.read_i8()?,
            ..Default::default()
        };
        if stride == 14 {
            servo.angle_at_min = r.read_u8()?;
            servo.angle_at_max = r.read_u8()?;
        }
        if stride != 7 {
            servo.index_of_channel_to_forward = forward_channel(r.read_u8()?);
            servo.reversed_input_sources = r.read_u32()?;
        }
        s.servo_configs.push(servo);
    }
    if version == API_1_10_0 && s.servo_configs.len() > SERVO_LIMIT_1_10 {
        debug!(reported = count, "dropping unused servo slots");
        s.servo_configs.truncate(SERVO_LIMIT_1_10);
    }
    Ok(())
}

/// Single-frame servo layout used before per-servo uploads (API < 1.12).
pub(crate) fn encode_set_servo_configuration(w: &mut FieldWriter, s: &FcState) {
    for servo in &s.servo_configs {
        w.write_u16(servo.min)
            .write_u16(servo.max)
            .write_u16(servo.middle)
            .write_i8(servo.rate);
    }
}

/// One `MSP_SET_SERVO_CONFIGURATION` upload item (API 1.12+).
pub(crate) fn write_servo_item(w: &mut FieldWriter, index: u8, servo: &ServoConfig, version: ApiVersion) {
    w.write_u8(index)
        .write_u16(servo.min)
        .write_u16(servo.max)
        .write_u16(servo.middle)
        .write_i8(servo.rate);
    if version.less_than(ApiVersion::V1_33) {
        w.write_u8(servo.angle_at_min).write_u8(servo.angle_at_max);
    }
    w.write_u8(servo.index_of_channel_to_forward.unwrap_or(NO_FORWARD_CHANNEL))
        .write_u32(servo.reversed_input_sources);
}

fn alignment_base(r: &mut FieldReader<'_>, a: &mut SensorAlignment, _: ApiVersion) -> Result<()> {
    a.align_gyro = r.read_u8()?;
    a.align_acc = r.read_u8()?;
    a.align_mag = r.read_u8()?;
    Ok(())
}

fn alignment_base_write(w: &mut FieldWriter, a: &SensorAlignment, _: ApiVersion) {
    w.write_u8(a.align_gyro)
        .write_u8(a.align_acc)
        .write_u8(a.align_mag);
}

fn alignment_detection(r: &mut FieldReader<'_>, a: &mut SensorAlignment, _: ApiVersion) -> Result<()> {
    a.gyro_detection_flags = r.read_u8()?;
    Ok(())
}

fn alignment_dual_gyro(r: &mut FieldReader<'_>, a: &mut SensorAlignment, _: ApiVersion) -> Result<()> {
    a.gyro_to_use = r.read_u8()?;
    a.gyro_1_align = r.read_u8()?;
    a.gyro_2_align = r.read_u8()?;
    Ok(())
}

fn alignment_dual_gyro_write(w: &mut FieldWriter, a: &SensorAlignment, _: ApiVersion) {
    w.write_u8(a.gyro_to_use)
        .write_u8(a.gyro_1_align)
        .write_u8(a.gyro_2_align);
}

pub(crate) const SENSOR_ALIGNMENT: &[Rung<SensorAlignment>] = &[
    Rung::new(ApiVersion::UNKNOWN, alignment_base, alignment_base_write),
    Rung::read_only(ApiVersion::V1_41, alignment_detection),
    Rung::new(ApiVersion::V1_41, alignment_dual_gyro, alignment_dual_gyro_write),
];

pub(crate) fn decode_sensor_alignment(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(SENSOR_ALIGNMENT, version, r, &mut s.sensor_alignment)
}

pub(crate) fn encode_set_sensor_alignment(w: &mut FieldWriter, s: &FcState) {
    write_ladder(SENSOR_ALIGNMENT, s.api_version(), w, &s.sensor_alignment);
}

pub(crate) fn decode_board_alignment(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let b = &mut s.board_alignment;
    b.roll = r.read_i16()?;
    b.pitch = r.read_i16()?;
    b.yaw = r.read_i16()?;
    Ok(())
}

pub(crate) fn encode_set_board_alignment(w: &mut FieldWriter, s: &FcState) {
    let b = &s.board_alignment;
    w.write_i16(b.roll).write_i16(b.pitch).write_i16(b.yaw);
}

pub(crate) fn decode_arming_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.arming_config.auto_disarm_delay = r.read_u8()?;
    s.arming_config.disarm_kill_switch = r.read_u8()?;
    if s.api_version().at_least(ApiVersion::V1_37) {
        s.arming_config.small_angle = r.read_u8()?;
    }
    Ok(())
}

pub(crate) fn encode_set_arming_config(w: &mut FieldWriter, s: &FcState) {
    let a = &s.arming_config;
    w.write_u8(a.auto_disarm_delay).write_u8(a.disarm_kill_switch);
    if s.api_version().at_least(ApiVersion::V1_37) {
        w.write_u8(a.small_angle);
    }
}

pub(crate) fn decode_sensor_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let c = &mut s.sensor_config;
    c.acc_hardware = r.read_u8()?;
    c.baro_hardware = r.read_u8()?;
    c.mag_hardware = r.read_u8()?;
    Ok(())
}

pub(crate) fn encode_set_sensor_config(w: &mut FieldWriter, s: &FcState) {
    let c = &s.sensor_config;
    w.write_u8(c.acc_hardware)
        .write_u8(c.baro_hardware)
        .write_u8(c.mag_hardware);
}

pub(crate) fn decode_beeper_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    let b = &mut s.beeper_config;
    b.beepers = r.read_u32()?;
    if version.at_least(ApiVersion::V1_37) {
        b.dshot_beacon_tone = r.read_u8()?;
    }
    if version.at_least(ApiVersion::V1_39) {
        b.dshot_beacon_conditions = r.read_u32()?;
    }
    Ok(())
}

pub(crate) fn encode_set_beeper_config(w: &mut FieldWriter, s: &FcState) {
    let version = s.api_version();
    let b = &s.beeper_config;
    w.write_u32(b.beepers);
    if version.at_least(ApiVersion::V1_37) {
        w.write_u8(b.dshot_beacon_tone);
    }
    if version.at_least(ApiVersion::V1_39) {
        w.write_u32(b.dshot_beacon_conditions);
    }
}

pub(crate) fn decode_feature_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.features = r.read_u32()?;
    Ok(())
}

pub(crate) fn encode_set_feature_config(w: &mut FieldWriter, s: &FcState) {
    w.write_u32(s.features);
}

pub(crate) fn decode_loop_time(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.loop_time = r.read_u16()?;
    Ok(())
}

pub(crate) fn encode_set_loop_time(w: &mut FieldWriter, s: &FcState) {
    w.write_u16(s.loop_time);
}

pub(crate) fn decode_acc_trim(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    for trim in s.accelerometer_trims.iter_mut() {
        *trim = r.read_i16()?;
    }
    Ok(())
}

pub(crate) fn encode_set_acc_trim(w: &mut FieldWriter, s: &FcState) {
    for trim in s.accelerometer_trims {
        w.write_i16(trim);
    }
}

/// `MSP_MISC` spreads over motor, GPS, RSSI and battery records.
pub(crate) fn decode_misc(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.misc.midrc = r.read_u16()?;
    s.motor_config.minthrottle = r.read_u16()?;
    s.motor_config.maxthrottle = r.read_u16()?;
    s.motor_config.mincommand = r.read_u16()?;
    s.misc.failsafe_throttle = r.read_u16()?;
    s.gps_config.provider = r.read_u8()?;
    s.misc.gps_baudrate = r.read_u8()?;
    s.gps_config.ublox_sbas = r.read_u8()?;
    s.misc.multiwiicurrentoutput = r.read_u8()?;
    s.rssi_channel = r.read_u8()?;
    s.misc.placeholder2 = r.read_u8()?;
    // Magnetic declination; the host never uses it.
    r.skip(2)?;
    s.misc.vbatscale = r.read_u8()?;
    s.misc.vbatmincellvoltage = f64::from(r.read_u8()?) / 10.0;
    s.misc.vbatmaxcellvoltage = f64::from(r.read_u8()?) / 10.0;
    s.misc.vbatwarningcellvoltage = f64::from(r.read_u8()?) / 10.0;
    Ok(())
}

pub(crate) fn encode_set_misc(w: &mut FieldWriter, s: &FcState) {
    let misc = &s.misc;
    w.write_u16(misc.midrc)
        .write_u16(s.motor_config.minthrottle)
        .write_u16(s.motor_config.maxthrottle)
        .write_u16(s.motor_config.mincommand)
        .write_u16(misc.failsafe_throttle)
        .write_u8(s.gps_config.provider)
        .write_u8(misc.gps_baudrate)
        .write_u8(s.gps_config.ublox_sbas)
        .write_u8(misc.multiwiicurrentoutput)
        .write_u8(s.rssi_channel)
        .write_u8(misc.placeholder2)
        .write_i16(0)
        .write_u8(misc.vbatscale)
        .write_u8(scaled_u8(misc.vbatmincellvoltage, 10.0))
        .write_u8(scaled_u8(misc.vbatmaxcellvoltage, 10.0))
        .write_u8(scaled_u8(misc.vbatwarningcellvoltage, 10.0));
}

fn gps_base(r: &mut FieldReader<'_>, g: &mut GpsConfig, _: ApiVersion) -> Result<()> {
    g.provider = r.read_u8()?;
    g.ublox_sbas = r.read_u8()?;
    Ok(())
}

fn gps_base_write(w: &mut FieldWriter, g: &GpsConfig, _: ApiVersion) {
    w.write_u8(g.provider).write_u8(g.ublox_sbas);
}

fn gps_auto(r: &mut FieldReader<'_>, g: &mut GpsConfig, _: ApiVersion) -> Result<()> {
    g.auto_config = r.read_u8()?;
    g.auto_baud = r.read_u8()?;
    Ok(())
}

fn gps_auto_write(w: &mut FieldWriter, g: &GpsConfig, _: ApiVersion) {
    w.write_u8(g.auto_config).write_u8(g.auto_baud);
}

fn gps_home(r: &mut FieldReader<'_>, g: &mut GpsConfig, _: ApiVersion) -> Result<()> {
    g.home_point_once = r.read_u8()?;
    g.ublox_use_galileo = r.read_u8()?;
    Ok(())
}

fn gps_home_write(w: &mut FieldWriter, g: &GpsConfig, _: ApiVersion) {
    w.write_u8(g.home_point_once).write_u8(g.ublox_use_galileo);
}

pub(crate) const GPS_CONFIG: &[Rung<GpsConfig>] = &[
    Rung::new(ApiVersion::UNKNOWN, gps_base, gps_base_write),
    Rung::new(ApiVersion::V1_34, gps_auto, gps_auto_write),
    Rung::new(ApiVersion::V1_43, gps_home, gps_home_write),
];

pub(crate) fn decode_gps_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(GPS_CONFIG, version, r, &mut s.gps_config)
}

pub(crate) fn encode_set_gps_config(w: &mut FieldWriter, s: &FcState) {
    write_ladder(GPS_CONFIG, s.api_version(), w, &s.gps_config);
}

fn rescue_base(r: &mut FieldReader<'_>, g: &mut GpsRescue, _: ApiVersion) -> Result<()> {
    g.angle = r.read_u16()?;
    g.initial_altitude_m = r.read_u16()?;
    g.descent_distance_m = r.read_u16()?;
    g.rescue_groundspeed = r.read_u16()?;
    g.throttle_min = r.read_u16()?;
    g.throttle_max = r.read_u16()?;
    g.throttle_hover = r.read_u16()?;
    g.sanity_checks = r.read_u8()?;
    g.min_sats = r.read_u8()?;
    Ok(())
}

fn rescue_base_write(w: &mut FieldWriter, g: &GpsRescue, _: ApiVersion) {
    w.write_u16(g.angle)
        .write_u16(g.initial_altitude_m)
        .write_u16(g.descent_distance_m)
        .write_u16(g.rescue_groundspeed)
        .write_u16(g.throttle_min)
        .write_u16(g.throttle_max)
        .write_u16(g.throttle_hover)
        .write_u8(g.sanity_checks)
        .write_u8(g.min_sats);
}

fn rescue_rates(r: &mut FieldReader<'_>, g: &mut GpsRescue, _: ApiVersion) -> Result<()> {
    g.ascend_rate = r.read_u16()?;
    g.descend_rate = r.read_u16()?;
    g.allow_arming_without_fix = r.read_u8()?;
    g.altitude_mode = r.read_u8()?;
    Ok(())
}

fn rescue_rates_write(w: &mut FieldWriter, g: &GpsRescue, _: ApiVersion) {
    w.write_u16(g.ascend_rate)
        .write_u16(g.descend_rate)
        .write_u8(g.allow_arming_without_fix)
        .write_u8(g.altitude_mode);
}

pub(crate) const GPS_RESCUE: &[Rung<GpsRescue>] = &[
    Rung::new(ApiVersion::UNKNOWN, rescue_base, rescue_base_write),
    Rung::new(ApiVersion::V1_43, rescue_rates, rescue_rates_write),
];

pub(crate) fn decode_gps_rescue(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(GPS_RESCUE, version, r, &mut s.gps_rescue)
}

pub(crate) fn encode_set_gps_rescue(w: &mut FieldWriter, s: &FcState) {
    write_ladder(GPS_RESCUE, s.api_version(), w, &s.gps_rescue);
}
