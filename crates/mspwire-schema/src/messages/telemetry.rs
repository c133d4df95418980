//! Live sensor, output and power telemetry.

use crate::cursor::{FieldReader, FieldWriter};
use crate::error::Result;
use crate::ladder::{read_ladder, Rung};
use crate::state::{
    Analog, BatteryState, CurrentMeter, FcState, MotorTelemetry, SatelliteInfo, VoltageMeter,
};
use crate::version::ApiVersion;

/// Raw accelerometer LSB per g.
const ACC_LSB_PER_G: f64 = 512.0;
/// Raw gyro reading to deg/s.
const GYRO_SCALE: f64 = 4.0 / 16.4;
/// Raw magnetometer LSB per gauss.
const MAG_LSB_PER_GAUSS: f64 = 1090.0;

pub(crate) fn decode_raw_imu(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let sensors = &mut s.sensors;
    for axis in sensors.accelerometer.iter_mut() {
        *axis = f64::from(r.read_i16()?) / ACC_LSB_PER_G;
    }
    for axis in sensors.gyroscope.iter_mut() {
        *axis = f64::from(r.read_i16()?) * GYRO_SCALE;
    }
    for axis in sensors.magnetometer.iter_mut() {
        *axis = f64::from(r.read_i16()?) / MAG_LSB_PER_GAUSS;
    }
    Ok(())
}

fn read_u16_list(r: &mut FieldReader<'_>) -> Result<Vec<u16>> {
    let count = r.records(2)?;
    (0..count).map(|_| r.read_u16()).collect()
}

pub(crate) fn decode_servo(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.servo_data = read_u16_list(r)?;
    Ok(())
}

pub(crate) fn decode_motor(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.motor_data = read_u16_list(r)?;
    Ok(())
}

pub(crate) fn decode_rc(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.rc.channels = read_u16_list(r)?;
    s.rc.active_channels = s.rc.channels.len();
    Ok(())
}

pub(crate) fn decode_motor_output_reordering(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.read_u8()? as usize;
    s.motor_output_order = r.read_bytes(count)?.to_vec();
    Ok(())
}

pub(crate) fn encode_set_motor_output_reordering(w: &mut FieldWriter, s: &FcState) {
    let order = &s.motor_output_order[..s.motor_output_order.len().min(u8::MAX as usize)];
    w.write_u8(order.len() as u8).write_bytes(order);
}

pub(crate) fn decode_motor_telemetry(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.read_u8()?;
    s.motor_telemetry.clear();
    for _ in 0..count {
        s.motor_telemetry.push(MotorTelemetry {
            rpm: r.read_u32()?,
            invalid_percent: r.read_u16()?,
            temperature: r.read_u8()?,
            voltage: r.read_u16()?,
            current: r.read_u16()?,
            consumption: r.read_u16()?,
        });
    }
    Ok(())
}

pub(crate) fn decode_raw_gps(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let gps = &mut s.gps;
    gps.fix = r.read_u8()?;
    gps.num_sat = r.read_u8()?;
    gps.lat = r.read_i32()?;
    gps.lon = r.read_i32()?;
    gps.alt = r.read_u16()?;
    gps.speed = r.read_u16()?;
    gps.ground_course = r.read_u16()?;
    Ok(())
}

pub(crate) fn decode_comp_gps(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.gps.distance_to_home = r.read_u16()?;
    s.gps.direction_to_home = r.read_u16()?;
    s.gps.update = r.read_u8()?;
    Ok(())
}

pub(crate) fn decode_gps_sv_info(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.gps.satellites.clear();
    if r.is_empty() {
        return Ok(());
    }
    let channels = r.read_u8()?;
    for _ in 0..channels {
        s.gps.satellites.push(SatelliteInfo {
            channel: r.read_u8()?,
            svid: r.read_u8()?,
            quality: r.read_u8()?,
            cno: r.read_u8()?,
        });
    }
    Ok(())
}

pub(crate) fn decode_attitude(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let k = &mut s.sensors.kinematics;
    k[0] = f64::from(r.read_i16()?) / 10.0;
    k[1] = f64::from(r.read_i16()?) / 10.0;
    k[2] = f64::from(r.read_i16()?);
    Ok(())
}

pub(crate) fn decode_altitude(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.sensors.altitude = f64::from(r.read_i32()?) / 100.0;
    Ok(())
}

pub(crate) fn decode_sonar(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.sensors.sonar = r.read_i32()?;
    Ok(())
}

pub(crate) fn decode_debug(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    for value in s.sensors.debug.iter_mut() {
        *value = r.read_i16()?;
    }
    Ok(())
}

fn analog_base(r: &mut FieldReader<'_>, a: &mut Analog, _: ApiVersion) -> Result<()> {
    a.voltage = f64::from(r.read_u8()?) / 10.0;
    a.mah_drawn = r.read_u16()?;
    a.rssi = r.read_u16()?;
    a.amperage = f64::from(r.read_i16()?) / 100.0;
    Ok(())
}

fn analog_precise_voltage(r: &mut FieldReader<'_>, a: &mut Analog, _: ApiVersion) -> Result<()> {
    a.voltage = f64::from(r.read_u16()?) / 100.0;
    Ok(())
}

pub(crate) const ANALOG: &[Rung<Analog>] = &[
    Rung::read_only(ApiVersion::UNKNOWN, analog_base),
    Rung::read_only(ApiVersion::V1_41, analog_precise_voltage),
];

pub(crate) fn decode_analog(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(ANALOG, version, r, &mut s.analog)
}

pub(crate) fn decode_voltage_meters(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.records(2)?;
    s.voltage_meters.clear();
    for _ in 0..count {
        s.voltage_meters.push(VoltageMeter {
            id: r.read_u8()?,
            voltage: f64::from(r.read_u8()?) / 10.0,
        });
    }
    Ok(())
}

pub(crate) fn decode_current_meters(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.records(5)?;
    s.current_meters.clear();
    for _ in 0..count {
        s.current_meters.push(CurrentMeter {
            id: r.read_u8()?,
            mah_drawn: r.read_u16()?,
            amperage: f64::from(r.read_u16()?) / 1000.0,
        });
    }
    Ok(())
}

fn battery_state_base(r: &mut FieldReader<'_>, b: &mut BatteryState, _: ApiVersion) -> Result<()> {
    b.cell_count = r.read_u8()?;
    b.capacity = r.read_u16()?;
    b.voltage = f64::from(r.read_u8()?) / 10.0;
    b.mah_drawn = r.read_u16()?;
    b.amperage = f64::from(r.read_u16()?) / 100.0;
    Ok(())
}

fn battery_state_status(r: &mut FieldReader<'_>, b: &mut BatteryState, _: ApiVersion) -> Result<()> {
    b.battery_state = r.read_u8()?;
    b.voltage = f64::from(r.read_u16()?) / 100.0;
    Ok(())
}

pub(crate) const BATTERY_STATE: &[Rung<BatteryState>] = &[
    Rung::read_only(ApiVersion::UNKNOWN, battery_state_base),
    Rung::read_only(ApiVersion::V1_41, battery_state_status),
];

pub(crate) fn decode_battery_state(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(BATTERY_STATE, version, r, &mut s.battery_state)
}
