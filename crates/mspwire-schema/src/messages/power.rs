//! Battery and meter configuration.

use tracing::debug;

use crate::cursor::{scaled_u16, scaled_u8, FieldReader, FieldWriter};
use crate::error::Result;
use crate::state::{BatteryConfig, CurrentMeterConfig, FcState, VoltageMeterConfig};
use crate::version::ApiVersion;

const VOLTAGE_METER_ITEM_LEN: u8 = 5;
const CURRENT_METER_ITEM_LEN: u8 = 6;

pub(crate) fn decode_voltage_meter_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    if version.less_than(ApiVersion::V1_36) {
        let misc = &mut s.misc;
        misc.vbatscale = r.read_u8()?;
        misc.vbatmincellvoltage = f64::from(r.read_u8()?) / 10.0;
        misc.vbatmaxcellvoltage = f64::from(r.read_u8()?) / 10.0;
        misc.vbatwarningcellvoltage = f64::from(r.read_u8()?) / 10.0;
        if version.at_least(ApiVersion::V1_23) {
            misc.batterymetertype = r.read_u8()?;
        }
        return Ok(());
    }

    s.voltage_meter_configs.clear();
    let count = r.read_u8()?;
    for _ in 0..count {
        let item_len = r.read_u8()?;
        if item_len != VOLTAGE_METER_ITEM_LEN {
            debug!(item_len, "skipping voltage meter entry with unknown layout");
            r.skip(item_len as usize)?;
            continue;
        }
        s.voltage_meter_configs.push(VoltageMeterConfig {
            id: r.read_u8()?,
            sensor_type: r.read_u8()?,
            vbatscale: r.read_u8()?,
            vbatresdivval: r.read_u8()?,
            vbatresdivmultiplier: r.read_u8()?,
        });
    }
    Ok(())
}

/// Single-frame layout used before per-meter configuration.
pub(crate) fn encode_set_voltage_meter_config(w: &mut FieldWriter, s: &FcState) {
    let misc = &s.misc;
    w.write_u8(misc.vbatscale)
        .write_u8(scaled_u8(misc.vbatmincellvoltage, 10.0))
        .write_u8(scaled_u8(misc.vbatmaxcellvoltage, 10.0))
        .write_u8(scaled_u8(misc.vbatwarningcellvoltage, 10.0));
    if s.api_version().at_least(ApiVersion::V1_23) {
        w.write_u8(misc.batterymetertype);
    }
}

/// One `MSP_SET_VOLTAGE_METER_CONFIG` upload item (API 1.36+).
pub(crate) fn write_voltage_meter_item(w: &mut FieldWriter, meter: &VoltageMeterConfig) {
    w.write_u8(meter.id)
        .write_u8(meter.vbatscale)
        .write_u8(meter.vbatresdivval)
        .write_u8(meter.vbatresdivmultiplier);
}

pub(crate) fn decode_current_meter_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    if s.api_version().less_than(ApiVersion::V1_36) {
        let legacy = &mut s.legacy_current_meter;
        legacy.current_scale = r.read_i16()?;
        legacy.current_offset = r.read_i16()?;
        legacy.current_meter_type = r.read_u8()?;
        legacy.battery_capacity = r.read_u16()?;
        return Ok(());
    }

    s.current_meter_configs.clear();
    let count = r.read_u8()?;
    for _ in 0..count {
        let item_len = r.read_u8()?;
        if item_len != CURRENT_METER_ITEM_LEN {
            debug!(item_len, "skipping current meter entry with unknown layout");
            r.skip(item_len as usize)?;
            continue;
        }
        s.current_meter_configs.push(CurrentMeterConfig {
            id: r.read_u8()?,
            sensor_type: r.read_u8()?,
            scale: r.read_i16()?,
            offset: r.read_i16()?,
        });
    }
    Ok(())
}

pub(crate) fn encode_set_current_meter_config(w: &mut FieldWriter, s: &FcState) {
    let legacy = &s.legacy_current_meter;
    w.write_i16(legacy.current_scale)
        .write_i16(legacy.current_offset)
        .write_u8(legacy.current_meter_type)
        .write_u16(legacy.battery_capacity);
}

/// One `MSP_SET_CURRENT_METER_CONFIG` upload item (API 1.36+).
pub(crate) fn write_current_meter_item(w: &mut FieldWriter, meter: &CurrentMeterConfig) {
    w.write_u8(meter.id)
        .write_i16(meter.scale)
        .write_i16(meter.offset);
}

fn read_cell_voltages(r: &mut FieldReader<'_>, b: &mut BatteryConfig, scale: f64, wide: bool) -> Result<()> {
    let mut next = || -> Result<f64> {
        let raw = if wide {
            f64::from(r.read_u16()?)
        } else {
            f64::from(r.read_u8()?)
        };
        Ok(raw / scale)
    };
    b.vbat_min_cell_voltage = next()?;
    b.vbat_max_cell_voltage = next()?;
    b.vbat_warning_cell_voltage = next()?;
    Ok(())
}

pub(crate) fn decode_battery_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let b = &mut s.battery_config;
    read_cell_voltages(r, b, 10.0, false)?;
    b.capacity = r.read_u16()?;
    b.voltage_meter_source = r.read_u8()?;
    b.current_meter_source = r.read_u8()?;
    if s.config.api_version.at_least(ApiVersion::V1_41) {
        read_cell_voltages(r, b, 100.0, true)?;
    }
    Ok(())
}

pub(crate) fn encode_set_battery_config(w: &mut FieldWriter, s: &FcState) {
    let b = &s.battery_config;
    w.write_u8(scaled_u8(b.vbat_min_cell_voltage, 10.0))
        .write_u8(scaled_u8(b.vbat_max_cell_voltage, 10.0))
        .write_u8(scaled_u8(b.vbat_warning_cell_voltage, 10.0))
        .write_u16(b.capacity)
        .write_u8(b.voltage_meter_source)
        .write_u8(b.current_meter_source);
    if s.api_version().at_least(ApiVersion::V1_41) {
        w.write_u16(scaled_u16(b.vbat_min_cell_voltage, 100.0))
            .write_u16(scaled_u16(b.vbat_max_cell_voltage, 100.0))
            .write_u16(scaled_u16(b.vbat_warning_cell_voltage, 100.0));
    }
}
