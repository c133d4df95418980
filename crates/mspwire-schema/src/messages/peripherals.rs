//! Serial ports, LED strip, storage, blackbox, transponder and VTX.

use tracing::debug;

use crate::cursor::{FieldReader, FieldWriter};
use crate::error::{DecodeError, Result};
use crate::state::{
    Dataflash, FcState, Led, LedColor, LedModeColor, SerialPort, TransponderProvider,
    LED_BASE_FUNCTION_LETTERS, LED_DIRECTION_LETTERS, LED_LEGACY_FUNCTION_LETTERS,
    LED_OVERLAY_LETTERS, LED_OVERLAY_LETTERS_LEGACY,
};
use crate::version::ApiVersion;

/// Four global `u32` baud rates trail the legacy (< 1.6) serial layout.
const LEGACY_SERIAL_TRAILER: usize = 16;
const LEGACY_SERIAL_STRIDE: usize = 2;
const SERIAL_STRIDE: usize = 7;
const LEGACY_LED_STRIDE: usize = 7;
const LED_STRIDE: usize = 4;
const LED_PROFILE_TRAILER: usize = 2;
const DATAFLASH_SUMMARY_LEN: usize = 13;

pub(crate) fn decode_cf_serial_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let serial = &mut s.serial_config;
    serial.ports.clear();

    if s.config.api_version.less_than(ApiVersion::V1_6) {
        let ports_len = r.remaining().checked_sub(LEGACY_SERIAL_TRAILER).ok_or_else(|| {
            DecodeError::InvalidLength(format!(
                "legacy serial config needs {LEGACY_SERIAL_TRAILER} bytes, got {}",
                r.remaining()
            ))
        })?;
        if ports_len % LEGACY_SERIAL_STRIDE != 0 {
            return Err(DecodeError::StrideMismatch {
                len: ports_len,
                stride: LEGACY_SERIAL_STRIDE,
            });
        }
        for _ in 0..ports_len / LEGACY_SERIAL_STRIDE {
            serial.ports.push(SerialPort {
                identifier: r.read_u8()?,
                scenario: r.read_u8()?,
                ..Default::default()
            });
        }
        serial.msp_baudrate = r.read_u32()?;
        serial.cli_baudrate = r.read_u32()?;
        serial.gps_baudrate = r.read_u32()?;
        serial.gps_passthrough_baudrate = r.read_u32()?;
        return Ok(());
    }

    for _ in 0..r.records(SERIAL_STRIDE)? {
        serial.ports.push(SerialPort {
            identifier: r.read_u8()?,
            functions: u32::from(r.read_u16()?),
            msp_baudrate: r.read_u8()?,
            gps_baudrate: r.read_u8()?,
            telemetry_baudrate: r.read_u8()?,
            blackbox_baudrate: r.read_u8()?,
            scenario: 0,
        });
    }
    Ok(())
}

pub(crate) fn encode_set_cf_serial_config(w: &mut FieldWriter, s: &FcState) {
    let serial = &s.serial_config;
    if s.api_version().less_than(ApiVersion::V1_6) {
        for port in &serial.ports {
            w.write_u8(port.identifier).write_u8(port.scenario);
        }
        w.write_u32(serial.msp_baudrate)
            .write_u32(serial.cli_baudrate)
            .write_u32(serial.gps_baudrate)
            .write_u32(serial.gps_passthrough_baudrate);
        return;
    }
    for port in &serial.ports {
        w.write_u8(port.identifier)
            .write_u16(port.functions as u16)
            .write_u8(port.msp_baudrate)
            .write_u8(port.gps_baudrate)
            .write_u8(port.telemetry_baudrate)
            .write_u8(port.blackbox_baudrate);
    }
}

/// `MSP2_COMMON_SERIAL_CONFIG`: count-prefixed, each entry padded to an equal share of the payload.
pub(crate) fn decode_common_serial_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let ports = &mut s.serial_config.ports;
    ports.clear();
    let count = r.read_u8()? as usize;
    if count == 0 {
        return Ok(());
    }
    let entry_len = r.remaining() / count;
    for _ in 0..count {
        let start = r.position();
        ports.push(SerialPort {
            identifier: r.read_u8()?,
            functions: r.read_u32()?,
            msp_baudrate: r.read_u8()?,
            gps_baudrate: r.read_u8()?,
            telemetry_baudrate: r.read_u8()?,
            blackbox_baudrate: r.read_u8()?,
            scenario: 0,
        });
        let consumed = r.position() - start;
        if consumed < entry_len {
            r.skip(entry_len - consumed)?;
        }
    }
    Ok(())
}

pub(crate) fn encode_common_set_serial_config(w: &mut FieldWriter, s: &FcState) {
    let ports = &s.serial_config.ports;
    let ports = &ports[..ports.len().min(u8::MAX as usize)];
    w.write_u8(ports.len() as u8);
    for port in ports {
        w.write_u8(port.identifier)
            .write_u32(port.functions)
            .write_u8(port.msp_baudrate)
            .write_u8(port.gps_baudrate)
            .write_u8(port.telemetry_baudrate)
            .write_u8(port.blackbox_baudrate);
    }
}

fn letters_from_mask(mask: u32, letters: &[char]) -> Vec<char> {
    letters
        .iter()
        .enumerate()
        .filter(|(bit, _)| mask & (1u32 << *bit) != 0)
        .map(|(_, &letter)| letter)
        .collect()
}

fn mask_from_letters(chosen: &[char], letters: &[char]) -> u32 {
    letters
        .iter()
        .enumerate()
        .filter(|(_, letter)| chosen.contains(*letter))
        .fold(0u32, |mask, (bit, _)| mask | (1u32 << bit))
}

fn overlay_letters(version: ApiVersion) -> &'static [char] {
    if version.at_least(ApiVersion::V1_36) {
        &LED_OVERLAY_LETTERS
    } else {
        &LED_OVERLAY_LETTERS_LEGACY
    }
}

/// Unpack one 32-bit LED definition (API 1.20+).
fn led_from_mask(mask: u32, version: ApiVersion) -> Led {
    let function_id = ((mask >> 8) & 0xF) as usize;
    let mut functions: Vec<char> = LED_BASE_FUNCTION_LETTERS
        .get(function_id)
        .copied()
        .into_iter()
        .collect();
    functions.extend(letters_from_mask((mask >> 12) & 0x3F, overlay_letters(version)));
    Led {
        directions: letters_from_mask((mask >> 22) & 0x3F, &LED_DIRECTION_LETTERS),
        functions,
        x: ((mask >> 4) & 0xF) as u8,
        y: (mask & 0xF) as u8,
        color: ((mask >> 18) & 0xF) as u8,
        parameters: ((mask >> 28) & 0xF) as u8,
    }
}

fn led_to_mask(led: &Led, version: ApiVersion) -> u32 {
    let function_id = LED_BASE_FUNCTION_LETTERS
        .iter()
        .position(|letter| led.functions.contains(letter))
        .unwrap_or(0) as u32;
    let overlay = mask_from_letters(&led.functions, overlay_letters(version));
    let directions = mask_from_letters(&led.directions, &LED_DIRECTION_LETTERS);
    u32::from(led.y & 0xF)
        | u32::from(led.x & 0xF) << 4
        | function_id << 8
        | overlay << 12
        | u32::from(led.color & 0xF) << 18
        | directions << 22
        | u32::from(led.parameters & 0xF) << 28
}

pub(crate) fn decode_led_strip_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    let strip = &mut s.led_strip;
    strip.leds.clear();

    if version.less_than(ApiVersion::V1_20) {
        for _ in 0..r.records(LEGACY_LED_STRIDE)? {
            let directions = letters_from_mask(u32::from(r.read_u16()?), &LED_DIRECTION_LETTERS);
            let functions = letters_from_mask(u32::from(r.read_u16()?), &LED_LEGACY_FUNCTION_LETTERS);
            strip.leds.push(Led {
                directions,
                functions,
                x: r.read_u8()?,
                y: r.read_u8()?,
                color: r.read_u8()?,
                parameters: 0,
            });
        }
        return Ok(());
    }

    let has_trailer = version.at_least(ApiVersion::V1_41);
    let led_bytes = if has_trailer {
        r.remaining().checked_sub(LED_PROFILE_TRAILER).ok_or_else(|| {
            DecodeError::InvalidLength("LED strip config is missing its profile trailer".into())
        })?
    } else {
        r.remaining()
    };
    if led_bytes % LED_STRIDE != 0 {
        return Err(DecodeError::StrideMismatch {
            len: led_bytes,
            stride: LED_STRIDE,
        });
    }
    for _ in 0..led_bytes / LED_STRIDE {
        let mask = r.read_u32()?;
        strip.leds.push(led_from_mask(mask, version));
    }
    if has_trailer {
        strip.profile_support = r.read_bool()?;
        strip.current_profile = r.read_u8()?;
    }
    Ok(())
}

/// One `MSP_SET_LED_STRIP_CONFIG` upload item.
pub(crate) fn write_led_item(w: &mut FieldWriter, index: u8, led: &Led, version: ApiVersion) {
    w.write_u8(index);
    if version.less_than(ApiVersion::V1_20) {
        w.write_u16(mask_from_letters(&led.directions, &LED_DIRECTION_LETTERS) as u16)
            .write_u16(mask_from_letters(&led.functions, &LED_LEGACY_FUNCTION_LETTERS) as u16)
            .write_u8(led.x)
            .write_u8(led.y)
            .write_u8(led.color);
    } else {
        w.write_u32(led_to_mask(led, version));
    }
}

pub(crate) fn decode_led_colors(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.records(4)?;
    s.led_colors.clear();
    for _ in 0..count {
        s.led_colors.push(LedColor {
            h: r.read_u16()?,
            s: r.read_u8()?,
            v: r.read_u8()?,
        });
    }
    Ok(())
}

pub(crate) fn encode_set_led_colors(w: &mut FieldWriter, s: &FcState) {
    for color in &s.led_colors {
        w.write_u16(color.h).write_u8(color.s).write_u8(color.v);
    }
}

pub(crate) fn decode_led_strip_modecolor(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.records(3)?;
    s.led_mode_colors.clear();
    for _ in 0..count {
        s.led_mode_colors.push(LedModeColor {
            mode: r.read_u8()?,
            direction: r.read_u8()?,
            color: r.read_u8()?,
        });
    }
    Ok(())
}

/// One `MSP_SET_LED_STRIP_MODECOLOR` upload item.
pub(crate) fn write_led_mode_color_item(w: &mut FieldWriter, mode_color: &LedModeColor) {
    w.write_u8(mode_color.mode)
        .write_u8(mode_color.direction)
        .write_u8(mode_color.color);
}

pub(crate) fn decode_dataflash_summary(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    if r.remaining() < DATAFLASH_SUMMARY_LEN {
        debug!(len = r.remaining(), "dataflash not present");
        r.rest();
        s.dataflash = Dataflash::default();
        return Ok(());
    }
    let flags = r.read_u8()?;
    let ready = flags & 0x01 != 0;
    s.dataflash = Dataflash {
        ready,
        supported: flags & 0x02 != 0 || ready,
        sectors: r.read_u32()?,
        total_size: r.read_u32()?,
        used_size: r.read_u32()?,
    };
    r.rest();
    Ok(())
}

pub(crate) fn decode_sdcard_summary(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let sd = &mut s.sdcard;
    sd.supported = r.read_u8()? & 0x01 != 0;
    sd.state = r.read_u8()?;
    sd.filesystem_last_error = r.read_u8()?;
    sd.free_size_kb = r.read_u32()?;
    sd.total_size_kb = r.read_u32()?;
    Ok(())
}

pub(crate) fn decode_blackbox_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    let b = &mut s.blackbox;
    b.supported = r.read_u8()? & 0x01 != 0;
    b.device = r.read_u8()?;
    b.rate_num = r.read_u8()?;
    b.rate_denom = r.read_u8()?;
    if version.at_least(ApiVersion::V1_36) {
        b.p_denom = r.read_u16()?;
    }
    if version.at_least(ApiVersion::V1_44) {
        b.sample_rate = r.read_u8()?;
    }
    Ok(())
}

pub(crate) fn encode_set_blackbox_config(w: &mut FieldWriter, s: &FcState) {
    let version = s.api_version();
    let b = &s.blackbox;
    w.write_u8(b.device).write_u8(b.rate_num).write_u8(b.rate_denom);
    if version.at_least(ApiVersion::V1_36) {
        w.write_u16(b.p_denom);
    }
    if version.at_least(ApiVersion::V1_44) {
        w.write_u8(b.sample_rate);
    }
}

pub(crate) fn decode_transponder_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    let t = &mut s.transponder;
    t.providers.clear();
    if version.less_than(ApiVersion::V1_33) {
        t.supported = r.read_u8()? & 0x01 != 0;
        t.data = r.rest().to_vec();
        return Ok(());
    }
    let provider_count = r.read_u8()?;
    t.supported = provider_count > 0;
    for _ in 0..provider_count {
        t.providers.push(TransponderProvider {
            id: r.read_u8()?,
            data_length: r.read_u8()?,
        });
    }
    t.provider = r.read_u8()?;
    t.data = r.rest().to_vec();
    Ok(())
}

pub(crate) fn encode_set_transponder_config(w: &mut FieldWriter, s: &FcState) {
    let t = &s.transponder;
    if s.api_version().at_least(ApiVersion::V1_33) {
        w.write_u8(t.provider);
    }
    w.write_bytes(&t.data);
}

pub(crate) fn decode_vtx_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    let v = &mut s.vtx_config;
    v.device_type = r.read_u8()?;
    v.band = r.read_u8()?;
    v.channel = r.read_u8()?;
    v.power = r.read_u8()?;
    v.pit_mode = r.read_bool()?;
    v.frequency = r.read_u16()?;
    v.device_ready = r.read_bool()?;
    v.low_power_disarm = r.read_u8()?;
    if version.at_least(ApiVersion::V1_42) {
        v.pit_mode_frequency = r.read_u16()?;
        v.table_available = r.read_bool()?;
        v.table_bands = r.read_u8()?;
        v.table_channels = r.read_u8()?;
        v.table_powerlevels = r.read_u8()?;
        v.table_clear = false;
    }
    Ok(())
}

pub(crate) fn encode_set_vtx_config(w: &mut FieldWriter, s: &FcState) {
    let v = &s.vtx_config;
    w.write_u16(v.frequency)
        .write_u8(v.power)
        .write_bool(v.pit_mode)
        .write_u8(v.low_power_disarm);
    if s.api_version().at_least(ApiVersion::V1_42) {
        w.write_u16(v.pit_mode_frequency)
            .write_u8(v.band)
            .write_u8(v.channel)
            .write_u16(v.frequency)
            .write_u8(v.table_bands)
            .write_u8(v.table_channels)
            .write_u8(v.table_powerlevels)
            .write_bool(v.table_clear);
    }
}

pub(crate) fn decode_vtxtable_band(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let band = &mut s.vtx_table_band;
    band.number = r.read_u8()?;
    band.name = r.read_pstring()?;
    band.letter = r.read_string(1)?;
    band.is_factory_band = r.read_bool()?;
    let count = r.read_u8()?;
    band.frequencies.clear();
    for _ in 0..count {
        band.frequencies.push(r.read_u16()?);
    }
    Ok(())
}

pub(crate) fn encode_set_vtxtable_band(w: &mut FieldWriter, s: &FcState) {
    let band = &s.vtx_table_band;
    let letter = band.letter.bytes().next().unwrap_or(b' ');
    let frequencies = &band.frequencies[..band.frequencies.len().min(u8::MAX as usize)];
    w.write_u8(band.number)
        .write_pstring(&band.name)
        .write_u8(letter)
        .write_bool(band.is_factory_band)
        .write_u8(frequencies.len() as u8);
    for &frequency in frequencies {
        w.write_u16(frequency);
    }
}

pub(crate) fn decode_vtxtable_powerlevel(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let level = &mut s.vtx_table_power_level;
    level.number = r.read_u8()?;
    level.value = r.read_u16()?;
    level.label = r.read_pstring()?;
    Ok(())
}

pub(crate) fn encode_set_vtxtable_powerlevel(w: &mut FieldWriter, s: &FcState) {
    let level = &s.vtx_table_power_level;
    w.write_u8(level.number)
        .write_u16(level.value)
        .write_pstring(&level.label);
}
