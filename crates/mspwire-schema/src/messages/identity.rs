//! Identity, status and housekeeping messages.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::cursor::{FieldReader, FieldWriter};
use crate::error::Result;
use crate::ladder::{read_ladder, Rung};
use crate::state::{FcConfig, FcState, RebootType};
use crate::version::ApiVersion;

const BOARD_IDENTIFIER_LEN: usize = 4;
const FC_VARIANT_LEN: usize = 4;
const BUILD_DATE_LEN: usize = 11;
const BUILD_TIME_LEN: usize = 8;
const SIGNATURE_LEN: usize = 32;
const MAX_NAME_LEN: usize = 64;
const MCU_TYPE_UNKNOWN: u8 = 255;

pub(crate) fn decode_api_version(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.config.msp_protocol_version = r.read_u8()?;
    let version = ApiVersion::new(r.read_u8()?, r.read_u8()?, 0);
    let previous = s.config.api_version;
    if previous.is_known() && previous != version {
        warn!(%previous, %version, "API version changed within a session");
    }
    debug!(%version, "negotiated API version");
    s.config.api_version = version;
    Ok(())
}

pub(crate) fn decode_fc_variant(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.config.fc_identifier = r.read_string(FC_VARIANT_LEN)?;
    Ok(())
}

pub(crate) fn decode_fc_version(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let (major, minor, patch) = (r.read_u8()?, r.read_u8()?, r.read_u8()?);
    s.config.fc_version = format!("{major}.{minor}.{patch}");
    Ok(())
}

/// Date and time, followed on newer firmware by a short git revision.
pub(crate) fn decode_build_info(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let date = r.read_string(BUILD_DATE_LEN)?;
    let time = r.read_string(BUILD_TIME_LEN)?;
    let revision = String::from_utf8_lossy(r.rest()).into_owned();
    s.config.build_info = if revision.is_empty() {
        format!("{date} {time}")
    } else {
        format!("{date} {time} {revision}")
    };
    Ok(())
}

fn board_base(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    c.board_identifier = r.read_string(BOARD_IDENTIFIER_LEN)?;
    c.board_version = r.read_u16()?;
    c.board_type = 0;
    c.target_capabilities = 0;
    c.target_name.clear();
    c.board_name.clear();
    c.manufacturer_id.clear();
    c.signature.clear();
    c.mcu_type_id = MCU_TYPE_UNKNOWN;
    Ok(())
}

fn board_type(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    c.board_type = r.read_u8()?;
    Ok(())
}

fn board_target(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    c.target_capabilities = r.read_u8()?;
    c.target_name = r.read_pstring()?;
    Ok(())
}

fn board_names(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    c.board_name = r.read_pstring()?;
    c.manufacturer_id = r.read_pstring()?;
    c.signature = r.read_bytes(SIGNATURE_LEN)?.to_vec();
    Ok(())
}

fn board_mcu(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    c.mcu_type_id = r.read_u8()?;
    Ok(())
}

fn board_configuration_state(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    c.configuration_state = r.read_u8()?;
    Ok(())
}

fn board_problems(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    c.sample_rate_hz = r.read_u16()?;
    c.configuration_problems = r.read_u32()?;
    Ok(())
}

pub(crate) const BOARD_INFO: &[Rung<FcConfig>] = &[
    Rung::read_only(ApiVersion::UNKNOWN, board_base),
    Rung::read_only(ApiVersion::V1_35, board_type),
    Rung::read_only(ApiVersion::V1_37, board_target),
    Rung::read_only(ApiVersion::V1_39, board_names),
    Rung::read_only(ApiVersion::V1_41, board_mcu),
    Rung::read_only(ApiVersion::V1_42, board_configuration_state),
    Rung::read_only(ApiVersion::V1_43, board_problems),
];

pub(crate) fn decode_board_info(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(BOARD_INFO, version, r, &mut s.config)
}

pub(crate) fn decode_name(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.config.name = String::from_utf8_lossy(r.rest()).into_owned();
    Ok(())
}

pub(crate) fn encode_set_name(w: &mut FieldWriter, s: &FcState) {
    let bytes = s.config.name.as_bytes();
    w.write_bytes(&bytes[..bytes.len().min(MAX_NAME_LEN)]);
}

fn read_status_common(r: &mut FieldReader<'_>, c: &mut FcConfig) -> Result<()> {
    c.cycle_time = r.read_u16()?;
    c.i2c_error = r.read_u16()?;
    c.active_sensors = r.read_u16()?;
    c.mode = r.read_u32()?;
    c.profile = r.read_u8()?;
    Ok(())
}

pub(crate) fn decode_status(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    read_status_common(r, &mut s.config)
}

fn status_ex_base(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    read_status_common(r, c)?;
    c.cpuload = r.read_u16()?;
    Ok(())
}

fn status_ex_profiles(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    c.num_profiles = r.read_u8()?;
    c.rate_profile = r.read_u8()?;
    Ok(())
}

fn status_ex_arming(r: &mut FieldReader<'_>, c: &mut FcConfig, _: ApiVersion) -> Result<()> {
    let byte_count = r.read_u8()? as usize;
    c.flight_mode_flags = r.read_bytes(byte_count)?.to_vec();
    c.arming_disable_count = r.read_u8()?;
    c.arming_disable_flags = r.read_u32()?;
    Ok(())
}

pub(crate) const STATUS_EX: &[Rung<FcConfig>] = &[
    Rung::read_only(ApiVersion::UNKNOWN, status_ex_base),
    Rung::read_only(ApiVersion::V1_16, status_ex_profiles),
    Rung::read_only(ApiVersion::V1_36, status_ex_arming),
];

pub(crate) fn decode_status_ex(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(STATUS_EX, version, r, &mut s.config)
}

pub(crate) fn decode_uid(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    for word in s.config.uid.iter_mut() {
        *word = r.read_u32()?;
    }
    Ok(())
}

pub(crate) fn decode_reboot(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.reboot.storage_ready = true;
    if s.api_version().less_than(ApiVersion::V1_40) {
        return Ok(());
    }
    let reboot_type = RebootType::from_wire(r.read_i8()?);
    s.reboot.reboot_type = reboot_type;
    if reboot_type.is_mass_storage() && r.read_i8()? == 0 {
        warn!("storage device not ready for mass-storage reboot");
        s.reboot.storage_ready = false;
    }
    Ok(())
}

pub(crate) fn encode_set_reboot(w: &mut FieldWriter, s: &FcState) {
    w.write_i8(s.reboot.reboot_type.to_wire());
}

pub(crate) fn encode_arming_disable(w: &mut FieldWriter, s: &FcState) {
    w.write_bool(s.config.arming_disabled)
        .write_bool(s.config.runaway_takeoff_prevention_disabled);
}

pub(crate) fn encode_set_rtc(w: &mut FieldWriter, s: &FcState) {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    write_rtc(w, now_ms, s.api_version());
}

/// `MSP_SET_RTC` body for a wall-clock time in milliseconds since the Unix epoch.
pub fn write_rtc(w: &mut FieldWriter, unix_ms: u64, version: ApiVersion) {
    let secs = unix_ms / 1000;
    if version.at_least(ApiVersion::V1_41) {
        w.write_u32(secs as u32).write_u16((unix_ms % 1000) as u16);
        return;
    }
    let days = (secs / 86_400) as i64;
    let day_secs = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    w.write_u16(year as u16)
        .write_u8(month as u8)
        .write_u8(day as u8)
        .write_u8((day_secs / 3600) as u8)
        .write_u8((day_secs / 60 % 60) as u8)
        .write_u8((day_secs % 60) as u8);
}

/// Proleptic Gregorian date for a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
