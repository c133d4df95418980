//! Receiver, failsafe and mode switch configuration.

use crate::cursor::{FieldReader, FieldWriter};
use crate::error::Result;
use crate::ladder::{read_ladder, write_ladder, Rung};
use crate::state::{
    AdjustmentRange, ChannelRange, FcState, ModeRange, ModeRangeExtra, RxConfig, RxFailChannel,
};
use crate::version::ApiVersion;

const NAME_DELIMITER: u8 = b';';

fn rx_base(r: &mut FieldReader<'_>, c: &mut RxConfig, _: ApiVersion) -> Result<()> {
    c.serialrx_provider = r.read_u8()?;
    c.stick_max = r.read_u16()?;
    c.stick_center = r.read_u16()?;
    c.stick_min = r.read_u16()?;
    c.spektrum_sat_bind = r.read_u8()?;
    c.rx_min_usec = r.read_u16()?;
    c.rx_max_usec = r.read_u16()?;
    Ok(())
}

fn rx_base_write(w: &mut FieldWriter, c: &RxConfig, _: ApiVersion) {
    w.write_u8(c.serialrx_provider)
        .write_u16(c.stick_max)
        .write_u16(c.stick_center)
        .write_u16(c.stick_min)
        .write_u8(c.spektrum_sat_bind)
        .write_u16(c.rx_min_usec)
        .write_u16(c.rx_max_usec);
}

fn rx_interpolation(r: &mut FieldReader<'_>, c: &mut RxConfig, _: ApiVersion) -> Result<()> {
    c.rc_interpolation = r.read_u8()?;
    c.rc_interpolation_interval = r.read_u8()?;
    c.air_mode_activate_threshold = r.read_u16()?;
    Ok(())
}

fn rx_interpolation_write(w: &mut FieldWriter, c: &RxConfig, _: ApiVersion) {
    w.write_u8(c.rc_interpolation)
        .write_u8(c.rc_interpolation_interval)
        .write_u16(c.air_mode_activate_threshold);
}

fn rx_spi(r: &mut FieldReader<'_>, c: &mut RxConfig, _: ApiVersion) -> Result<()> {
    c.rx_spi_protocol = r.read_u8()?;
    c.rx_spi_id = r.read_u32()?;
    c.rx_spi_rf_channel_count = r.read_u8()?;
    c.fpv_cam_angle_degrees = r.read_u8()?;
    Ok(())
}

fn rx_spi_write(w: &mut FieldWriter, c: &RxConfig, _: ApiVersion) {
    w.write_u8(c.rx_spi_protocol)
        .write_u32(c.rx_spi_id)
        .write_u8(c.rx_spi_rf_channel_count)
        .write_u8(c.fpv_cam_angle_degrees);
}

fn rx_smoothing(r: &mut FieldReader<'_>, c: &mut RxConfig, _: ApiVersion) -> Result<()> {
    c.rc_interpolation_channels = r.read_u8()?;
    c.rc_smoothing_type = r.read_u8()?;
    c.rc_smoothing_input_cutoff = r.read_u8()?;
    c.rc_smoothing_derivative_cutoff = r.read_u8()?;
    c.rc_smoothing_input_type = r.read_u8()?;
    c.rc_smoothing_derivative_type = r.read_u8()?;
    Ok(())
}

fn rx_smoothing_write(w: &mut FieldWriter, c: &RxConfig, _: ApiVersion) {
    w.write_u8(c.rc_interpolation_channels)
        .write_u8(c.rc_smoothing_type)
        .write_u8(c.rc_smoothing_input_cutoff)
        .write_u8(c.rc_smoothing_derivative_cutoff)
        .write_u8(c.rc_smoothing_input_type)
        .write_u8(c.rc_smoothing_derivative_type);
}

fn rx_usb_hid(r: &mut FieldReader<'_>, c: &mut RxConfig, _: ApiVersion) -> Result<()> {
    c.usb_cdc_hid_type = r.read_u8()?;
    Ok(())
}

fn rx_usb_hid_write(w: &mut FieldWriter, c: &RxConfig, _: ApiVersion) {
    w.write_u8(c.usb_cdc_hid_type);
}

fn rx_auto_smoothness(r: &mut FieldReader<'_>, c: &mut RxConfig, _: ApiVersion) -> Result<()> {
    c.rc_smoothing_auto_smoothness = r.read_u8()?;
    Ok(())
}

fn rx_auto_smoothness_write(w: &mut FieldWriter, c: &RxConfig, _: ApiVersion) {
    w.write_u8(c.rc_smoothing_auto_smoothness);
}

pub(crate) const RX_CONFIG: &[Rung<RxConfig>] = &[
    Rung::new(ApiVersion::UNKNOWN, rx_base, rx_base_write),
    Rung::new(ApiVersion::V1_20, rx_interpolation, rx_interpolation_write),
    Rung::new(ApiVersion::V1_31, rx_spi, rx_spi_write),
    Rung::new(ApiVersion::V1_40, rx_smoothing, rx_smoothing_write),
    Rung::new(ApiVersion::V1_42, rx_usb_hid, rx_usb_hid_write),
    Rung::new(ApiVersion::V1_44, rx_auto_smoothness, rx_auto_smoothness_write),
];

pub(crate) fn decode_rx_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    read_ladder(RX_CONFIG, version, r, &mut s.rx_config)
}

pub(crate) fn encode_set_rx_config(w: &mut FieldWriter, s: &FcState) {
    write_ladder(RX_CONFIG, s.api_version(), w, &s.rx_config);
}

pub(crate) fn decode_rx_map(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.rx_map = r.rest().to_vec();
    Ok(())
}

pub(crate) fn encode_set_rx_map(w: &mut FieldWriter, s: &FcState) {
    w.write_bytes(&s.rx_map);
}

pub(crate) fn decode_rssi_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.rssi_channel = r.read_u8()?;
    Ok(())
}

pub(crate) fn encode_set_rssi_config(w: &mut FieldWriter, s: &FcState) {
    w.write_u8(s.rssi_channel);
}

pub(crate) fn decode_failsafe_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    let f = &mut s.failsafe_config;
    f.failsafe_delay = r.read_u8()?;
    f.failsafe_off_delay = r.read_u8()?;
    f.failsafe_throttle = r.read_u16()?;
    if version.at_least(ApiVersion::V1_15) {
        f.failsafe_switch_mode = r.read_u8()?;
        f.failsafe_throttle_low_delay = r.read_u16()?;
        f.failsafe_procedure = r.read_u8()?;
    }
    Ok(())
}

pub(crate) fn encode_set_failsafe_config(w: &mut FieldWriter, s: &FcState) {
    let f = &s.failsafe_config;
    w.write_u8(f.failsafe_delay)
        .write_u8(f.failsafe_off_delay)
        .write_u16(f.failsafe_throttle);
    if s.api_version().at_least(ApiVersion::V1_15) {
        w.write_u8(f.failsafe_switch_mode)
            .write_u16(f.failsafe_throttle_low_delay)
            .write_u8(f.failsafe_procedure);
    }
}

pub(crate) fn decode_rxfail_config(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.records(3)?;
    s.rxfail_config.clear();
    for _ in 0..count {
        s.rxfail_config.push(RxFailChannel {
            mode: r.read_u8()?,
            value: r.read_u16()?,
        });
    }
    Ok(())
}

/// One `MSP_SET_RXFAIL_CONFIG` upload item.
pub(crate) fn write_rxfail_item(w: &mut FieldWriter, index: u8, channel: &RxFailChannel) {
    w.write_u8(index).write_u8(channel.mode).write_u16(channel.value);
}

pub(crate) fn decode_rc_deadband(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let version = s.api_version();
    let d = &mut s.rc_deadband;
    d.deadband = r.read_u8()?;
    d.yaw_deadband = r.read_u8()?;
    d.alt_hold_deadband = r.read_u8()?;
    if version.at_least(ApiVersion::V1_17) {
        d.deadband3d_throttle = r.read_u16()?;
    }
    Ok(())
}

pub(crate) fn encode_set_rc_deadband(w: &mut FieldWriter, s: &FcState) {
    let d = &s.rc_deadband;
    w.write_u8(d.deadband)
        .write_u8(d.yaw_deadband)
        .write_u8(d.alt_hold_deadband);
    if s.api_version().at_least(ApiVersion::V1_17) {
        w.write_u16(d.deadband3d_throttle);
    }
}

pub(crate) fn decode_mode_ranges(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.records(4)?;
    s.mode_ranges.clear();
    for _ in 0..count {
        let id = r.read_u8()?;
        let aux_channel_index = r.read_u8()?;
        let (start, end) = (r.read_u8()?, r.read_u8()?);
        s.mode_ranges.push(ModeRange {
            id,
            aux_channel_index,
            range: ChannelRange::from_steps(start, end),
        });
    }
    Ok(())
}

pub(crate) fn decode_mode_ranges_extra(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.read_u8()?;
    s.mode_ranges_extra.clear();
    for _ in 0..count {
        s.mode_ranges_extra.push(ModeRangeExtra {
            id: r.read_u8()?,
            mode_logic: r.read_u8()?,
            linked_to: r.read_u8()?,
        });
    }
    Ok(())
}

/// One `MSP_SET_MODE_RANGE` upload item; mode linking travels from API 1.41.
pub(crate) fn write_mode_range_item(
    w: &mut FieldWriter,
    index: u8,
    range: &ModeRange,
    extra: Option<&ModeRangeExtra>,
    version: ApiVersion,
) {
    let (start, end) = range.range.to_steps();
    w.write_u8(index)
        .write_u8(range.id)
        .write_u8(range.aux_channel_index)
        .write_u8(start)
        .write_u8(end);
    if version.at_least(ApiVersion::V1_41) {
        let extra = extra.cloned().unwrap_or_default();
        w.write_u8(extra.mode_logic).write_u8(extra.linked_to);
    }
}

pub(crate) fn decode_adjustment_ranges(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    let count = r.records(6)?;
    s.adjustment_ranges.clear();
    for _ in 0..count {
        let slot_index = r.read_u8()?;
        let aux_channel_index = r.read_u8()?;
        let (start, end) = (r.read_u8()?, r.read_u8()?);
        s.adjustment_ranges.push(AdjustmentRange {
            slot_index,
            aux_channel_index,
            range: ChannelRange::from_steps(start, end),
            adjustment_function: r.read_u8()?,
            aux_switch_channel_index: r.read_u8()?,
        });
    }
    Ok(())
}

/// One `MSP_SET_ADJUSTMENT_RANGE` upload item.
pub(crate) fn write_adjustment_range_item(w: &mut FieldWriter, index: u8, range: &AdjustmentRange) {
    let (start, end) = range.range.to_steps();
    w.write_u8(index)
        .write_u8(range.slot_index)
        .write_u8(range.aux_channel_index)
        .write_u8(start)
        .write_u8(end)
        .write_u8(range.adjustment_function)
        .write_u8(range.aux_switch_channel_index);
}

/// Split on the delimiter byte; a final unterminated name is dropped.
fn split_names(bytes: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = Vec::new();
    for &byte in bytes {
        if byte == NAME_DELIMITER {
            names.push(String::from_utf8_lossy(&current).into_owned());
            current.clear();
        } else {
            current.push(byte);
        }
    }
    names
}

pub(crate) fn decode_box_names(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.aux_names = split_names(r.rest());
    Ok(())
}

pub(crate) fn decode_pid_names(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.pid_names = split_names(r.rest());
    Ok(())
}

pub(crate) fn decode_box_ids(r: &mut FieldReader<'_>, s: &mut FcState) -> Result<()> {
    s.aux_ids = r.rest().to_vec();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::is_ascending;

    fn state_at(version: ApiVersion) -> FcState {
        let mut s = FcState::default();
        s.config.api_version = version;
        s
    }

    #[test]
    fn rx_config_ladder_is_ascending() {
        assert!(is_ascending(RX_CONFIG));
    }

    #[test]
    fn rx_config_roundtrip_per_band() {
        for version in [ApiVersion::V1_16, ApiVersion::V1_31, ApiVersion::V1_42, ApiVersion::V1_44] {
            let mut s = state_at(version);
            let c = &mut s.rx_config;
            c.serialrx_provider = 9;
            c.stick_max = 1900;
            c.stick_center = 1500;
            c.stick_min = 1050;
            c.rx_min_usec = 885;
            c.rx_max_usec = 2115;
            if version.at_least(ApiVersion::V1_20) {
                c.air_mode_activate_threshold = 1250;
            }
            if version.at_least(ApiVersion::V1_31) {
                c.rx_spi_id = 0xDEAD_BEEF;
            }
            if version.at_least(ApiVersion::V1_42) {
                c.usb_cdc_hid_type = 1;
            }
            if version.at_least(ApiVersion::V1_44) {
                c.rc_smoothing_auto_smoothness = 30;
            }

            let mut w = FieldWriter::new();
            encode_set_rx_config(&mut w, &s);
            let mut decoded = state_at(version);
            let mut r = FieldReader::new(w.as_slice());
            decode_rx_config(&mut r, &mut decoded).unwrap();
            assert_eq!(decoded.rx_config, s.rx_config, "at {version}");
            assert_eq!(r.remaining(), 0);
        }
    }

    #[test]
    fn names_split_on_delimiter_byte() {
        let mut s = FcState::default();
        s.aux_names = vec!["stale".into(); 5];
        decode_box_names(&mut FieldReader::new(b"ARM;ANGLE;HORIZON;"), &mut s).unwrap();
        assert_eq!(s.aux_names, vec!["ARM", "ANGLE", "HORIZON"]);

        decode_pid_names(&mut FieldReader::new(b"ROLL;PITCH;YAW"), &mut s).unwrap();
        assert_eq!(s.pid_names, vec!["ROLL", "PITCH"]);
    }

    #[test]
    fn mode_ranges_convert_steps_to_microseconds() {
        let payload = [0, 0, 32, 48, 1, 1, 0, 48];
        let mut s = FcState::default();
        decode_mode_ranges(&mut FieldReader::new(&payload), &mut s).unwrap();
        assert_eq!(s.mode_ranges.len(), 2);
        assert_eq!(s.mode_ranges[0].range, ChannelRange { start: 1700, end: 2100 });
        assert_eq!(s.mode_ranges[1].range.start, 900);

        let mut w = FieldWriter::new();
        write_mode_range_item(&mut w, 0, &s.mode_ranges[0], None, ApiVersion::V1_40);
        assert_eq!(w.as_slice(), &[0, 0, 0, 32, 48]);

        let extra = ModeRangeExtra {
            id: 0,
            mode_logic: 1,
            linked_to: 3,
        };
        let mut w = FieldWriter::new();
        write_mode_range_item(&mut w, 0, &s.mode_ranges[0], Some(&extra), ApiVersion::V1_41);
        assert_eq!(w.as_slice(), &[0, 0, 0, 32, 48, 1, 3]);
    }

    #[test]
    fn mode_ranges_extra_count_prefixed() {
        let mut s = FcState::default();
        decode_mode_ranges_extra(&mut FieldReader::new(&[2, 0, 1, 0, 1, 0, 0]), &mut s).unwrap();
        assert_eq!(s.mode_ranges_extra.len(), 2);
        assert_eq!(s.mode_ranges_extra[0].mode_logic, 1);
    }

    #[test]
    fn adjustment_ranges_stride_six() {
        let payload = [0, 2, 0, 48, 12, 3];
        let mut s = FcState::default();
        decode_adjustment_ranges(&mut FieldReader::new(&payload), &mut s).unwrap();
        assert_eq!(s.adjustment_ranges[0].adjustment_function, 12);

        let mut w = FieldWriter::new();
        write_adjustment_range_item(&mut w, 4, &s.adjustment_ranges[0]);
        assert_eq!(w.as_slice(), &[4, 0, 2, 0, 48, 12, 3]);

        assert!(decode_adjustment_ranges(&mut FieldReader::new(&payload[..5]), &mut s).is_err());
    }

    #[test]
    fn failsafe_and_deadband_roundtrip() {
        for version in [ApiVersion::V1_12, ApiVersion::V1_41] {
            let mut s = state_at(version);
            s.failsafe_config.failsafe_delay = 4;
            s.failsafe_config.failsafe_throttle = 1000;
            s.rc_deadband.deadband = 5;
            if version.at_least(ApiVersion::V1_17) {
                s.failsafe_config.failsafe_procedure = 1;
                s.rc_deadband.deadband3d_throttle = 50;
            }

            let mut decoded = state_at(version);
            let mut w = FieldWriter::new();
            encode_set_failsafe_config(&mut w, &s);
            let mut r = FieldReader::new(w.as_slice());
            decode_failsafe_config(&mut r, &mut decoded).unwrap();
            assert_eq!(r.remaining(), 0);

            let mut w = FieldWriter::new();
            encode_set_rc_deadband(&mut w, &s);
            let mut r = FieldReader::new(w.as_slice());
            decode_rc_deadband(&mut r, &mut decoded).unwrap();
            assert_eq!(r.remaining(), 0);

            assert_eq!(decoded.failsafe_config, s.failsafe_config);
            assert_eq!(decoded.rc_deadband, s.rc_deadband);
        }
    }

    #[test]
    fn rxfail_items() {
        let mut s = FcState::default();
        decode_rxfail_config(&mut FieldReader::new(&[0, 0, 0, 2, 0xDC, 0x05]), &mut s).unwrap();
        assert_eq!(s.rxfail_config[1], RxFailChannel { mode: 2, value: 1500 });

        let mut w = FieldWriter::new();
        write_rxfail_item(&mut w, 1, &s.rxfail_config[1]);
        assert_eq!(w.as_slice(), &[1, 2, 0xDC, 0x05]);
    }
}
