//! Multi-item records written one item per frame.
//!
//! Each frame is sent only after the previous one is acknowledged; the
//! sequencing lives in the engine, this module only builds the payloads.

use bytes::Bytes;

use crate::code::MspCode;
use crate::cursor::FieldWriter;
use crate::messages::{
    write_adjustment_range_item, write_current_meter_item, write_led_item,
    write_led_mode_color_item, write_mode_range_item, write_rxfail_item, write_servo_item,
    write_voltage_meter_item, EncodeFn,
};
use crate::state::FcState;
use crate::version::ApiVersion;

/// Records uploaded as a sequence of per-item SET frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    ServoConfigurations,
    ModeRanges,
    AdjustmentRanges,
    VoltageMeterConfigs,
    CurrentMeterConfigs,
    LedStrip,
    LedModeColors,
    RxFailConfig,
}

impl UploadKind {
    pub const ALL: &'static [UploadKind] = &[
        UploadKind::ServoConfigurations,
        UploadKind::ModeRanges,
        UploadKind::AdjustmentRanges,
        UploadKind::VoltageMeterConfigs,
        UploadKind::CurrentMeterConfigs,
        UploadKind::LedStrip,
        UploadKind::LedModeColors,
        UploadKind::RxFailConfig,
    ];

    /// SET code every frame of the upload carries.
    pub fn code(self) -> MspCode {
        match self {
            UploadKind::ServoConfigurations => MspCode::SetServoConfiguration,
            UploadKind::ModeRanges => MspCode::SetModeRange,
            UploadKind::AdjustmentRanges => MspCode::SetAdjustmentRange,
            UploadKind::VoltageMeterConfigs => MspCode::SetVoltageMeterConfig,
            UploadKind::CurrentMeterConfigs => MspCode::SetCurrentMeterConfig,
            UploadKind::LedStrip => MspCode::SetLedStripConfig,
            UploadKind::LedModeColors => MspCode::SetLedStripModeColor,
            UploadKind::RxFailConfig => MspCode::SetRxfailConfig,
        }
    }

    /// Firmware below this version takes the whole record in one legacy frame.
    fn itemized_since(self) -> ApiVersion {
        match self {
            UploadKind::ServoConfigurations => ApiVersion::V1_12,
            UploadKind::VoltageMeterConfigs | UploadKind::CurrentMeterConfigs => ApiVersion::V1_36,
            _ => ApiVersion::UNKNOWN,
        }
    }
}

/// Frames for one upload, in send order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub kind: UploadKind,
    pub code: MspCode,
    pub frames: Vec<Bytes>,
}

fn frame(build: impl FnOnce(&mut FieldWriter)) -> Bytes {
    let mut w = FieldWriter::new();
    build(&mut w);
    w.into_bytes()
}

fn legacy_frame(encode: EncodeFn, state: &FcState) -> Vec<Bytes> {
    vec![frame(|w| encode(w, state))]
}

fn indexed<T>(items: &[T]) -> impl Iterator<Item = (u8, &T)> {
    items.iter().take(u8::MAX as usize + 1).enumerate().map(|(i, item)| (i as u8, item))
}

/// Build every frame of `kind` from the current state.
///
/// An empty record list yields no frames; the upload completes at once.
pub fn plan(kind: UploadKind, state: &FcState) -> UploadPlan {
    let version = state.api_version();
    let itemized = version.at_least(kind.itemized_since());

    let frames = match kind {
        UploadKind::ServoConfigurations if !itemized => {
            if state.servo_configs.is_empty() {
                Vec::new()
            } else {
                legacy_frame(crate::messages::encode_set_servo_configuration, state)
            }
        }
        UploadKind::VoltageMeterConfigs if !itemized => {
            legacy_frame(crate::messages::encode_set_voltage_meter_config, state)
        }
        UploadKind::CurrentMeterConfigs if !itemized => {
            legacy_frame(crate::messages::encode_set_current_meter_config, state)
        }

        UploadKind::ServoConfigurations => indexed(&state.servo_configs)
            .map(|(i, servo)| frame(|w| write_servo_item(w, i, servo, version)))
            .collect(),
        UploadKind::ModeRanges => indexed(&state.mode_ranges)
            .map(|(i, range)| {
                let extra = state.mode_ranges_extra.get(i as usize);
                frame(|w| write_mode_range_item(w, i, range, extra, version))
            })
            .collect(),
        UploadKind::AdjustmentRanges => indexed(&state.adjustment_ranges)
            .map(|(i, range)| frame(|w| write_adjustment_range_item(w, i, range)))
            .collect(),
        UploadKind::VoltageMeterConfigs => state
            .voltage_meter_configs
            .iter()
            .map(|meter| frame(|w| write_voltage_meter_item(w, meter)))
            .collect(),
        UploadKind::CurrentMeterConfigs => state
            .current_meter_configs
            .iter()
            .map(|meter| frame(|w| write_current_meter_item(w, meter)))
            .collect(),
        UploadKind::LedStrip => indexed(&state.led_strip.leds)
            .map(|(i, led)| frame(|w| write_led_item(w, i, led, version)))
            .collect(),
        UploadKind::LedModeColors => state
            .led_mode_colors
            .iter()
            .map(|mode_color| frame(|w| write_led_mode_color_item(w, mode_color)))
            .collect(),
        UploadKind::RxFailConfig => indexed(&state.rxfail_config)
            .map(|(i, channel)| frame(|w| write_rxfail_item(w, i, channel)))
            .collect(),
    };

    UploadPlan {
        kind,
        code: kind.code(),
        frames,
    }
}

/// Whether `code` is written through an upload at `version` rather than as one SET frame.
pub fn is_sequenced(code: MspCode, version: ApiVersion) -> bool {
    UploadKind::ALL
        .iter()
        .any(|kind| kind.code() == code && version.at_least(kind.itemized_since()))
}
