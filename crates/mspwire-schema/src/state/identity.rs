use serde::{Deserialize, Serialize};

use crate::version::ApiVersion;

/// Device identity, build and live status flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FcConfig {
    pub api_version: ApiVersion,
    pub msp_protocol_version: u8,
    pub fc_identifier: String,
    pub fc_version: String,
    pub build_info: String,

    pub board_identifier: String,
    pub board_version: u16,
    pub board_type: u8,
    pub target_capabilities: u8,
    pub target_name: String,
    pub board_name: String,
    pub manufacturer_id: String,
    pub signature: Vec<u8>,
    pub mcu_type_id: u8,
    pub configuration_state: u8,
    pub sample_rate_hz: u16,
    pub configuration_problems: u32,

    pub name: String,
    pub uid: [u32; 3],

    pub cycle_time: u16,
    pub i2c_error: u16,
    pub active_sensors: u16,
    pub mode: u32,
    pub profile: u8,
    pub cpuload: u16,
    pub num_profiles: u8,
    pub rate_profile: u8,
    pub flight_mode_flags: Vec<u8>,
    pub arming_disable_count: u8,
    pub arming_disable_flags: u32,

    /// Host-requested arming block, written by `MSP_ARMING_DISABLE`.
    pub arming_disabled: bool,
    pub runaway_takeoff_prevention_disabled: bool,
}

/// Board target capability bits reported in `MSP_BOARD_INFO`.
pub mod capabilities {
    pub const VCP: u8 = 0;
    pub const SOFTSERIAL: u8 = 1;
    pub const FLASH_BOOTLOADER: u8 = 3;
    pub const SUPPORTS_CUSTOM_DEFAULTS: u8 = 4;
    pub const HAS_CUSTOM_DEFAULTS: u8 = 5;
    pub const SUPPORTS_RX_BIND: u8 = 6;
}

impl FcConfig {
    pub fn has_capability(&self, bit: u8) -> bool {
        bit < 8 && self.target_capabilities & (1 << bit) != 0
    }
}

/// Reboot target requested with `MSP_SET_REBOOT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebootType {
    #[default]
    Firmware,
    Bootloader,
    Msc,
    MscUtc,
    Unknown(i8),
}

impl RebootType {
    pub fn from_wire(value: i8) -> Self {
        match value {
            0 => RebootType::Firmware,
            1 => RebootType::Bootloader,
            2 => RebootType::Msc,
            3 => RebootType::MscUtc,
            other => RebootType::Unknown(other),
        }
    }

    pub fn to_wire(self) -> i8 {
        match self {
            RebootType::Firmware => 0,
            RebootType::Bootloader => 1,
            RebootType::Msc => 2,
            RebootType::MscUtc => 3,
            RebootType::Unknown(other) => other,
        }
    }

    pub fn is_mass_storage(self) -> bool {
        matches!(self, RebootType::Msc | RebootType::MscUtc)
    }
}

/// Outcome of the last reboot request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebootStatus {
    pub reboot_type: RebootType,
    /// False when a mass-storage reboot was refused because storage was not ready.
    pub storage_ready: bool,
}
