//! TOML configuration file parsing
//!
//! Every section and key is optional; anything omitted keeps the
//! SST25WF040 defaults.
//!
//! ```toml
//! [flash]
//! size = "512 KiB"
//! kill_switch = 0x07FFFF   # defaults to the last byte of the chip
//! reserved = 0x07FFFF      # same as kill_switch; "none" drops the erase guard
//!                          # and then needs an explicit kill_switch
//! wait = "poll-busy"
//! poll_interval_us = 100
//!
//! [timings]
//! sector_erase_us = 75000
//! byte_program_us = "0x3C"
//!
//! [transport]
//! spin_limit = 10000
//!
//! [tone]
//! half_period_us = 250
//! cycles = 500
//!
//! [device]
//! manufacturer_id = 0xBF
//! device_id = 0x04
//! initial_status = 0x1C
//! ```

use std::fs;
use std::path::Path;

use mooflash_core::config::{FlashConfig, Timings, ToneConfig, WaitPolicy};
use mooflash_core::spi::FlashAddress;
use mooflash_core::transport::DEFAULT_SPIN_LIMIT;
use mooflash_dummy::DummyConfig;
use serde::Deserialize;

use crate::error::{CliError, Result};

/// Poll interval used when `wait = "poll-busy"` gives none
const DEFAULT_POLL_INTERVAL_US: u32 = 100;

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// Flash engine configuration
    pub flash: FlashConfig,
    /// Tone generator configuration
    pub tone: ToneConfig,
    /// Completion polls before a bus timeout
    pub spin_limit: u32,
    /// Emulated chip
    pub device: DummyConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            flash: FlashConfig::default(),
            tone: ToneConfig::default(),
            spin_limit: DEFAULT_SPIN_LIMIT,
            device: DummyConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TomlFile {
    flash: TomlFlash,
    timings: TomlTimings,
    transport: TomlTransport,
    tone: TomlTone,
    device: TomlDevice,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TomlFlash {
    size: Option<String>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    kill_switch: Option<u32>,
    #[serde(deserialize_with = "deserialize_reserved")]
    reserved: Option<Reserved>,
    wait: Option<TomlWait>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    poll_interval_us: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum TomlWait {
    FixedDelay,
    PollBusy,
}

#[derive(Debug, Clone, Copy)]
enum Reserved {
    At(u32),
    Disabled,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TomlTimings {
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    byte_program_us: Option<u32>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    sector_erase_us: Option<u32>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    block_erase_us: Option<u32>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    chip_erase_us: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TomlTone {
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    half_period_us: Option<u32>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    cycles: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TomlTransport {
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    spin_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TomlDevice {
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    manufacturer_id: Option<u32>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    device_id: Option<u32>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    initial_status: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HexOrInt {
    Int(u32),
    Str(String),
}

/// Deserialize an optional u32 that can be hex (0x...) or decimal
fn deserialize_opt_hex_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(Some(n)),
        HexOrInt::Str(s) => parse_number(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

fn deserialize_reserved<'de, D>(deserializer: D) -> std::result::Result<Option<Reserved>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(Some(Reserved::At(n))),
        HexOrInt::Str(s) if s.trim().eq_ignore_ascii_case("none") => Ok(Some(Reserved::Disabled)),
        HexOrInt::Str(s) => parse_number(&s)
            .map(|n| Some(Reserved::At(n)))
            .map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

/// Parse a size string like "512 KiB" or "0x80000"
fn parse_size(s: &str) -> std::result::Result<u32, String> {
    let lower = s.trim().to_lowercase();
    let (num, multiplier) = if let Some(n) = lower.strip_suffix("mib") {
        (n, 1024 * 1024)
    } else if let Some(n) = lower.strip_suffix("kib") {
        (n, 1024)
    } else {
        (lower.as_str(), 1)
    };
    parse_number(num)?
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

fn byte(name: &str, value: Option<u32>, default: u8) -> Result<u8> {
    match value {
        None => Ok(default),
        Some(v) => u8::try_from(v)
            .map_err(|_| CliError::InvalidParameter(format!("{} = {} does not fit in a byte", name, v))),
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CliError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let file: TomlFile = toml::from_str(&content).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_parsed(file)
    }

    /// Parse settings from a TOML string
    #[cfg(test)]
    fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlFile = toml::from_str(content).map_err(|source| CliError::Config {
            path: "<string>".into(),
            source,
        })?;
        Self::from_parsed(file)
    }

    fn from_parsed(file: TomlFile) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(size) = file.flash.size {
            let size = parse_size(&size).map_err(CliError::InvalidParameter)?;
            if !size.is_power_of_two() || size > FlashAddress::MAX.value() + 1 {
                return Err(CliError::InvalidParameter(format!(
                    "flash size 0x{:X} must be a power of two up to 16 MiB",
                    size
                )));
            }
            settings.flash.size = size;
            settings.device.size = size as usize;
        }

        let kill_switch = match (file.flash.reserved, file.flash.kill_switch) {
            (Some(Reserved::At(a)), Some(b)) if a != b => {
                return Err(CliError::InvalidParameter(format!(
                    "reserved 0x{:X} and kill_switch 0x{:X} must name the same byte",
                    a, b
                )))
            }
            (Some(Reserved::At(a)), _) | (_, Some(a)) => a,
            (Some(Reserved::Disabled), None) => {
                return Err(CliError::InvalidParameter(
                    "reserved = \"none\" needs an explicit kill_switch address".into(),
                ))
            }
            (None, None) => settings.flash.size - 1,
        };
        settings.flash.kill_switch = FlashAddress::try_from(kill_switch)?;
        settings.flash.guard_kill_switch = !matches!(file.flash.reserved, Some(Reserved::Disabled));

        let timings = Timings::default();
        settings.flash.timings = Timings {
            byte_program_us: file.timings.byte_program_us.unwrap_or(timings.byte_program_us),
            sector_erase_us: file.timings.sector_erase_us.unwrap_or(timings.sector_erase_us),
            block_erase_us: file.timings.block_erase_us.unwrap_or(timings.block_erase_us),
            chip_erase_us: file.timings.chip_erase_us.unwrap_or(timings.chip_erase_us),
        };
        settings.flash.wait = match file.flash.wait {
            None | Some(TomlWait::FixedDelay) => WaitPolicy::FixedDelay,
            Some(TomlWait::PollBusy) => WaitPolicy::PollBusy {
                interval_us: file.flash.poll_interval_us.unwrap_or(DEFAULT_POLL_INTERVAL_US),
            },
        };

        if let Some(spin_limit) = file.transport.spin_limit {
            settings.spin_limit = spin_limit;
        }
        let tone = ToneConfig::default();
        settings.tone = ToneConfig {
            half_period_us: file.tone.half_period_us.unwrap_or(tone.half_period_us),
            cycles: file.tone.cycles.unwrap_or(tone.cycles),
        };

        let defaults = DummyConfig::default();
        settings.device.manufacturer_id =
            byte("manufacturer_id", file.device.manufacturer_id, defaults.manufacturer_id)?;
        settings.device.device_id = byte("device_id", file.device.device_id, defaults.device_id)?;
        settings.device.initial_status =
            byte("initial_status", file.device.initial_status, defaults.initial_status)?;

        settings.flash.validate().map_err(|_| {
            CliError::InvalidParameter(format!(
                "kill switch {} lies outside the 0x{:X}-byte chip",
                settings.flash.kill_switch, settings.flash.size
            ))
        })?;

        log::debug!("loaded settings: {:?}", settings);
        Ok(settings)
    }
}
