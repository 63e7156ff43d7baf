//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u32(s)?;
    u8::try_from(value).map_err(|_| format!("Value {} does not fit in a byte", value))
}

#[derive(Parser)]
#[command(name = "mooflash")]
#[command(
    author,
    version,
    about = "SST25WF040 flash tool with kill switch and command dispatch",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML format)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Flash image backing the emulated chip; created on first use
    ///
    /// Block protection is stored alongside it in `<image>.status`.
    #[arg(short, long, global = true, default_value = "mooflash.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Erase granularity
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EraseKind {
    /// 4 KiB sector
    Sector,
    /// 32 KiB block
    Block32k,
    /// 64 KiB block
    Block64k,
    /// Whole chip
    Chip,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print manufacturer and device IDs
    Id,

    /// Print the decoded status register
    Status,

    /// Read bytes from flash
    Read {
        /// Start address
        #[arg(value_parser = parse_hex_u32)]
        address: u32,

        /// Number of bytes to read
        #[arg(short, long, default_value = "16", value_parser = parse_hex_u32)]
        length: u32,

        /// Write the bytes to a file instead of dumping them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Program one byte and verify it
    Write {
        /// Target address
        #[arg(value_parser = parse_hex_u32)]
        address: u32,

        /// Byte value
        #[arg(value_parser = parse_hex_u8)]
        value: u8,
    },

    /// Erase a sector, block or the whole chip
    Erase {
        /// Erase granularity
        #[arg(value_enum)]
        kind: EraseKind,

        /// Any address inside the region (ignored for chip)
        #[arg(value_parser = parse_hex_u32, default_value = "0")]
        address: u32,
    },

    /// Clear the block protection bits (kept in `<image>.status`)
    Unprotect,

    /// Permanently set the kill switch
    Kill,

    /// Report whether the kill switch is set
    IsKilled,

    /// Post a command id to the dispatcher and print its result
    Rpc {
        /// Command id (1 = beep, 66 = kill)
        #[arg(value_parser = parse_hex_u8)]
        id: u8,

        /// Parameter byte
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u8)]
        param: u8,
    },

    /// Program an incrementing pattern across a range and read it back
    Sweep {
        /// First address
        #[arg(long, default_value = "0x100", value_parser = parse_hex_u32)]
        start: u32,

        /// End address (exclusive)
        #[arg(long, default_value = "0x10000", value_parser = parse_hex_u32)]
        end: u32,
    },
}
