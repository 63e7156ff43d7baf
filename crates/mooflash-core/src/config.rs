//! Device configuration
//!
//! Defaults match the SST25WF040 on the reference board. With the `std`
//! feature every type here derives serde so a host tool can load overrides
//! from a file; missing fields fall back to the defaults.

use crate::error::{Error, Result};
use crate::spi::{opcodes, FlashAddress};

/// Size of the SST25WF040 in bytes (4 Mbit)
pub const SST25WF040_SIZE: u32 = 512 * 1024;

/// Worst-case duration of each timed operation, in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct Timings {
    /// Byte program
    pub byte_program_us: u32,
    /// 4 KiB sector erase
    pub sector_erase_us: u32,
    /// 32 KiB and 64 KiB block erase
    pub block_erase_us: u32,
    /// Whole chip erase
    pub chip_erase_us: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            byte_program_us: 60,
            sector_erase_us: 75_000,
            block_erase_us: 62_000,
            chip_erase_us: 125_000,
        }
    }
}

impl Timings {
    /// Budget for the operation started by `opcode`
    ///
    /// Returns `None` for commands that complete within the transaction.
    pub const fn budget_us(&self, opcode: u8) -> Option<u32> {
        match opcode {
            opcodes::BYTE_PROGRAM => Some(self.byte_program_us),
            opcodes::SE_20 => Some(self.sector_erase_us),
            opcodes::BE_52 | opcodes::BE_D8 => Some(self.block_erase_us),
            opcodes::CE_60 => Some(self.chip_erase_us),
            _ => None,
        }
    }
}

/// How the engine waits for a program or erase to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum WaitPolicy {
    /// Wait the full budget, then check BUSY once
    #[default]
    FixedDelay,
    /// Poll BUSY every `interval_us` until it clears or the budget runs out
    PollBusy {
        /// Delay between status reads
        interval_us: u32,
    },
}

/// Flash engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct FlashConfig {
    /// Chip size in bytes
    pub size: u32,
    /// Byte holding the kill switch
    pub kill_switch: FlashAddress,
    /// Refuse any erase that covers `kill_switch`
    pub guard_kill_switch: bool,
    /// Per-operation time budgets
    pub timings: Timings,
    /// Completion strategy
    pub wait: WaitPolicy,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            size: SST25WF040_SIZE,
            kill_switch: crate::killswitch::KILL_SWITCH_ADDR,
            guard_kill_switch: true,
            timings: Timings::default(),
            wait: WaitPolicy::default(),
        }
    }
}

impl FlashConfig {
    /// True if `len` bytes starting at `addr` lie inside the chip
    pub fn contains(&self, addr: FlashAddress, len: u32) -> bool {
        addr.value()
            .checked_add(len)
            .is_some_and(|end| end <= self.size)
    }

    /// Address no erase may cover, if the kill switch is guarded
    pub fn reserved(&self) -> Option<FlashAddress> {
        self.guard_kill_switch.then_some(self.kill_switch)
    }

    /// Check that the kill switch lies inside the chip
    pub fn validate(&self) -> Result<()> {
        if self.contains(self.kill_switch, 1) {
            Ok(())
        } else {
            log::warn!(
                "kill switch {} outside 0x{:X}-byte chip",
                self.kill_switch,
                self.size
            );
            Err(Error::AddressOutOfBounds)
        }
    }
}

/// Tone generator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct ToneConfig {
    /// Time the pin stays at each level
    pub half_period_us: u32,
    /// Number of full high/low cycles
    pub cycles: u32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            half_period_us: 250,
            cycles: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_table() {
        let t = Timings::default();
        assert_eq!(t.budget_us(opcodes::BYTE_PROGRAM), Some(60));
        assert_eq!(t.budget_us(opcodes::SE_20), Some(75_000));
        assert_eq!(t.budget_us(opcodes::BE_52), Some(62_000));
        assert_eq!(t.budget_us(opcodes::BE_D8), Some(62_000));
        assert_eq!(t.budget_us(opcodes::CE_60), Some(125_000));
        assert_eq!(t.budget_us(opcodes::READ), None);
        assert_eq!(t.budget_us(opcodes::WRSR), None);
    }

    #[test]
    fn test_contains() {
        let cfg = FlashConfig::default();
        let last = FlashAddress::new(SST25WF040_SIZE - 1).unwrap();
        assert!(cfg.contains(last, 1));
        assert!(!cfg.contains(last, 2));
        assert!(!cfg.contains(FlashAddress::MAX, 1));
        assert!(cfg.contains(FlashAddress::default(), SST25WF040_SIZE));
    }

    #[test]
    fn test_kill_switch_must_fit() {
        let cfg = FlashConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.reserved(), Some(cfg.kill_switch));

        let small = FlashConfig {
            size: 256 * 1024,
            ..FlashConfig::default()
        };
        assert_eq!(small.validate(), Err(Error::AddressOutOfBounds));

        let moved = FlashConfig {
            kill_switch: FlashAddress::new(0x3_FFFF).unwrap(),
            ..small
        };
        assert_eq!(moved.validate(), Ok(()));

        let unguarded = FlashConfig {
            guard_kill_switch: false,
            ..moved
        };
        assert_eq!(unguarded.reserved(), None);
        assert_eq!(unguarded.validate(), Ok(()));
    }
}
