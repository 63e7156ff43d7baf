//! mooflash-dummy - In-memory SST25WF040 emulator for testing
//!
//! [`DummyFlash`] emulates the chip at the byte level: it sees the same
//! chip-select edges and byte stream the real part would, decodes commands
//! when chip select is released, enforces the write enable latch and block
//! protection, and models BUSY against a simulated clock advanced by
//! `delay_us`. It implements [`Transport`] directly, and [`LatchedPort`]
//! wraps it as a [`SerialPort`] so the interrupt-fed
//! [`SpiTransport`](mooflash_core::transport::SpiTransport) can be exercised
//! end to end.

mod pins;
#[cfg(test)]
mod properties;

pub use pins::{SimDelay, ToggleCounter};

use mooflash_core::error::Result;
use mooflash_core::spi::{opcodes, StatusRegister};
use mooflash_core::transport::{RxLatch, SerialPort, Transport};

/// How long the emulated device stays busy, in microseconds
#[derive(Debug, Clone, Copy)]
pub struct DeviceTimings {
    /// Byte program
    pub byte_program_us: u64,
    /// Sector erase
    pub sector_erase_us: u64,
    /// 32 KiB / 64 KiB block erase
    pub block_erase_us: u64,
    /// Chip erase
    pub chip_erase_us: u64,
}

impl Default for DeviceTimings {
    fn default() -> Self {
        // Typical figures, inside the engine's worst-case budgets.
        Self {
            byte_program_us: 30,
            sector_erase_us: 20_000,
            block_erase_us: 20_000,
            chip_erase_us: 50_000,
        }
    }
}

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Manufacturer ID returned for selector 0x00
    pub manufacturer_id: u8,
    /// Device ID returned for selector 0x01
    pub device_id: u8,
    /// Flash size in bytes (power of two)
    pub size: usize,
    /// Status register at power-up
    pub initial_status: u8,
    /// Busy durations
    pub timings: DeviceTimings,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xBF, // SST / Microchip
            device_id: 0x04,       // SST25WF040
            size: 512 * 1024,
            initial_status: 0x00,
            timings: DeviceTimings::default(),
        }
    }
}

/// Emulated SST25WF040
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    /// Writable status bits (block protection)
    protect: u8,
    write_enabled: bool,
    status_write_enabled: bool,
    selected: bool,
    frame: Vec<u8>,
    now_us: u64,
    busy_until_us: u64,
    executed: Vec<u8>,
}

impl DummyFlash {
    /// Create a new dummy flash with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![opcodes::ERASED; config.size];
        let protect = config.initial_status & StatusRegister::PROTECTION.bits();
        Self {
            config,
            data,
            protect,
            write_enabled: false,
            status_write_enabled: false,
            selected: false,
            frame: Vec::new(),
            now_us: 0,
            busy_until_us: 0,
            executed: Vec::new(),
        }
    }

    /// Create a new dummy flash with default configuration (SST25WF040)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Simulated time in microseconds
    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    /// Opcodes of every completed transaction, in order
    pub fn executed(&self) -> &[u8] {
        &self.executed
    }

    /// Forget the recorded transactions
    pub fn clear_executed(&mut self) {
        self.executed.clear();
    }

    /// Non-volatile block protection bits of the status register
    pub fn protection(&self) -> u8 {
        self.protect
    }

    /// True while an emulated program/erase is running
    pub fn is_busy(&self) -> bool {
        self.now_us < self.busy_until_us
    }

    /// Current status register value
    pub fn status(&self) -> u8 {
        let mut sr = StatusRegister::from_bits_retain(self.protect);
        sr.set(StatusRegister::WEL, self.write_enabled);
        sr.set(StatusRegister::BUSY, self.is_busy());
        sr.bits()
    }

    fn mask(&self, addr: usize) -> usize {
        addr & (self.config.size - 1)
    }

    fn frame_address(&self) -> usize {
        let f = &self.frame;
        self.mask(((f[1] as usize) << 16) | ((f[2] as usize) << 8) | f[3] as usize)
    }

    /// Shift one byte in, returning the byte shifted out
    fn clock(&mut self, mosi: u8) -> u8 {
        let idx = self.frame.len();
        let miso = match self.frame.first().copied() {
            Some(opcodes::RDSR) => self.status(),
            Some(opcodes::READ) if idx >= 4 && !self.is_busy() => {
                let addr = self.mask(self.frame_address() + (idx - 4));
                self.data[addr]
            }
            Some(opcodes::READ_ID) if idx >= 4 && !self.is_busy() => {
                // Output alternates between the two IDs, starting at the selected one.
                if (self.frame[3] as usize + idx - 4) & 1 == 0 {
                    self.config.manufacturer_id
                } else {
                    self.config.device_id
                }
            }
            _ => 0xFF,
        };
        self.frame.push(mosi);
        miso
    }

    /// Execute the frame collected while chip select was asserted
    fn execute(&mut self) {
        let Some(&opcode) = self.frame.first() else {
            return;
        };
        self.executed.push(opcode);

        if self.is_busy() && opcode != opcodes::RDSR {
            log::debug!("dummy: opcode 0x{:02X} ignored while busy", opcode);
            return;
        }

        match opcode {
            opcodes::WREN => self.write_enabled = true,
            opcodes::WRDI => self.write_enabled = false,
            opcodes::EWSR => self.status_write_enabled = true,
            opcodes::WRSR => {
                if self.frame.len() >= 2 && (self.status_write_enabled || self.write_enabled) {
                    self.protect = self.frame[1] & StatusRegister::PROTECTION.bits();
                } else {
                    log::debug!("dummy: WRSR without EWSR/WREN ignored");
                }
                self.status_write_enabled = false;
                self.write_enabled = false;
            }
            opcodes::BYTE_PROGRAM if self.frame.len() >= 5 => {
                if self.gate("program") {
                    let addr = self.frame_address();
                    // Flash programming: can only change 1 -> 0
                    self.data[addr] &= self.frame[4];
                    self.start_busy(self.config.timings.byte_program_us);
                }
            }
            opcodes::SE_20 if self.frame.len() >= 4 => {
                self.erase(opcodes::SECTOR_SIZE as usize, self.config.timings.sector_erase_us)
            }
            opcodes::BE_52 if self.frame.len() >= 4 => {
                self.erase(opcodes::BLOCK_32K_SIZE as usize, self.config.timings.block_erase_us)
            }
            opcodes::BE_D8 if self.frame.len() >= 4 => {
                self.erase(opcodes::BLOCK_64K_SIZE as usize, self.config.timings.block_erase_us)
            }
            opcodes::CE_60 => {
                if self.gate("chip erase") {
                    self.data.fill(opcodes::ERASED);
                    self.start_busy(self.config.timings.chip_erase_us);
                }
            }
            opcodes::RDSR | opcodes::READ | opcodes::READ_ID => {}
            _ => log::debug!(
                "dummy: opcode 0x{:02X} ({} bytes) not executed",
                opcode,
                self.frame.len()
            ),
        }
    }

    /// Check the write enable latch and protection, consuming the latch
    fn gate(&mut self, what: &str) -> bool {
        let enabled = core::mem::replace(&mut self.write_enabled, false);
        if !enabled {
            log::debug!("dummy: {} without WREN ignored", what);
            return false;
        }
        if self.protect & !StatusRegister::BPL.bits() != 0 {
            log::debug!("dummy: {} blocked by protection 0x{:02X}", what, self.protect);
            return false;
        }
        true
    }

    fn erase(&mut self, size: usize, busy_us: u64) {
        if !self.gate("erase") {
            return;
        }
        let start = self.frame_address() & !(size - 1);
        let end = core::cmp::min(start + size, self.data.len());
        self.data[start..end].fill(opcodes::ERASED);
        self.start_busy(busy_us);
    }

    fn start_busy(&mut self, us: u64) {
        self.busy_until_us = self.now_us + us;
    }
}

impl Transport for DummyFlash {
    fn select(&mut self) {
        if self.selected {
            log::warn!("dummy: select while already selected");
        }
        self.selected = true;
        self.frame.clear();
    }

    fn deselect(&mut self) {
        if self.selected {
            self.execute();
            self.frame.clear();
        }
        self.selected = false;
    }

    fn send_byte(&mut self, byte: u8) -> Result<()> {
        if self.selected {
            self.clock(byte);
        } else {
            log::warn!("dummy: byte 0x{:02X} sent without chip select", byte);
        }
        Ok(())
    }

    fn receive_byte(&mut self) -> Result<u8> {
        if self.selected {
            Ok(self.clock(0x00))
        } else {
            Ok(0xFF)
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us += u64::from(us);
    }
}

/// [`SerialPort`] view of a [`DummyFlash`] whose "receive interrupt" fills an [`RxLatch`]
pub struct LatchedPort<'a> {
    flash: DummyFlash,
    latch: &'a RxLatch,
}

impl<'a> LatchedPort<'a> {
    /// Wire the emulator to a latch
    pub fn new(flash: DummyFlash, latch: &'a RxLatch) -> Self {
        Self { flash, latch }
    }

    /// Get a reference to the emulator
    pub fn flash(&self) -> &DummyFlash {
        &self.flash
    }

    /// Release the emulator
    pub fn into_inner(self) -> DummyFlash {
        self.flash
    }
}

impl SerialPort for LatchedPort<'_> {
    fn set_cs(&mut self, active: bool) {
        if active {
            self.flash.select();
        } else {
            self.flash.deselect();
        }
    }

    fn write_tx(&mut self, byte: u8) {
        let miso = if self.flash.selected {
            self.flash.clock(byte)
        } else {
            0xFF
        };
        self.latch.publish(miso);
    }

    fn tx_complete(&self) -> bool {
        true
    }

    fn delay_us(&mut self, us: u32) {
        Transport::delay_us(&mut self.flash, us);
    }
}
