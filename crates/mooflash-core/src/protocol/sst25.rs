//! SST25 protocol implementation
//!
//! Every addressed command has the same shape on the wire:
//!
//! ```text
//! CS low | opcode | A23-A16 | A15-A8 | A7-A0 | payload... | CS high
//! ```
//!
//! Program and erase commands are each preceded by their own WREN
//! transaction, since the device clears the write enable latch after every
//! completed write. Status register writes are preceded by EWSR.
//!
//! Completion is handled by [`WaitPolicy`]: either a fixed worst-case delay
//! from [`Timings`](crate::config::Timings) followed by a single BUSY check,
//! or polling BUSY within the same budget.

use crate::config::{FlashConfig, WaitPolicy};
use crate::error::{Error, Result};
use crate::spi::{opcodes, FlashAddress, StatusRegister};
use crate::transport::Transport;

/// Status register writes attempted by [`Flash::unprotect`]
const UNPROTECT_ATTEMPTS: usize = 3;

/// Which identifier [`Flash::read_id`] returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IdSelector {
    /// Manufacturer ID (0xBF for SST)
    Manufacturer = 0x00,
    /// Device ID
    Device = 0x01,
}

/// SST25 flash command engine
pub struct Flash<T> {
    transport: T,
    config: FlashConfig,
}

impl<T: Transport> Flash<T> {
    /// Create an engine with the default SST25WF040 configuration
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, FlashConfig::default())
    }

    /// Create an engine with an explicit configuration
    pub fn with_config(transport: T, config: FlashConfig) -> Self {
        Self { transport, config }
    }

    /// Get the configuration
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Get a reference to the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    // =========================================================================
    // Framing
    // =========================================================================

    /// Run `f` with chip select asserted; CS is released even if `f` fails
    fn transaction<R>(&mut self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        self.transport.select();
        let result = f(&mut self.transport);
        self.transport.deselect();
        result
    }

    /// A command consisting of the opcode alone
    fn simple(&mut self, opcode: u8) -> Result<()> {
        self.transaction(|t| t.send_byte(opcode))
    }

    /// Opcode followed by the three address bytes, CS still asserted
    fn header(t: &mut T, opcode: u8, addr: FlashAddress) -> Result<()> {
        t.send_byte(opcode)?;
        for byte in addr.to_bytes() {
            t.send_byte(byte)?;
        }
        Ok(())
    }

    fn check_range(&self, addr: FlashAddress, len: u32) -> Result<()> {
        if self.config.contains(addr, len) {
            Ok(())
        } else {
            Err(Error::AddressOutOfBounds)
        }
    }

    fn check_reserved(&self, start: FlashAddress, len: u32) -> Result<()> {
        match self.config.reserved() {
            Some(reserved) if reserved >= start && reserved.value() - start.value() < len => {
                log::warn!(
                    "refusing erase of {}+0x{:X}: covers reserved {}",
                    start,
                    len,
                    reserved
                );
                Err(Error::ReservedRegion)
            }
            _ => Ok(()),
        }
    }

    /// Wait for the operation started by `opcode` to complete
    fn wait_complete(&mut self, opcode: u8) -> Result<()> {
        let budget = self.config.timings.budget_us(opcode).unwrap_or(0);

        match self.config.wait {
            WaitPolicy::FixedDelay => {
                self.transport.delay_us(budget);
                if self.status()?.is_busy() {
                    log::warn!("opcode 0x{:02X} still busy after {}us", opcode, budget);
                    return Err(Error::DeviceBusy);
                }
                Ok(())
            }
            WaitPolicy::PollBusy { interval_us } => {
                let interval = interval_us.max(1);
                let mut waited = 0u32;
                loop {
                    if !self.status()?.is_busy() {
                        log::trace!("opcode 0x{:02X} done after ~{}us", opcode, waited);
                        return Ok(());
                    }
                    if waited >= budget {
                        log::warn!("opcode 0x{:02X} still busy after {}us", opcode, waited);
                        return Err(Error::DeviceBusy);
                    }
                    let step = interval.min(budget - waited);
                    self.transport.delay_us(step);
                    waited += step;
                }
            }
        }
    }

    // =========================================================================
    // Register and control commands
    // =========================================================================

    /// Read the raw status register
    pub fn read_status_register(&mut self) -> Result<u8> {
        self.transaction(|t| {
            t.send_byte(opcodes::RDSR)?;
            t.receive_byte()
        })
    }

    /// Read and decode the status register
    pub fn status(&mut self) -> Result<StatusRegister> {
        self.read_status_register().map(StatusRegister::from)
    }

    /// Check if a program or erase operation is in progress
    pub fn is_busy(&mut self) -> Result<bool> {
        Ok(self.status()?.is_busy())
    }

    /// Send the Write Enable command
    pub fn write_enable(&mut self) -> Result<()> {
        self.simple(opcodes::WREN)
    }

    /// Send the Write Disable command
    pub fn write_disable(&mut self) -> Result<()> {
        self.simple(opcodes::WRDI)
    }

    /// Send the Enable Write Status Register command
    pub fn enable_write_status_register(&mut self) -> Result<()> {
        self.simple(opcodes::EWSR)
    }

    /// Write the status register
    ///
    /// Automatically sends EWSR before writing.
    pub fn write_status_register(&mut self, value: u8) -> Result<()> {
        self.enable_write_status_register()?;
        self.transaction(|t| {
            t.send_byte(opcodes::WRSR)?;
            t.send_byte(value)
        })
    }

    /// Clear the block protection bits so the whole array can be programmed
    pub fn unprotect(&mut self) -> Result<()> {
        for attempt in 0..UNPROTECT_ATTEMPTS {
            let status = self.status()?;
            if !status.is_protected() {
                return Ok(());
            }
            log::debug!(
                "clearing block protection (status 0x{:02X}, attempt {})",
                status.bits(),
                attempt + 1
            );
            self.write_status_register(0x00)?;
        }

        if self.status()?.is_protected() {
            log::warn!("block protection bits will not clear");
            return Err(Error::WriteProtected);
        }
        Ok(())
    }

    /// Read the manufacturer or device identifier
    ///
    /// Sends READ-ID, two reserved zero bytes and the selector, then reads
    /// one byte.
    pub fn read_id(&mut self, selector: IdSelector) -> Result<u8> {
        self.transaction(|t| {
            t.send_byte(opcodes::READ_ID)?;
            t.send_byte(0x00)?;
            t.send_byte(0x00)?;
            t.send_byte(selector as u8)?;
            t.receive_byte()
        })
    }

    // =========================================================================
    // Array access
    // =========================================================================

    /// Read one byte
    pub fn read_byte(&mut self, addr: FlashAddress) -> Result<u8> {
        self.check_range(addr, 1)?;
        self.transaction(|t| {
            Self::header(t, opcodes::READ, addr)?;
            t.receive_byte()
        })
    }

    /// Read consecutive bytes in a single READ transaction
    pub fn read(&mut self, addr: FlashAddress, buf: &mut [u8]) -> Result<()> {
        let len = u32::try_from(buf.len()).map_err(|_| Error::AddressOutOfBounds)?;
        self.check_range(addr, len)?;
        if buf.is_empty() {
            return Ok(());
        }
        self.transaction(|t| {
            Self::header(t, opcodes::READ, addr)?;
            for byte in buf.iter_mut() {
                *byte = t.receive_byte()?;
            }
            Ok(())
        })
    }

    /// Program one byte and verify it
    ///
    /// Programming can only clear bits; writing a value that needs a 0 bit
    /// raised to 1 fails verification unless the byte was erased first.
    pub fn write_byte(&mut self, addr: FlashAddress, byte: u8) -> Result<()> {
        self.check_range(addr, 1)?;

        self.write_enable()?;
        self.transaction(|t| {
            Self::header(t, opcodes::BYTE_PROGRAM, addr)?;
            t.send_byte(byte)
        })?;
        self.wait_complete(opcodes::BYTE_PROGRAM)?;

        let read = self.read_byte(addr)?;
        if read != byte {
            log::warn!(
                "program verify failed at {}: wrote 0x{:02X}, read 0x{:02X}",
                addr,
                byte,
                read
            );
            return Err(Error::VerifyFailed {
                addr: addr.value(),
                wrote: byte,
                read,
            });
        }
        log::trace!("programmed 0x{:02X} at {}", byte, addr);
        Ok(())
    }

    // =========================================================================
    // Erase
    // =========================================================================

    fn erase_region(&mut self, opcode: u8, addr: FlashAddress, size: u32) -> Result<()> {
        self.check_range(addr, 1)?;
        let start = addr.align_down(size);
        self.check_reserved(start, size)?;

        log::debug!("erase 0x{:02X}: {}+0x{:X}", opcode, start, size);
        self.write_enable()?;
        self.transaction(|t| Self::header(t, opcode, addr))?;
        self.wait_complete(opcode)
    }

    /// Erase the 4 KiB sector containing `addr`
    pub fn erase_sector(&mut self, addr: FlashAddress) -> Result<()> {
        self.erase_region(opcodes::SE_20, addr, opcodes::SECTOR_SIZE)
    }

    /// Erase the 32 KiB block containing `addr`
    pub fn erase_block_32k(&mut self, addr: FlashAddress) -> Result<()> {
        self.erase_region(opcodes::BE_52, addr, opcodes::BLOCK_32K_SIZE)
    }

    /// Erase the 64 KiB block containing `addr`
    pub fn erase_block_64k(&mut self, addr: FlashAddress) -> Result<()> {
        self.erase_region(opcodes::BE_D8, addr, opcodes::BLOCK_64K_SIZE)
    }

    /// Erase the entire chip
    pub fn erase_chip(&mut self) -> Result<()> {
        self.check_reserved(FlashAddress::default(), self.config.size)?;

        log::debug!("chip erase");
        self.write_enable()?;
        self.simple(opcodes::CE_60)?;
        self.wait_complete(opcodes::CE_60)
    }
}
