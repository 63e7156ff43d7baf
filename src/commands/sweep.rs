//! Address sweep: erase a range, program an incrementing pattern, verify it
//!
//! Each value programmed is one more than the value read back at the
//! previous address, starting from 0.

use indicatif::{ProgressBar, ProgressStyle};
use mooflash_core::protocol::Flash;
use mooflash_core::spi::{opcodes, FlashAddress};
use mooflash_core::transport::Transport;
use mooflash_core::Error;

use crate::error::{CliError, Result};

/// Outcome of a completed sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Bytes programmed and read back intact
    pub verified: u32,
    /// Bytes that read back differently
    pub mismatched: u32,
}

/// Sweep `[start, end)`
pub fn run_sweep<T: Transport>(flash: &mut Flash<T>, start: u32, end: u32) -> Result<SweepReport> {
    if start >= end {
        return Err(CliError::InvalidParameter(format!(
            "sweep start 0x{:X} must be below end 0x{:X}",
            start, end
        )));
    }
    let first = FlashAddress::try_from(start)?;
    let last = FlashAddress::try_from(end - 1)?;
    if !flash.config().contains(first, end - start) {
        return Err(Error::AddressOutOfBounds.into());
    }

    flash.unprotect()?;

    // Chip erase is refused while the kill switch is reserved, so erase
    // only the sectors the sweep touches.
    let mut sector = first.align_down(opcodes::SECTOR_SIZE).value();
    while sector <= last.value() {
        flash.erase_sector(FlashAddress::try_from(sector)?)?;
        sector += opcodes::SECTOR_SIZE;
    }

    let pb = ProgressBar::new(u64::from(end - start));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta})")
            .map_err(|e| CliError::InvalidParameter(e.to_string()))?
            .progress_chars("#>-"),
    );

    let mut report = SweepReport::default();
    let mut value = 0u8;
    for offset in start..end {
        let addr = FlashAddress::try_from(offset)?;
        let read = match flash.write_byte(addr, value) {
            Ok(()) => {
                report.verified += 1;
                value
            }
            Err(Error::VerifyFailed { read, .. }) => {
                report.mismatched += 1;
                read
            }
            Err(e) => {
                pb.abandon();
                return Err(e.into());
            }
        };
        value = read.wrapping_add(1);
        pb.inc(1);
    }
    pb.finish_with_message("Sweep complete");

    println!(
        "Swept 0x{:06X}..0x{:06X}: {} verified, {} mismatched",
        start, end, report.verified, report.mismatched
    );
    if report.mismatched > 0 {
        return Err(CliError::SweepMismatch(report.mismatched));
    }
    Ok(report)
}
