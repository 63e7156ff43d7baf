//! Raw flash commands: identify, status, read, write, erase, unprotect

use std::fs;
use std::path::Path;

use mooflash_core::protocol::{Flash, IdSelector};
use mooflash_core::spi::{FlashAddress, StatusRegister};
use mooflash_core::transport::Transport;
use mooflash_core::Error;

use crate::cli::EraseKind;
use crate::error::{CliError, Result};

/// Bytes per row of a hex dump
const DUMP_WIDTH: usize = 16;

fn address(addr: u32) -> Result<FlashAddress> {
    Ok(FlashAddress::try_from(addr)?)
}

/// Print the manufacturer and device IDs
pub fn run_id<T: Transport>(flash: &mut Flash<T>) -> Result<()> {
    let manufacturer = flash.read_id(IdSelector::Manufacturer)?;
    let device = flash.read_id(IdSelector::Device)?;
    println!("Manufacturer ID: 0x{:02X}", manufacturer);
    println!("Device ID:       0x{:02X}", device);
    Ok(())
}

/// Print the status register and its decoded bits
pub fn run_status<T: Transport>(flash: &mut Flash<T>) -> Result<()> {
    let status = flash.status()?;
    println!("Status: 0x{:02X}", status.bits());
    println!("  BUSY:      {}", status.is_busy());
    println!("  WEL:       {}", status.contains(StatusRegister::WEL));
    println!("  Protected: {}", status.is_protected());
    Ok(())
}

/// Read `length` bytes, dumping them or writing them to `output`
pub fn run_read<T: Transport>(
    flash: &mut Flash<T>,
    addr: u32,
    length: u32,
    output: Option<&Path>,
) -> Result<()> {
    let start = address(addr)?;
    if !flash.config().contains(start, length) {
        return Err(Error::AddressOutOfBounds.into());
    }
    let mut data = vec![0u8; length as usize];
    flash.read(start, &mut data)?;

    match output {
        Some(path) => {
            fs::write(path, &data).map_err(|source| CliError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => {
            for (row, chunk) in data.chunks(DUMP_WIDTH).enumerate() {
                let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
                println!(
                    "{:06X}: {}",
                    addr as usize + row * DUMP_WIDTH,
                    hex.join(" ")
                );
            }
        }
    }
    Ok(())
}

/// Program and verify one byte
pub fn run_write<T: Transport>(flash: &mut Flash<T>, addr: u32, value: u8) -> Result<()> {
    let target = address(addr)?;
    flash.write_byte(target, value)?;
    println!("Wrote 0x{:02X} at {}", value, target);
    Ok(())
}

/// Erase the region of `kind` containing `addr`
pub fn run_erase<T: Transport>(flash: &mut Flash<T>, kind: EraseKind, addr: u32) -> Result<()> {
    let target = address(addr)?;
    match kind {
        EraseKind::Sector => flash.erase_sector(target)?,
        EraseKind::Block32k => flash.erase_block_32k(target)?,
        EraseKind::Block64k => flash.erase_block_64k(target)?,
        EraseKind::Chip => flash.erase_chip()?,
    }
    match kind {
        EraseKind::Chip => println!("Chip erased"),
        _ => println!("Erased {:?} containing {}", kind, target),
    }
    Ok(())
}

/// Clear block protection
pub fn run_unprotect<T: Transport>(flash: &mut Flash<T>) -> Result<()> {
    flash.unprotect()?;
    println!("Block protection cleared");
    Ok(())
}
