//! SST25WF040 command opcodes
//!
//! The subset of the JEDEC SPI flash command set implemented by the
//! SST25WF040 and used by this driver. Values are bit-exact with the datasheet.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any program/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL bit in the status register
pub const WRDI: u8 = 0x04;
/// Enable Write Status Register (SST)
pub const EWSR: u8 = 0x50;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Write Status Register
pub const WRSR: u8 = 0x01;

// ============================================================================
// Identification
// ============================================================================

/// Read manufacturer / device ID
pub const READ_ID: u8 = 0x90;

// ============================================================================
// Read / program
// ============================================================================

/// Read Data (up to 20 MHz)
pub const READ: u8 = 0x03;
/// Byte Program
pub const BYTE_PROGRAM: u8 = 0x02;

// ============================================================================
// Erase commands
// ============================================================================

/// Sector Erase 4KB
pub const SE_20: u8 = 0x20;
/// Block Erase 32KB
pub const BE_52: u8 = 0x52;
/// Block Erase 64KB
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_60: u8 = 0x60;

// ============================================================================
// Erase granularities
// ============================================================================

/// Bytes covered by [`SE_20`]
pub const SECTOR_SIZE: u32 = 4 * 1024;
/// Bytes covered by [`BE_52`]
pub const BLOCK_32K_SIZE: u32 = 32 * 1024;
/// Bytes covered by [`BE_D8`]
pub const BLOCK_64K_SIZE: u32 = 64 * 1024;

/// Value of every byte after erase
pub const ERASED: u8 = 0xFF;
