//! SPI flash wire types
//!
//! Opcodes, the 24-bit address type and the status register layout of the
//! SST25WF040.

mod address;
pub mod opcodes;
mod status;

pub use address::FlashAddress;
pub use opcodes::*;
pub use status::StatusRegister;
