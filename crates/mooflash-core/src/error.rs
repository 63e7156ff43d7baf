//! Error types for mooflash-core
//!
//! A single no_std compatible error type shared by the transport, the flash
//! engine and the command dispatcher.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Bus errors
    /// The serial peripheral never reported completion
    BusTimeout,

    // Device errors
    /// The flash still reports BUSY after the operation's time budget
    DeviceBusy,
    /// Programmed byte did not read back as written
    VerifyFailed {
        /// Address that was programmed
        addr: u32,
        /// Byte that was programmed
        wrote: u8,
        /// Byte read back afterwards
        read: u8,
    },
    /// Block protection bits could not be cleared
    WriteProtected,

    // Address errors
    /// Address is beyond the flash chip size or wider than 24 bits
    AddressOutOfBounds,
    /// Operation would erase the reserved kill switch address
    ReservedRegion,

    // Dispatch errors
    /// No dispatch entry matches the requested command id
    UnknownCommand(u8),
    /// A dispatch entry with this id is already registered
    DuplicateCommand(u8),
    /// The dispatch table has no free slot
    DispatchTableFull,
    /// A request is already outstanding or its response was not consumed
    SessionBusy,
    /// Dispatch was called with no request pending
    NoPendingRequest,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusTimeout => write!(f, "serial bus timed out"),
            Self::DeviceBusy => write!(f, "flash device still busy"),
            Self::VerifyFailed { addr, wrote, read } => write!(
                f,
                "verify failed at 0x{:06X}: wrote 0x{:02X}, read 0x{:02X}",
                addr, wrote, read
            ),
            Self::WriteProtected => write!(f, "flash is write protected"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::ReservedRegion => write!(f, "range covers the reserved kill switch address"),
            Self::UnknownCommand(id) => write!(f, "unknown command id {}", id),
            Self::DuplicateCommand(id) => write!(f, "command id {} already registered", id),
            Self::DispatchTableFull => write!(f, "dispatch table full"),
            Self::SessionBusy => write!(f, "a command is already in flight"),
            Self::NoPendingRequest => write!(f, "no command pending"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
