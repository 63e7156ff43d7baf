//! 24-bit flash addresses

use crate::error::{Error, Result};

/// A 24-bit offset into the flash address space
///
/// Every addressed SST25 command carries exactly three address bytes, so
/// values wider than 24 bits are rejected at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(try_from = "u32", into = "u32"))]
pub struct FlashAddress(u32);

impl FlashAddress {
    /// Largest representable address
    pub const MAX: FlashAddress = FlashAddress(0x00FF_FFFF);

    /// Create an address, returning `None` if it does not fit in 24 bits
    pub const fn new(addr: u32) -> Option<Self> {
        if addr > Self::MAX.0 {
            None
        } else {
            Some(Self(addr))
        }
    }

    /// Raw offset
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Address bytes in wire order (bits 23-16, 15-8, 7-0)
    pub const fn to_bytes(&self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    /// Start of the `size`-aligned region containing this address
    ///
    /// `size` must be a power of two.
    pub const fn align_down(&self, size: u32) -> Self {
        Self(self.0 & !(size - 1))
    }

    /// Address `offset` bytes further on, if still within 24 bits
    pub fn checked_add(&self, offset: u32) -> Option<Self> {
        self.0.checked_add(offset).and_then(Self::new)
    }
}

impl TryFrom<u32> for FlashAddress {
    type Error = Error;

    fn try_from(addr: u32) -> Result<Self> {
        Self::new(addr).ok_or(Error::AddressOutOfBounds)
    }
}

impl From<FlashAddress> for u32 {
    fn from(addr: FlashAddress) -> u32 {
        addr.0
    }
}

impl core::fmt::Display for FlashAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}
