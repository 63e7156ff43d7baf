//! SST25 status register

use bitflags::bitflags;

bitflags! {
    /// Status register bits
    ///
    /// Bits 5 and 6 are reserved on the SST25WF040 and preserved as read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u8 {
        /// Write (program/erase) in progress
        const BUSY = 0x01;
        /// Write Enable Latch
        const WEL  = 0x02;
        /// Block Protect bit 0
        const BP0  = 0x04;
        /// Block Protect bit 1
        const BP1  = 0x08;
        /// Block Protect bit 2
        const BP2  = 0x10;
        /// Block Protection Lock-down
        const BPL  = 0x80;

        /// Every bit that restricts programming
        const PROTECTION = Self::BP0.bits() | Self::BP1.bits() | Self::BP2.bits() | Self::BPL.bits();
    }
}

impl StatusRegister {
    /// True while a program or erase is running
    pub fn is_busy(&self) -> bool {
        self.contains(Self::BUSY)
    }

    /// True if any block protection bit is set
    pub fn is_protected(&self) -> bool {
        self.intersects(Self::PROTECTION)
    }
}

impl From<u8> for StatusRegister {
    fn from(raw: u8) -> Self {
        Self::from_bits_retain(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_mask_matches_harness() {
        assert_eq!(StatusRegister::PROTECTION.bits(), 0x9C);
    }

    #[test]
    fn test_decode() {
        let sr = StatusRegister::from(0x03);
        assert!(sr.is_busy());
        assert!(sr.contains(StatusRegister::WEL));
        assert!(!sr.is_protected());

        let sr = StatusRegister::from(0x60);
        assert_eq!(sr.bits(), 0x60);
        assert!(!sr.is_busy());
    }
}
