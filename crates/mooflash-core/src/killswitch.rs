//! Persistent one-way kill switch
//!
//! One byte at [`KILL_SWITCH_ADDR`] records whether the unit has been
//! disabled. The byte is stored inverted: erased flash (0xFF) decodes as 0
//! (alive) and [`KILLED`] (0xFE) decodes as 1 (killed). Moving from alive to
//! killed therefore only clears a bit, which NOR flash can do without an
//! erase, and the flash engine refuses any erase that covers the address.

use crate::error::Result;
use crate::protocol::Flash;
use crate::spi::FlashAddress;
use crate::transport::Transport;

/// Default kill switch location: the last byte of the SST25WF040
pub const KILL_SWITCH_ADDR: FlashAddress = match FlashAddress::new(0x07_FFFF) {
    Some(addr) => addr,
    None => panic!("kill switch address must fit in 24 bits"),
};

/// Raw byte programmed to mark the unit killed
pub const KILLED: u8 = !1;

/// Decode a stored kill switch byte into its logical value
pub const fn decode(raw: u8) -> u8 {
    !raw
}

/// Kill switch backed by one flash byte
pub struct KillSwitch<'a, T> {
    flash: &'a mut Flash<T>,
    addr: FlashAddress,
}

impl<'a, T: Transport> KillSwitch<'a, T> {
    /// Kill switch at the engine's configured address
    ///
    /// The engine refuses erases covering this address unless its
    /// configuration turns the guard off.
    pub fn new(flash: &'a mut Flash<T>) -> Self {
        let addr = flash.config().kill_switch;
        Self::at(flash, addr)
    }

    /// Kill switch at an explicit address, outside the engine's erase guard
    pub fn at(flash: &'a mut Flash<T>, addr: FlashAddress) -> Self {
        Self { flash, addr }
    }

    /// Address of the persisted byte
    pub fn address(&self) -> FlashAddress {
        self.addr
    }

    /// Logical value of the flag (0 = alive, nonzero = killed)
    pub fn value(&mut self) -> Result<u8> {
        self.flash.read_byte(self.addr).map(decode)
    }

    /// True if the unit has been killed
    pub fn is_killed(&mut self) -> Result<bool> {
        Ok(self.value()? != 0)
    }

    /// Permanently mark the unit killed
    ///
    /// Succeeds without touching flash if it is already killed. Otherwise
    /// the result is the verified outcome of programming the marker.
    pub fn kill(&mut self) -> Result<()> {
        if self.is_killed()? {
            log::debug!("kill switch at {} already set", self.addr);
            return Ok(());
        }

        log::info!("setting kill switch at {}", self.addr);
        self.flash.write_byte(self.addr, KILLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::ERASED;

    #[test]
    fn test_encoding() {
        assert_eq!(decode(ERASED), 0);
        assert_eq!(decode(KILLED), 1);
        // Killing only clears bits of the erased value.
        assert_eq!(KILLED & ERASED, KILLED);
        // Any further bit loss still reads as killed.
        assert_ne!(decode(0x00), 0);
    }

    #[test]
    fn test_address_is_last_byte() {
        assert_eq!(
            KILL_SWITCH_ADDR.value(),
            crate::config::SST25WF040_SIZE - 1
        );
    }
}
