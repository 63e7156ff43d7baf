//! Receive latch shared with the bus interrupt

use core::cell::Cell;

use critical_section::Mutex;

/// Single-slot hand-off for the byte received by the bus interrupt
///
/// The interrupt handler is the only producer and the transport the only
/// consumer. Both sides go through a critical section, so a byte is either
/// fully published or not visible at all.
pub struct RxLatch {
    slot: Mutex<Cell<Option<u8>>>,
}

impl RxLatch {
    /// Create an empty latch (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(None)),
        }
    }

    /// Publish a received byte from interrupt context
    ///
    /// Returns `false` if an unconsumed byte was overwritten (overrun).
    pub fn publish(&self, byte: u8) -> bool {
        critical_section::with(|cs| self.slot.borrow(cs).replace(Some(byte)).is_none())
    }

    /// Consume the latched byte, if any
    pub fn take(&self) -> Option<u8> {
        critical_section::with(|cs| self.slot.borrow(cs).take())
    }

    /// True if a byte is waiting
    pub fn is_full(&self) -> bool {
        critical_section::with(|cs| self.slot.borrow(cs).get().is_some())
    }
}

impl Default for RxLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes() {
        let latch = RxLatch::new();
        assert_eq!(latch.take(), None);
        assert!(latch.publish(0xA5));
        assert!(latch.is_full());
        assert_eq!(latch.take(), Some(0xA5));
        assert_eq!(latch.take(), None);
    }

    #[test]
    fn test_overrun_keeps_newest() {
        let latch = RxLatch::new();
        assert!(latch.publish(1));
        assert!(!latch.publish(2));
        assert_eq!(latch.take(), Some(2));
    }
}
