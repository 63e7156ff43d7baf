//! Register-level serial port and the transport built on it

use super::{RxLatch, Transport};
use crate::error::{Error, Result};

/// Default number of completion polls before giving up on the peripheral
pub const DEFAULT_SPIN_LIMIT: u32 = 10_000;

/// Register-level access to a synchronous serial peripheral
///
/// This is the seam a board support layer implements. Received bytes are
/// not read here: the receive interrupt publishes them into an [`RxLatch`].
pub trait SerialPort {
    /// Set chip select (CS is active low, so `active=true` means CS=0)
    fn set_cs(&mut self, active: bool);

    /// Load the transmit register, starting a shift
    fn write_tx(&mut self, byte: u8);

    /// True once the last shift has completed
    fn tx_complete(&self) -> bool;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

/// [`Transport`] over a [`SerialPort`] and its receive latch
///
/// Every wait on the hardware is bounded by `spin_limit` polls; a wedged
/// peripheral surfaces as [`Error::BusTimeout`] instead of hanging.
pub struct SpiTransport<'a, P> {
    port: P,
    latch: &'a RxLatch,
    spin_limit: u32,
}

impl<'a, P: SerialPort> SpiTransport<'a, P> {
    /// Create a transport with the default spin limit
    pub fn new(port: P, latch: &'a RxLatch) -> Self {
        Self::with_spin_limit(port, latch, DEFAULT_SPIN_LIMIT)
    }

    /// Create a transport with an explicit spin limit
    pub fn with_spin_limit(port: P, latch: &'a RxLatch, spin_limit: u32) -> Self {
        Self {
            port,
            latch,
            spin_limit: spin_limit.max(1),
        }
    }

    /// Get a reference to the underlying port
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Release the underlying port
    pub fn into_inner(self) -> P {
        self.port
    }

    fn shift(&mut self, byte: u8) -> Result<()> {
        self.port.write_tx(byte);
        for _ in 0..self.spin_limit {
            if self.port.tx_complete() {
                return Ok(());
            }
        }
        log::warn!("TX of 0x{:02X} never completed", byte);
        Err(Error::BusTimeout)
    }
}

impl<P: SerialPort> Transport for SpiTransport<'_, P> {
    fn select(&mut self) {
        self.port.set_cs(true);
    }

    fn deselect(&mut self) {
        self.port.set_cs(false);
    }

    fn send_byte(&mut self, byte: u8) -> Result<()> {
        // Bytes clocked in while transmitting are not wanted.
        let _ = self.latch.take();
        self.shift(byte)
    }

    fn receive_byte(&mut self) -> Result<u8> {
        let _ = self.latch.take();
        self.shift(0x00)?;
        for _ in 0..self.spin_limit {
            if let Some(byte) = self.latch.take() {
                return Ok(byte);
            }
        }
        log::warn!("RX latch never filled");
        Err(Error::BusTimeout)
    }

    fn delay_us(&mut self, us: u32) {
        self.port.delay_us(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Port whose "interrupt" fires synchronously on every shift
    struct LoopbackPort<'a> {
        latch: &'a RxLatch,
        cs_active: bool,
        sent: heapless::Vec<u8, 16>,
        reply: u8,
        complete: bool,
        raise_rx: bool,
        delayed_us: u32,
    }

    impl<'a> LoopbackPort<'a> {
        fn new(latch: &'a RxLatch) -> Self {
            Self {
                latch,
                cs_active: false,
                sent: heapless::Vec::new(),
                reply: 0x5A,
                complete: true,
                raise_rx: true,
                delayed_us: 0,
            }
        }
    }

    impl SerialPort for LoopbackPort<'_> {
        fn set_cs(&mut self, active: bool) {
            self.cs_active = active;
        }

        fn write_tx(&mut self, byte: u8) {
            let _ = self.sent.push(byte);
            if self.raise_rx {
                self.latch.publish(self.reply);
            }
        }

        fn tx_complete(&self) -> bool {
            self.complete
        }

        fn delay_us(&mut self, us: u32) {
            self.delayed_us += us;
        }
    }

    #[test]
    fn test_send_and_receive() {
        let latch = RxLatch::new();
        let mut t = SpiTransport::new(LoopbackPort::new(&latch), &latch);

        t.select();
        assert!(t.port().cs_active);
        t.send_byte(0x03).unwrap();
        assert_eq!(t.receive_byte(), Ok(0x5A));
        t.deselect();
        assert!(!t.port().cs_active);

        // The receive clocks a zero dummy byte.
        assert_eq!(t.port().sent.as_slice(), &[0x03, 0x00]);
        // Nothing stale left behind for the next command.
        assert!(!latch.is_full());
    }

    #[test]
    fn test_wedged_tx_times_out() {
        let latch = RxLatch::new();
        let mut port = LoopbackPort::new(&latch);
        port.complete = false;
        let mut t = SpiTransport::with_spin_limit(port, &latch, 8);

        assert_eq!(t.send_byte(0x06), Err(Error::BusTimeout));
        assert_eq!(t.receive_byte(), Err(Error::BusTimeout));
    }

    #[test]
    fn test_missing_rx_interrupt_times_out() {
        let latch = RxLatch::new();
        let mut port = LoopbackPort::new(&latch);
        port.raise_rx = false;
        let mut t = SpiTransport::with_spin_limit(port, &latch, 8);

        assert_eq!(t.send_byte(0x06), Ok(()));
        assert_eq!(t.receive_byte(), Err(Error::BusTimeout));
    }

    #[test]
    fn test_delay_is_forwarded() {
        let latch = RxLatch::new();
        let mut t = SpiTransport::new(LoopbackPort::new(&latch), &latch);
        t.delay_us(60);
        t.delay_us(40);
        assert_eq!(t.into_inner().delayed_us, 100);
    }
}
