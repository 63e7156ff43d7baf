//! Serial transport
//!
//! The lowest layer every flash command rides on: a chip-select line and a
//! byte-at-a-time full-duplex shift register.
//!
//! - [`Transport`] is what the protocol engine talks to
//! - [`SerialPort`] is the register-level seam a board implements
//! - [`SpiTransport`] turns a `SerialPort` into a `Transport`, with bounded
//!   completion spins and an interrupt-fed [`RxLatch`]

mod latch;
mod port;

pub use latch::RxLatch;
pub use port::{SerialPort, SpiTransport, DEFAULT_SPIN_LIMIT};

use crate::error::Result;

/// Byte-level bus access
///
/// Implementations must keep chip-select asserted between `select` and
/// `deselect`; commands are framed entirely by those two calls.
pub trait Transport {
    /// Drive chip-select active (low)
    fn select(&mut self);

    /// Drive chip-select inactive (high)
    fn deselect(&mut self);

    /// Shift one byte out, returning once the hardware reports completion
    fn send_byte(&mut self, byte: u8) -> Result<()>;

    /// Clock a dummy byte and return the byte shifted in
    fn receive_byte(&mut self) -> Result<u8>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn select(&mut self) {
        (**self).select()
    }

    fn deselect(&mut self) {
        (**self).deselect()
    }

    fn send_byte(&mut self, byte: u8) -> Result<()> {
        (**self).send_byte(byte)
    }

    fn receive_byte(&mut self) -> Result<u8> {
        (**self).receive_byte()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
