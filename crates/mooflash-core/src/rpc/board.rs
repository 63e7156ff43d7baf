//! Handlers backed by the flash engine and a buzzer

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::{Beeper, Handlers};
use crate::killswitch::KillSwitch;
use crate::protocol::Flash;
use crate::transport::Transport;

/// The on-device resources the standard commands act on
pub struct Board<T, P, D> {
    /// External flash holding the kill switch
    pub flash: Flash<T>,
    /// Tone generator
    pub beeper: Beeper<P, D>,
}

impl<T, P, D> Board<T, P, D>
where
    T: Transport,
    P: OutputPin,
    D: DelayNs,
{
    /// Bundle the flash engine and beeper
    pub fn new(flash: Flash<T>, beeper: Beeper<P, D>) -> Self {
        Self { flash, beeper }
    }

    /// Kill switch over this board's flash
    pub fn kill_switch(&mut self) -> KillSwitch<'_, T> {
        KillSwitch::new(&mut self.flash)
    }
}

impl<T, P, D> Handlers for Board<T, P, D>
where
    T: Transport,
    P: OutputPin,
    D: DelayNs,
{
    fn beep(&mut self) -> u16 {
        match self.beeper.beep() {
            Ok(()) => 1,
            Err(_) => {
                log::error!("tone pin failed");
                0
            }
        }
    }

    fn kill(&mut self) -> u16 {
        match self.kill_switch().kill() {
            Ok(()) => 1,
            Err(e) => {
                log::error!("kill failed: {}", e);
                0
            }
        }
    }
}
