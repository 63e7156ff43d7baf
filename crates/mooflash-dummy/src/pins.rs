//! Host stand-ins for the buzzer pin and its delay source

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

/// Output pin that counts rising edges
#[derive(Debug, Default)]
pub struct ToggleCounter {
    rising_edges: u32,
    high: bool,
}

impl ToggleCounter {
    /// Low-to-high transitions seen so far
    pub fn rising_edges(&self) -> u32 {
        self.rising_edges
    }

    /// Current level
    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for ToggleCounter {
    type Error = Infallible;
}

impl OutputPin for ToggleCounter {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
        Ok(())
    }
}

/// Delay that only accumulates the requested time
#[derive(Debug, Default)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    /// Total requested delay in nanoseconds
    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}
