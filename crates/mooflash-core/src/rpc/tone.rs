//! Square-wave tone on a GPIO line

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::ToneConfig;

/// Drives a buzzer pin with a fixed square wave
pub struct Beeper<P, D> {
    pin: P,
    delay: D,
    config: ToneConfig,
}

impl<P: OutputPin, D: DelayNs> Beeper<P, D> {
    /// Create a beeper with the default tone
    pub fn new(pin: P, delay: D) -> Self {
        Self::with_config(pin, delay, ToneConfig::default())
    }

    /// Create a beeper with an explicit tone
    pub fn with_config(pin: P, delay: D, config: ToneConfig) -> Self {
        Self { pin, delay, config }
    }

    /// Get the tone configuration
    pub fn config(&self) -> &ToneConfig {
        &self.config
    }

    /// Release the pin and delay
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    /// Play the tone, leaving the pin low
    pub fn beep(&mut self) -> Result<(), P::Error> {
        log::debug!(
            "beep: {} cycles, half period {}us",
            self.config.cycles,
            self.config.half_period_us
        );
        for _ in 0..self.config.cycles {
            self.pin.set_high()?;
            self.delay.delay_us(self.config.half_period_us);
            self.pin.set_low()?;
            self.delay.delay_us(self.config.half_period_us);
        }
        Ok(())
    }
}
