//! Watering pump driver.
//!
//! A single MOSFET-switched pump: one `OutputPin` and a blocking delay.
//! [`PumpDriver::activate`] holds the pin high for the requested duration
//! and always returns with the pump off.
//!
//! Generic over `embedded-hal` traits; on ESP-IDF the firmware passes an
//! `esp-idf-hal` `PinDriver` and `FreeRtos` delay, tests pass mocks.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Stopped,
    Running,
}

pub struct PumpDriver<P, D> {
    pin: P,
    delay: D,
    state: PumpState,
    activations: u32,
}

impl<P: OutputPin, D: DelayNs> PumpDriver<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            pin,
            delay,
            state: PumpState::Stopped,
            activations: 0,
        }
    }

    /// Run the pump for `duration`, blocking.
    pub fn activate(&mut self, duration: Duration) -> Result<(), P::Error> {
        self.pin.set_high()?;
        self.state = PumpState::Running;
        self.activations = self.activations.wrapping_add(1);

        self.delay
            .delay_ms(duration.as_millis().min(u128::from(u32::MAX)) as u32);

        self.stop()
    }

    pub fn stop(&mut self) -> Result<(), P::Error> {
        // Record Stopped even if the write fails; callers log and retry.
        self.state = PumpState::Stopped;
        self.pin.set_low()
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PumpState::Running
    }

    /// Completed or attempted activations since boot.
    pub fn activations(&self) -> u32 {
        self.activations
    }
}
