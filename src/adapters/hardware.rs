//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and the pump driver, exposing them through
//! [`SensorPort`] and [`ActuatorPort`].  On non-espidf targets the sensors
//! use their simulation paths and the pump is driven through whatever
//! `embedded-hal` pin the caller provides.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::pump::PumpDriver;
use crate::sensors::SensorHub;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<P, D> {
    sensor_hub: SensorHub,
    pump: PumpDriver<P, D>,
}

impl<P: OutputPin, D: DelayNs> HardwareAdapter<P, D> {
    pub fn new(sensor_hub: SensorHub, pump: PumpDriver<P, D>) -> Self {
        Self { sensor_hub, pump }
    }

    pub fn pump(&self) -> &PumpDriver<P, D> {
        &self.pump
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<P: OutputPin, D: DelayNs> SensorPort for HardwareAdapter<P, D> {
    fn read_moisture(&mut self, since_watered: Option<Duration>) -> f32 {
        self.sensor_hub.read_moisture(since_watered)
    }

    fn read_temperature(&mut self) -> f32 {
        self.sensor_hub.read_temperature()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<P: OutputPin, D: DelayNs> ActuatorPort for HardwareAdapter<P, D> {
    fn activate(&mut self, duration: Duration) {
        info!("pump: on for {}ms", duration.as_millis());
        if self.pump.activate(duration).is_err() {
            warn!("pump: GPIO write failed, forcing off");
            self.all_off();
        }
    }

    fn all_off(&mut self) {
        if self.pump.stop().is_err() {
            warn!("pump: failed to drive pin low");
        }
    }
}
