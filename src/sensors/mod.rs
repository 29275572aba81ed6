//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].

pub mod moisture;
pub mod temperature;

use core::time::Duration;

use moisture::MoistureSensor;
use temperature::TemperatureSensor;

/// Owns every sensor driver.
pub struct SensorHub {
    pub moisture: MoistureSensor,
    pub temperature: TemperatureSensor,
}

impl SensorHub {
    /// Pass in pre-built drivers (built in main where peripheral ownership
    /// is established).
    pub fn new(moisture: MoistureSensor, temperature: TemperatureSensor) -> Self {
        Self {
            moisture,
            temperature,
        }
    }

    pub fn read_moisture(&self, since_watered: Option<Duration>) -> f32 {
        self.moisture.read(since_watered).percent
    }

    pub fn read_temperature(&self) -> f32 {
        self.temperature.read().celsius
    }
}
