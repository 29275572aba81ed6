//! Ambient temperature from an NTC thermistor.
//!
//! ```text
//!  3V3 ── R_fixed ──┬── NTC ── GND
//!                   │
//!                 ADC1 CH8
//! ```
//!
//! The raw code is turned into NTC resistance through the divider ratio and
//! then into °C with the Beta model.

use log::warn;

use crate::drivers::adc::{FULL_SCALE, OneshotAdc};
use crate::pins;

const KELVIN: f32 = 273.15;

/// Codes this close to either rail mean an open or shorted thermistor.
const RAIL_MARGIN: u16 = 12;

/// Reported when the thermistor is disconnected, shorted or unreadable.
pub const FAULT_CELSIUS: f32 = -40.0;

/// Beta-model parameters of the thermistor and its divider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thermistor {
    /// NTC resistance at `nominal_celsius`, ohms.
    pub nominal_ohms: f32,
    pub nominal_celsius: f32,
    pub beta: f32,
    /// Fixed divider resistor on the supply side, ohms.
    pub fixed_ohms: f32,
}

impl Default for Thermistor {
    /// 10 kΩ @ 25 °C, B = 3950, 10 kΩ divider.
    fn default() -> Self {
        Self {
            nominal_ohms: 10_000.0,
            nominal_celsius: 25.0,
            beta: 3950.0,
            fixed_ohms: 10_000.0,
        }
    }
}

impl Thermistor {
    pub fn celsius(&self, raw: u16) -> f32 {
        if raw <= RAIL_MARGIN || raw >= FULL_SCALE - RAIL_MARGIN {
            return FAULT_CELSIUS;
        }
        let ratio = f32::from(raw) / f32::from(FULL_SCALE);
        let ohms = self.fixed_ohms * ratio / (1.0 - ratio);
        let inv_kelvin =
            1.0 / (self.nominal_celsius + KELVIN) + (ohms / self.nominal_ohms).ln() / self.beta;
        if !inv_kelvin.is_finite() || inv_kelvin <= 0.0 {
            return FAULT_CELSIUS;
        }
        1.0 / inv_kelvin - KELVIN
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TemperatureReading {
    pub raw: u16,
    pub celsius: f32,
}

pub struct TemperatureSensor {
    adc: OneshotAdc,
    thermistor: Thermistor,
}

impl TemperatureSensor {
    pub fn new(adc: OneshotAdc) -> Self {
        log::info!(
            "temperature: NTC on GPIO{} (ADC1 CH{})",
            pins::TEMP_ADC_GPIO,
            adc.channel()
        );
        Self {
            adc,
            thermistor: Thermistor::default(),
        }
    }

    pub fn read(&self) -> TemperatureReading {
        match self.adc.read() {
            Ok(raw) => TemperatureReading {
                raw,
                celsius: self.thermistor.celsius(raw),
            },
            Err(e) => {
                warn!("temperature: {}", e);
                TemperatureReading {
                    raw: 0,
                    celsius: FAULT_CELSIUS,
                }
            }
        }
    }

    pub fn adc(&self) -> &OneshotAdc {
        &self.adc
    }
}
