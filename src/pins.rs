//! GPIO / peripheral pin assignments for the AIPlant board (ESP32-S3).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Watering pump (logic-level MOSFET, active HIGH)
// ---------------------------------------------------------------------------

/// Digital output driving the pump MOSFET gate.
pub const PUMP_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Sensors: analog (ADC1)
// ---------------------------------------------------------------------------

/// NTC thermistor, 10 kΩ @ 25 °C, voltage divider to ADC.
/// ADC1 channel 8 (GPIO 9 on ESP32-S3).
pub const TEMP_ADC_GPIO: i32 = 9;
pub const TEMP_ADC_CHANNEL: u32 = 8;
