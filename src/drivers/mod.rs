//! Peripheral drivers: ADC, pump output, and the task watchdog.

pub mod adc;
pub mod pump;
pub mod watchdog;
