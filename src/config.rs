//! System configuration parameters
//!
//! Runtime-tunable parameters for the AIPlant firmware, persisted in NVS.
//! Buffer and arena capacities are compile-time constants and live next to
//! the code that owns them, not here.

use serde::{Deserialize, Serialize};

/// Longest advertised BLE name we accept.
pub const DEVICE_NAME_MAX: usize = 29;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Link ---
    /// Name advertised by the BLE peripheral
    pub device_name: heapless::String<DEVICE_NAME_MAX>,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Task watchdog timeout (milliseconds)
    pub watchdog_timeout_ms: u32,

    // --- Watering ---
    /// How long the pump runs per watering (milliseconds)
    pub watering_duration_ms: u32,

    // --- Simulation ---
    /// Seconds after watering until simulated soil reads fully dry
    pub moisture_dry_after_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("AIPlant");
        Self {
            device_name,

            // Timing
            control_loop_interval_ms: 1000, // 1 Hz
            watchdog_timeout_ms: 10_000,

            // Watering
            watering_duration_ms: 3000,

            // Simulation
            moisture_dry_after_secs: 600, // 10 min
        }
    }
}

impl SystemConfig {
    pub fn watering_duration(&self) -> core::time::Duration {
        core::time::Duration::from_millis(u64::from(self.watering_duration_ms))
    }

    /// Sleep between two control-loop ticks.
    pub fn control_loop_interval(&self) -> core::time::Duration {
        core::time::Duration::from_millis(u64::from(self.control_loop_interval_ms))
    }
}
