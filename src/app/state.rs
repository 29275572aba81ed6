//! Per-device mutable state owned by the controller.

use core::time::Duration;

use crate::error::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    /// A completed transfer is being finalized and loaded.
    pub transfer_pending: bool,
    /// The engine holds a model that can run.
    pub model_ready: bool,
    /// Clock time of the last watering, `None` until the pump first runs.
    pub last_actuation_ms: Option<u64>,
    /// Cached decision from the most recent inference.
    pub should_water: bool,
    /// Set once the device has hit a fatal fault.
    pub halt: Option<Error>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time since the last watering, as fed to the moisture sensor.
    pub fn since_watered(&self, now_ms: u64) -> Option<Duration> {
        self.last_actuation_ms
            .map(|at| Duration::from_millis(now_ms.saturating_sub(at)))
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_some()
    }
}
