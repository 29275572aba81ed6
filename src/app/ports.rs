//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeviceController (domain)
//! ```
//!
//! Driven adapters (BLE link, sensors, pump, clock, event sinks, storage)
//! implement these traits.  The
//! [`DeviceController`](super::service::DeviceController) consumes them via
//! generics, so the domain core never touches hardware directly.

use core::time::Duration;

use crate::config::SystemConfig;

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: BLE ↔ domain)
// ───────────────────────────────────────────────────────────────

/// One model write as delivered by the link layer.
pub type Fragment = heapless::Vec<u8, { crate::model::MAX_FRAGMENT_LEN }>;

/// The wireless link to the companion app.
pub trait LinkPort {
    /// Whether a central is currently connected.
    fn is_connected(&self) -> bool;

    /// Pop the oldest model fragment received since the last call.
    fn take_fragment(&mut self) -> Option<Fragment>;

    /// Whether a model write was lost since the last call.  The transfer
    /// in flight is then incomplete and must be restarted.
    fn take_transfer_interrupted(&mut self) -> bool {
        false
    }

    /// Expose the latest readings to the peer.
    fn publish_readings(&mut self, moisture: f32, temperature: f32);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain sensor data.
pub trait SensorPort {
    /// Soil moisture in percent.  `since_watered` is `None` until the
    /// first watering.
    fn read_moisture(&mut self, since_watered: Option<Duration>) -> f32;

    /// Ambient temperature in °C.
    fn read_temperature(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command the pump.
pub trait ActuatorPort {
    /// Run the pump for `duration`, returning once it is off again.
    fn activate(&mut self, duration: Duration);

    /// Force the pump off.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

pub trait TimePort {
    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}
