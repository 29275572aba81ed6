//! Application core: domain logic behind port traits.
//!
//! The business rules for AIPlant: fragment ingestion, model loading,
//! per-cycle inference and the watering decision.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
pub mod state;
