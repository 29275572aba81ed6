//! AIPlant firmware library.
//!
//! Exposes the model pipeline, the device controller and its ports for
//! integration testing and host tooling. All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod pins;
pub mod policy;

// The ESP-IDF implementations inside these are cfg-gated; on the host
// they compile to simulation backends.
pub mod adapters;
pub mod drivers;
pub mod sensors;
