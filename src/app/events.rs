//! Outbound application events.
//!
//! The [`DeviceController`](super::service::DeviceController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them; the firmware logs each one
//! as a tagged line.

use crate::error::{Error, InferenceError, LoadError};
use crate::model::{ModelInfo, Scores};

/// One sensor sample taken at the start of a cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    /// Soil moisture, percent.
    pub moisture: f32,
    /// Ambient temperature, °C.
    pub temperature: f32,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller has been constructed and is about to tick.
    Started,

    /// Readings were sampled and handed to the link.
    ReadingsPublished(Readings),

    /// A model fragment was appended to the transfer buffer.
    TransferProgress { fragments: u32, bytes: usize },

    /// The link lost a write; the partial transfer was discarded.
    TransferAborted { fragments: u32, bytes: usize },

    /// A completed transfer loaded into the engine.
    ModelLoaded(ModelInfo),

    /// A completed transfer was rejected; the previous model (if any) stays.
    ModelRejected(LoadError),

    /// The forward pass failed; this cycle will not water.
    InferenceFailed(InferenceError),

    /// The watering decision for this cycle.
    Decision { scores: Scores, water: bool },

    /// The pump ran.
    Watered { duration_ms: u32, at_ms: u64 },

    /// The device hit a fatal fault and stops processing.
    Halted(Error),
}
