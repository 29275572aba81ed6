//! Unified error types for the AIPlant firmware.
//!
//! Every subsystem error is a small `Copy` enum with its own `Display`, and
//! all of them convert into the top-level [`Error`].  Only a transfer
//! overflow ever travels past the [`DeviceController`]; the rest are
//! absorbed at the boundary where they occur.
//!
//! [`DeviceController`]: crate::app::service::DeviceController

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Model reassembly could not continue.
    Transfer(TransferError),
    /// A completed model image was rejected by the inference engine.
    Load(LoadError),
    /// A forward pass could not produce scores.
    Inference(InferenceError),
    /// The wireless link failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl Error {
    /// Process exit code used when this error halts the device.
    ///
    /// Transfer overflow gets its own code so a field technician can tell an
    /// undersized reassembly buffer apart from every other fault.
    pub const fn halt_code(&self) -> i32 {
        match self {
            Self::Init(_) => 1,
            Self::Transfer(TransferError::Overflow { .. }) => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer(e) => write!(f, "transfer: {e}"),
            Self::Load(e) => write!(f, "load: {e}"),
            Self::Inference(e) => write!(f, "inference: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transfer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// The incoming fragment does not fit in the reassembly buffer.
    Overflow {
        size: usize,
        incoming: usize,
        capacity: usize,
    },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow {
                size,
                incoming,
                capacity,
            } => write!(
                f,
                "fragment of {incoming} bytes at offset {size} exceeds {capacity}-byte buffer"
            ),
        }
    }
}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        Self::Transfer(e)
    }
}

// ---------------------------------------------------------------------------
// Model load errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// Header declares a schema version this engine cannot run.
    SchemaMismatch { found: u32, expected: u32 },
    /// Tensors for this model do not fit in the fixed arena.
    ArenaExhausted { required: usize, available: usize },
    /// Header or body could not be decoded.
    Malformed(&'static str),
    /// Body decoded, but the layer graph is not runnable.
    InvalidGraph(&'static str),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch { found, expected } => {
                write!(f, "schema version {found}, expected {expected}")
            }
            Self::ArenaExhausted {
                required,
                available,
            } => write!(f, "model needs {required} arena words, {available} available"),
            Self::Malformed(msg) => write!(f, "malformed image: {msg}"),
            Self::InvalidGraph(msg) => write!(f, "invalid graph: {msg}"),
        }
    }
}

impl From<LoadError> for Error {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceError {
    /// No model has been loaded yet.
    NotReady,
    /// The forward pass produced (or was fed) a non-finite value.
    ExecutionFailed,
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "no model loaded"),
            Self::ExecutionFailed => write!(f, "forward pass failed"),
        }
    }
}

impl From<InferenceError> for Error {
    fn from(e: InferenceError) -> Self {
        Self::Inference(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    BleInitFailed,
    FragmentTooLong,
    FragmentQueueFull,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BleInitFailed => write!(f, "BLE init failed"),
            Self::FragmentTooLong => write!(f, "model write exceeds one fragment"),
            Self::FragmentQueueFull => write!(f, "fragment queue full"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
