//! Over-the-air model pipeline.
//!
//! ```text
//!  BLE write ──▶ TransferBuffer ──▶ ModelStore ──▶ InferenceEngine
//!   (fragment)    (reassembly)     (ModelImage)     (arena + plan)
//! ```
//!
//! [`format`] defines the serialized image; [`fragment`] is the sender-side
//! counterpart of [`transfer`].

pub mod engine;
pub mod format;
pub mod fragment;
pub mod store;
pub mod transfer;

pub use engine::{ARENA_WORDS, InferenceEngine, ModelInfo, Scores, TensorHandle};
pub use store::{ModelImage, ModelStore};
pub use transfer::{MARKER, MAX_FRAGMENT_LEN, MODEL_BUFFER_CAPACITY, TransferBuffer, TransferResult};
