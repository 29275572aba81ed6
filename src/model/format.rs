//! Serialized model layout.
//!
//! ```text
//! [0..4)  magic  b"APLM"
//! [4..8)  schema version, u32 little-endian
//! [8..)   postcard-encoded ModelGraph
//! ```
//!
//! The schema version sits outside the postcard body so that an image from
//! an incompatible trainer is rejected as a mismatch rather than as garbage.

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

pub const MAGIC: [u8; 4] = *b"APLM";
/// The only schema this firmware can execute.
pub const SCHEMA_VERSION: u32 = 3;
pub const HEADER_LEN: usize = 8;

/// Input slots: temperature, moisture.
pub const INPUTS: usize = 2;
/// Output slots: stay score, water score.
pub const OUTPUTS: usize = 2;
/// Deepest graph the engine will plan.
pub const MAX_LAYERS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Linear,
    Relu,
    Softmax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Layer {
    /// `(x - mean) / sqrt(variance)`, per feature.
    Normalize { mean: Vec<f32>, variance: Vec<f32> },
    /// Fully connected; `weights` is row-major `outputs × inputs`.
    Dense {
        inputs: u16,
        outputs: u16,
        weights: Vec<f32>,
        bias: Vec<f32>,
        activation: Activation,
    },
}

impl Layer {
    /// Arena words this layer's parameters occupy once loaded.
    pub fn parameter_words(&self) -> usize {
        match self {
            Self::Normalize { mean, .. } => 2 * mean.len(),
            Self::Dense { weights, bias, .. } => weights.len() + bias.len(),
        }
    }

    fn output_width(&self, input_width: usize) -> usize {
        match self {
            Self::Normalize { .. } => input_width,
            Self::Dense { outputs, .. } => *outputs as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGraph {
    pub inputs: u8,
    pub outputs: u8,
    pub layers: Vec<Layer>,
}

impl ModelGraph {
    /// Check that the graph maps two inputs to two outputs through layers
    /// of consistent width, with finite parameters.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.inputs as usize != INPUTS {
            return Err(LoadError::InvalidGraph("model must take 2 inputs"));
        }
        if self.outputs as usize != OUTPUTS {
            return Err(LoadError::InvalidGraph("model must produce 2 outputs"));
        }
        if self.layers.is_empty() {
            return Err(LoadError::InvalidGraph("no layers"));
        }
        if self.layers.len() > MAX_LAYERS {
            return Err(LoadError::InvalidGraph("too many layers"));
        }

        let mut width = INPUTS;
        for layer in &self.layers {
            match layer {
                Layer::Normalize { mean, variance } => {
                    if mean.len() != width || variance.len() != width {
                        return Err(LoadError::InvalidGraph("normalize width mismatch"));
                    }
                    if !all_finite(mean) || !all_finite(variance) {
                        return Err(LoadError::InvalidGraph("non-finite parameter"));
                    }
                    if variance.iter().any(|v| *v < 0.0) {
                        return Err(LoadError::InvalidGraph("negative variance"));
                    }
                }
                Layer::Dense {
                    inputs,
                    outputs,
                    weights,
                    bias,
                    ..
                } => {
                    let (inputs, outputs) = (*inputs as usize, *outputs as usize);
                    if inputs != width {
                        return Err(LoadError::InvalidGraph("dense input width mismatch"));
                    }
                    if outputs == 0 {
                        return Err(LoadError::InvalidGraph("dense layer with no outputs"));
                    }
                    if weights.len() != inputs * outputs || bias.len() != outputs {
                        return Err(LoadError::InvalidGraph("dense parameter count mismatch"));
                    }
                    if !all_finite(weights) || !all_finite(bias) {
                        return Err(LoadError::InvalidGraph("non-finite parameter"));
                    }
                }
            }
            width = layer.output_width(width);
        }

        if width != OUTPUTS {
            return Err(LoadError::InvalidGraph("last layer must produce 2 outputs"));
        }
        Ok(())
    }

    /// Widest activation produced by any layer.
    pub fn max_width(&self) -> usize {
        let mut width = self.inputs as usize;
        let mut widest = width;
        for layer in &self.layers {
            width = layer.output_width(width);
            widest = widest.max(width);
        }
        widest
    }

    pub fn parameter_words(&self) -> usize {
        self.layers.iter().map(Layer::parameter_words).sum()
    }
}

fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Read the schema version from an image header.
pub fn schema_version(image: &[u8]) -> Result<u32, LoadError> {
    if image.len() < HEADER_LEN {
        return Err(LoadError::Malformed("shorter than header"));
    }
    if image[..4] != MAGIC {
        return Err(LoadError::Malformed("bad magic"));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&image[4..HEADER_LEN]);
    Ok(u32::from_le_bytes(version))
}

/// Parse and validate a complete image.
pub fn decode(image: &[u8]) -> Result<ModelGraph, LoadError> {
    let found = schema_version(image)?;
    if found != SCHEMA_VERSION {
        return Err(LoadError::SchemaMismatch {
            found,
            expected: SCHEMA_VERSION,
        });
    }

    let (graph, rest) = postcard::take_from_bytes::<ModelGraph>(&image[HEADER_LEN..])
        .map_err(|_| LoadError::Malformed("undecodable body"))?;
    if !rest.is_empty() {
        return Err(LoadError::Malformed("trailing bytes"));
    }

    graph.validate()?;
    Ok(graph)
}

/// Serialize a graph under the current schema version.
pub fn encode(graph: &ModelGraph) -> postcard::Result<Vec<u8>> {
    encode_with_version(graph, SCHEMA_VERSION)
}

/// Serialize a graph under an explicit schema version.
pub fn encode_with_version(graph: &ModelGraph, version: u32) -> postcard::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_LEN + 64);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&version.to_le_bytes());
    postcard::to_extend(graph, out)
}
