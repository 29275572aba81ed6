//! Model images shared by the integration tests.

use aiplant::model::format::{Activation, Layer, ModelGraph, encode, encode_with_version};

/// One dense layer whose decision depends only on moisture:
/// water below 40 %, stay above it.
pub fn threshold_graph() -> ModelGraph {
    ModelGraph {
        inputs: 2,
        outputs: 2,
        layers: vec![Layer::Dense {
            inputs: 2,
            outputs: 2,
            weights: vec![0.0, 0.1, 0.0, -0.1],
            bias: vec![-4.0, 4.0],
            activation: Activation::Softmax,
        }],
    }
}

/// The same decision with the classes swapped: always prefers watering
/// when the soil is wet.
#[allow(dead_code)]
pub fn inverted_graph() -> ModelGraph {
    ModelGraph {
        inputs: 2,
        outputs: 2,
        layers: vec![Layer::Dense {
            inputs: 2,
            outputs: 2,
            weights: vec![0.0, -0.1, 0.0, 0.1],
            bias: vec![4.0, -4.0],
            activation: Activation::Softmax,
        }],
    }
}

pub fn threshold_image() -> Vec<u8> {
    encode(&threshold_graph()).unwrap()
}

#[allow(dead_code)]
pub fn stale_schema_image() -> Vec<u8> {
    encode_with_version(&inverted_graph(), 2).unwrap()
}
