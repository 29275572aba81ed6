//! Fuzz target: `InferenceEngine::load_bytes`
//!
//! Feeds arbitrary bytes to the model loader.  Loading must either succeed
//! or fail with a typed error, and a model that loads must run on ordinary
//! readings without panicking.
//!
//! cargo fuzz run fuzz_model_image

#![no_main]

use aiplant::model::InferenceEngine;
use aiplant::model::format::{HEADER_LEN, MAGIC, SCHEMA_VERSION};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut engine = InferenceEngine::<1024>::new();
    let _ = engine.load_bytes(data);

    // Most random inputs die at the header; also try the body behind a
    // valid header so the graph decoder sees the bytes.
    let mut image = Vec::with_capacity(HEADER_LEN + data.len());
    image.extend_from_slice(&MAGIC);
    image.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
    image.extend_from_slice(data);

    if engine.load_bytes(&image).is_ok() {
        assert!(engine.is_ready());
        assert!(engine.arena_used() <= engine.capacity());
        let _ = engine.run(22.0, 40.0);
        let _ = engine.run(f32::NAN, 40.0);
    }
});
