//! Owner of the single finalized model image.

/// One complete serialized model, allocated exactly to size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelImage {
    bytes: Box<[u8]>,
}

impl ModelImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Holds at most one [`ModelImage`]; finalizing a new transfer drops the old one.
#[derive(Debug, Default)]
pub struct ModelStore {
    image: Option<ModelImage>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a completed transfer into a freshly allocated image.
    pub fn finalize(&mut self, received: &[u8]) -> &ModelImage {
        let image = ModelImage {
            bytes: Box::from(received),
        };
        self.image.insert(image)
    }

    pub fn image(&self) -> Option<&ModelImage> {
        self.image.as_ref()
    }
}
