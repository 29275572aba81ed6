//! Fixed-capacity reassembly of a model pushed over BLE.
//!
//! The peer writes the serialized model to the model characteristic in
//! fragments of at most [`MAX_FRAGMENT_LEN`] bytes and finishes with a
//! write whose payload begins with [`MARKER`].
//!
//! ```text
//! Write 1:   model[0..512]
//! Write 2:   model[512..1024]
//! ...
//! Write N+1: "END__OF__MODEL__SEQUENCE"
//! ```
//!
//! Only the first `MARKER.len()` bytes of a write are compared, so a
//! fragment that merely starts with the marker also terminates the
//! transfer.  Peers must not produce model bytes with that prefix at a
//! fragment boundary.

/// End-of-transfer marker written after the last model fragment.
pub const MARKER: &[u8] = b"END__OF__MODEL__SEQUENCE";

/// Largest single write the link layer delivers.
pub const MAX_FRAGMENT_LEN: usize = 512;

/// Reassembly capacity; must exceed the largest model the device accepts.
pub const MODEL_BUFFER_CAPACITY: usize = 16 * 1024;

/// Outcome of feeding one fragment to a [`TransferBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferResult {
    /// Fragment appended; more are expected.
    Continuing,
    /// Marker received; the buffer holds one complete image.
    Completed,
    /// Fragment rejected: it does not fit in the remaining capacity.
    Overflow,
}

/// Byte accumulator that turns a stream of fragments into one image.
pub struct TransferBuffer<const C: usize = MODEL_BUFFER_CAPACITY> {
    buf: [u8; C],
    size: usize,
    fragments: u32,
}

impl<const C: usize> TransferBuffer<C> {
    pub fn new() -> Self {
        Self {
            buf: [0u8; C],
            size: 0,
            fragments: 0,
        }
    }

    /// Feed one fragment.
    ///
    /// The first fragment after a completed transfer (or after boot)
    /// discards whatever a previous, abandoned transfer left behind.
    pub fn ingest(&mut self, fragment: &[u8]) -> TransferResult {
        if self.fragments == 0 {
            self.size = 0;
        }

        if is_marker(fragment) {
            self.fragments = 0;
            return TransferResult::Completed;
        }

        let end = self.size + fragment.len();
        if end < C {
            self.buf[self.size..end].copy_from_slice(fragment);
            self.size = end;
            self.fragments += 1;
            TransferResult::Continuing
        } else {
            TransferResult::Overflow
        }
    }

    /// Bytes received so far in the current (or just-completed) transfer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.size]
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Fragments appended since the current transfer started.
    pub fn fragments(&self) -> u32 {
        self.fragments
    }

    pub const fn capacity(&self) -> usize {
        C
    }

    /// Drop any partial transfer.
    pub fn reset(&mut self) {
        self.size = 0;
        self.fragments = 0;
    }
}

impl<const C: usize> Default for TransferBuffer<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_marker(fragment: &[u8]) -> bool {
    fragment.len() >= MARKER.len() && &fragment[..MARKER.len()] == MARKER
}

// ── Tests ────────────────────────────────────────────────────
