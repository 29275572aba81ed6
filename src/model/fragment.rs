//! Sender side of a model transfer.
//!
//! Splits an encoded image into link-sized writes and terminates the
//! sequence with [`MARKER`], the same framing the companion app uses when
//! it pushes a freshly trained model.  Host tooling and tests feed the
//! result straight into a [`TransferBuffer`](super::transfer::TransferBuffer).

use super::transfer::{MARKER, MAX_FRAGMENT_LEN};

/// Split `image` into fragments of at most `mtu` bytes, followed by the
/// marker.
///
/// `mtu` is clamped to `1..=MAX_FRAGMENT_LEN`.  The marker is always
/// appended, even for images that fit in a single write.
pub fn fragment_model(image: &[u8], mtu: usize) -> Vec<Vec<u8>> {
    let mtu = mtu.clamp(1, MAX_FRAGMENT_LEN);
    let mut out: Vec<Vec<u8>> = image.chunks(mtu).map(<[u8]>::to_vec).collect();
    out.push(MARKER.to_vec());
    out
}
