//! Fuzz target: `TransferBuffer::ingest`
//!
//! Splits the input into fragments at arbitrary points and drives them
//! through a small buffer.  The buffer must never grow to its capacity and
//! an overflowing fragment must leave the stored bytes untouched.
//!
//! cargo fuzz run fuzz_transfer_buffer

#![no_main]

use aiplant::model::{MARKER, MAX_FRAGMENT_LEN, TransferBuffer, TransferResult};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut buf = TransferBuffer::<1024>::new();
    let mut rest = data;

    while let Some((&len, tail)) = rest.split_first() {
        let take = (len as usize).min(tail.len()).min(MAX_FRAGMENT_LEN);
        let (fragment, tail) = tail.split_at(take);
        rest = tail;

        // A zero-length selector sends the marker instead.
        let fragment = if take == 0 { MARKER } else { fragment };
        let before = buf.len();
        match buf.ingest(fragment) {
            TransferResult::Continuing => assert!(buf.len() < buf.capacity()),
            TransferResult::Completed => assert_eq!(buf.fragments(), 0),
            TransferResult::Overflow => assert_eq!(buf.len(), before),
        }
    }
});
