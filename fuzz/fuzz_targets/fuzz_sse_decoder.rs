//! Fuzz target: `SseDecoder::feed`
//!
//! Drives arbitrary byte sequences into the streaming SSE decoder, split at
//! a fuzzer-chosen point, and asserts that it never panics, never yields an
//! event larger than its cap, and decodes the same events regardless of
//! where the read boundary falls.
//!
//! cargo fuzz run fuzz_sse_decoder

#![no_main]

use cngprotect::stream::sse::{MAX_EVENT_DATA, SseDecoder, SseEvent};
use libfuzzer_sys::fuzz_target;

fn decode(chunks: &[&[u8]]) -> Vec<SseEvent> {
    let mut decoder = SseDecoder::new();
    let mut out = Vec::new();
    for chunk in chunks {
        decoder.feed(chunk, |e| out.push(e));
    }
    out
}

fuzz_target!(|data: &[u8]| {
    let Some((&cut, body)) = data.split_first() else {
        return;
    };
    let at = usize::from(cut) * body.len() / 255;
    let (a, b) = body.split_at(at.min(body.len()));

    let whole = decode(&[body]);
    for ev in &whole {
        assert!(ev.data.len() <= MAX_EVENT_DATA, "event data exceeds cap");
    }
    assert_eq!(whole, decode(&[a, b]), "split point changed the output");
});
