//! Fuzz target: stream message parsing + `SnapshotTree::apply`
//!
//! Interprets the input as a sequence of `event\0payload\0` pairs and
//! applies every parsable message to one tree.  The tree must never panic
//! and its value must always serialise.
//!
//! cargo fuzz run fuzz_snapshot_tree

#![no_main]

use cngprotect::stream::{SnapshotTree, SseEvent, StreamMessage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut tree = SnapshotTree::new();
    let mut parts = text.split('\0');
    while let (Some(event), Some(payload)) = (parts.next(), parts.next()) {
        let ev = SseEvent {
            event: event.to_owned(),
            data: payload.to_owned(),
        };
        if let Ok(msg) = StreamMessage::parse(&ev) {
            tree.apply(msg);
        }
    }
    assert!(serde_json::to_vec(tree.value()).is_ok());
});
