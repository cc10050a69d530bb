//! Feed pipeline tests: raw SSE bytes → decoder → tree → channel.

use std::io::{Cursor, Read};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use serde_json::json;

use cngprotect::app::ports::FeedError;
use cngprotect::events::FeedEvent;
use cngprotect::stream::io_task::{SessionEnd, pump};
use cngprotect::stream::{SnapshotTree, SseDecoder};

type Feed = Channel<CriticalSectionRawMutex, FeedEvent, 16>;

/// Reader that hands out at most `step` bytes per call.
struct Trickle {
    inner: Cursor<Vec<u8>>,
    step: usize,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.step);
        self.inner.read(&mut buf[..n])
    }
}

fn drain(feed: &Feed) -> Vec<FeedEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = feed.try_receive() {
        out.push(ev);
    }
    out
}

const SESSION: &str = "event: put\n\
data: {\"path\":\"/\",\"data\":{\"is_danger\":false,\"gas_level\":120}}\n\
\n\
event: keep-alive\n\
data: null\n\
\n\
event: patch\n\
data: {\"path\":\"/\",\"data\":{\"is_danger\":true,\"gas_level\":640}}\n\
\n\
event: put\n\
data: {\"path\":\"/gas_level\",\"data\":640}\n\
\n";

// ── QA-FEED-1: value delivery ─────────────────────────────────

#[test]
fn changes_are_forwarded_as_full_values() {
    let feed = Feed::new();
    let mut dec = SseDecoder::new();
    let mut tree = SnapshotTree::new();

    let end = pump(Cursor::new(SESSION.as_bytes().to_vec()), &mut dec, &mut tree, &feed);
    assert_eq!(end, Ok(SessionEnd::Eof));

    // The final put repeats the current gas level and is not redelivered.
    assert_eq!(
        drain(&feed),
        vec![
            FeedEvent::Update(json!({ "is_danger": false, "gas_level": 120 })),
            FeedEvent::Update(json!({ "is_danger": true, "gas_level": 640 })),
        ]
    );
}

#[test]
fn one_byte_reads_give_the_same_result() {
    let feed = Feed::new();
    let mut dec = SseDecoder::new();
    let mut tree = SnapshotTree::new();
    let body = Trickle {
        inner: Cursor::new(SESSION.as_bytes().to_vec()),
        step: 1,
    };

    pump(body, &mut dec, &mut tree, &feed).unwrap();
    assert_eq!(drain(&feed).len(), 2);
}

#[test]
fn tree_survives_a_reconnect() {
    let feed = Feed::new();
    let mut dec = SseDecoder::new();
    let mut tree = SnapshotTree::new();
    pump(Cursor::new(SESSION.as_bytes().to_vec()), &mut dec, &mut tree, &feed).unwrap();
    drain(&feed);

    // A reconnect re-sends the full value; unchanged means no update.
    dec.reset();
    let replay = "event: put\n\
data: {\"path\":\"/\",\"data\":{\"is_danger\":true,\"gas_level\":640}}\n\n";
    pump(Cursor::new(replay.as_bytes().to_vec()), &mut dec, &mut tree, &feed).unwrap();
    assert!(drain(&feed).is_empty());
}

// ── QA-FEED-2: control events ─────────────────────────────────

#[test]
fn cancel_ends_the_session() {
    let feed = Feed::new();
    let body = "event: cancel\ndata: \"permission denied\"\n\n\
event: put\ndata: {\"path\":\"/\",\"data\":{\"is_danger\":false,\"gas_level\":1}}\n\n";
    let end = pump(
        Cursor::new(body.as_bytes().to_vec()),
        &mut SseDecoder::new(),
        &mut SnapshotTree::new(),
        &feed,
    );
    assert_eq!(end, Ok(SessionEnd::Cancelled));
    assert!(drain(&feed).is_empty());
}

#[test]
fn auth_revoked_asks_for_reconnect() {
    let feed = Feed::new();
    let body = "event: auth_revoked\ndata: \"token expired\"\n\n";
    let end = pump(
        Cursor::new(body.as_bytes().to_vec()),
        &mut SseDecoder::new(),
        &mut SnapshotTree::new(),
        &feed,
    );
    assert_eq!(end, Err(FeedError::AuthRevoked));
}

#[test]
fn bad_payload_is_skipped_not_fatal() {
    let feed = Feed::new();
    let body = "event: put\ndata: {broken\n\n\
event: put\ndata: {\"path\":\"/\",\"data\":{\"is_danger\":false,\"gas_level\":3}}\n\n";
    let end = pump(
        Cursor::new(body.as_bytes().to_vec()),
        &mut SseDecoder::new(),
        &mut SnapshotTree::new(),
        &feed,
    );
    assert_eq!(end, Ok(SessionEnd::Eof));
    assert_eq!(drain(&feed).len(), 1);
}

#[test]
fn deleting_the_node_delivers_null() {
    let feed = Feed::new();
    let body = "event: put\ndata: {\"path\":\"/\",\"data\":{\"is_danger\":false,\"gas_level\":3}}\n\n\
event: put\ndata: {\"path\":\"/\",\"data\":null}\n\n";
    pump(
        Cursor::new(body.as_bytes().to_vec()),
        &mut SseDecoder::new(),
        &mut SnapshotTree::new(),
        &feed,
    )
    .unwrap();
    let events = drain(&feed);
    assert_eq!(events.last(), Some(&FeedEvent::Update(serde_json::Value::Null)));
}
