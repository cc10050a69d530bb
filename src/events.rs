//! Inbound feed events and the channel that carries them.
//!
//! The feed I/O thread (see [`crate::stream::io_task`]) produces; the
//! bridge control loop consumes, one event at a time.
//!
//! ```text
//! ┌──────────────┐  FeedEvent   ┌──────────────┐
//! │ Feed thread  │────────────▶│ Control loop │
//! │ (blocking)   │   FEED      │ (async)      │
//! └──────────────┘              └──────────────┘
//! ```
//!
//! The producer uses a blocking `send`, so a slow consumer applies
//! backpressure to the stream instead of losing danger edges.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::channel::Channel;
use serde_json::Value;

use crate::app::ports::SnapshotSource;

/// One event from the telemetry subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The value at the device path changed.  May be `null` or malformed.
    Update(Value),
    /// The subscription ended for good; the control loop should stop.
    Closed,
}

/// Channel depth for feed events.
pub const FEED_DEPTH: usize = 16;

/// Channel type shared by the feed thread and the control loop.
pub type FeedChannel = Channel<CriticalSectionRawMutex, FeedEvent, FEED_DEPTH>;

/// Process-wide feed channel: feed thread → control loop.
pub static FEED: FeedChannel = Channel::new();

impl<M: RawMutex, const N: usize> SnapshotSource for Channel<M, FeedEvent, N> {
    async fn next_event(&self) -> FeedEvent {
        self.receive().await
    }
}
