//! Telemetry feed: Realtime Database REST streaming.
//!
//! - [`sse`]: byte stream → server-sent events
//! - [`tree`]: server-sent events → stream messages → mirrored device value
//! - [`io_task`]: the connection thread feeding [`crate::events::FEED`]

pub mod io_task;
pub mod sse;
pub mod tree;

pub use io_task::spawn_feed_thread;
pub use sse::{SseDecoder, SseEvent};
pub use tree::{SnapshotTree, StreamMessage};
