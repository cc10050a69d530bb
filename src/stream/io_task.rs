//! Feed I/O thread: Realtime Database REST stream → [`FEED`](crate::events::FEED).
//!
//! Runs on a dedicated OS thread with a blocking HTTP client.  Each
//! connection streams `text/event-stream`; decoded changes are applied to a
//! [`SnapshotTree`] and the full device value is pushed to the control loop
//! whenever it changes.
//!
//! ```text
//!  ┌──────────────────────────── feed thread ───────────────────────────┐
//!  │  GET {db}{path}.json ──▶ SseDecoder ──▶ StreamMessage ──▶ Tree    │
//!  │        ▲                                                   │      │
//!  │        └──── backoff 2 s → 4 s → … → max ◀── EOF / error   │      │
//!  └────────────────────────────────────────────────────────────┼──────┘
//!                                                FeedEvent::Update ▼
//!                                                           control loop
//! ```
//!
//! A `cancel` from the server ends the subscription for good and is
//! forwarded as [`FeedEvent::Closed`].  `auth_revoked`, EOF and transport
//! errors reconnect.

use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future::block_on;
use log::{debug, info, trace, warn};
use reqwest::blocking::Client;

use crate::app::ports::FeedError;
use crate::config::FeedConfig;
use crate::events::FeedEvent;

use super::sse::{SseDecoder, SseEvent};
use super::tree::{SnapshotTree, StreamMessage};

const READ_BUF_SIZE: usize = 4096;
const INITIAL_BACKOFF_SECS: u32 = 2;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Stream URL for the device node, with the optional `auth=` credential.
pub fn stream_url(cfg: &FeedConfig) -> String {
    let base = cfg.database_url.trim_end_matches('/');
    let path = cfg.device_path.trim_end_matches('/');
    match &cfg.auth_token {
        Some(token) => format!("{base}{path}.json?auth={token}"),
        None => format!("{base}{path}.json"),
    }
}

/// Next reconnect delay: doubles, capped at `max`.
pub fn next_backoff(current: u32, max: u32) -> u32 {
    current.saturating_mul(2).min(max)
}

/// Why [`pump`] returned without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server closed the connection.
    Eof,
    /// Server sent `cancel`.
    Cancelled,
}

/// Decode a stream and forward changes to `feed` until the stream ends.
///
/// Split out of the connection loop so any `Read` can drive it.
pub fn pump<R, M, const N: usize>(
    mut body: R,
    decoder: &mut SseDecoder,
    tree: &mut SnapshotTree,
    feed: &Channel<M, FeedEvent, N>,
) -> Result<SessionEnd, FeedError>
where
    R: Read,
    M: RawMutex,
{
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let n = body
            .read(&mut buf)
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        if n == 0 {
            debug!("FEED | stream closed by server");
            return Ok(SessionEnd::Eof);
        }

        let mut outcome = Ok(None);
        decoder.feed(&buf[..n], |ev| {
            if !matches!(outcome, Ok(None)) {
                return;
            }
            outcome = handle_event(&ev, tree, feed);
        });
        match outcome {
            Ok(None) => {}
            Ok(Some(end)) => return Ok(end),
            Err(e) => return Err(e),
        }
    }
}

fn handle_event<M: RawMutex, const N: usize>(
    ev: &SseEvent,
    tree: &mut SnapshotTree,
    feed: &Channel<M, FeedEvent, N>,
) -> Result<Option<SessionEnd>, FeedError> {
    let msg = match StreamMessage::parse(ev) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("FEED | dropping event '{}': {}", ev.event, e);
            return Ok(None);
        }
    };
    match msg {
        StreamMessage::KeepAlive => trace!("FEED | keep-alive"),
        StreamMessage::Cancel => return Ok(Some(SessionEnd::Cancelled)),
        StreamMessage::AuthRevoked => return Err(FeedError::AuthRevoked),
        StreamMessage::Other(name) => debug!("FEED | ignoring event '{}'", name),
        change => {
            if tree.apply(change) {
                block_on(feed.send(FeedEvent::Update(tree.value().clone())));
            }
        }
    }
    Ok(None)
}

/// Spawn the feed thread.  It runs until the server cancels the listener,
/// then sends [`FeedEvent::Closed`] and exits.
pub fn spawn_feed_thread<M, const N: usize>(
    cfg: FeedConfig,
    feed: &'static Channel<M, FeedEvent, N>,
) -> std::io::Result<JoinHandle<()>>
where
    M: RawMutex + Sync + 'static,
{
    thread::Builder::new()
        .name("feed-io".into())
        .spawn(move || feed_thread(cfg, feed))
}

fn feed_thread<M: RawMutex, const N: usize>(cfg: FeedConfig, feed: &Channel<M, FeedEvent, N>) {
    let url = stream_url(&cfg);
    let client = match Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(None::<Duration>)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            warn!("FEED | cannot build HTTP client: {}", e);
            block_on(feed.send(FeedEvent::Closed));
            return;
        }
    };

    let mut decoder = SseDecoder::new();
    let mut tree = SnapshotTree::new();
    let mut backoff_secs = INITIAL_BACKOFF_SECS;
    let mut attempt: u32 = 0;

    info!("FEED | subscribing to {}{}", cfg.database_url, cfg.device_path);
    loop {
        attempt += 1;
        decoder.reset();
        match session(&client, &url, &mut decoder, &mut tree, feed, &mut backoff_secs) {
            Ok(SessionEnd::Cancelled) => {
                warn!("FEED | listener cancelled by server, closing feed");
                block_on(feed.send(FeedEvent::Closed));
                return;
            }
            Ok(SessionEnd::Eof) => {}
            Err(e) => warn!("FEED | session ended: {}", e),
        }
        info!("FEED | reconnect attempt {} (backoff {}s)", attempt, backoff_secs);
        thread::sleep(Duration::from_secs(u64::from(backoff_secs)));
        backoff_secs = next_backoff(backoff_secs, cfg.max_backoff_secs);
    }
}

fn session<M: RawMutex, const N: usize>(
    client: &Client,
    url: &str,
    decoder: &mut SseDecoder,
    tree: &mut SnapshotTree,
    feed: &Channel<M, FeedEvent, N>,
    backoff_secs: &mut u32,
) -> Result<SessionEnd, FeedError> {
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .map_err(|e| FeedError::Transport(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FeedError::Status(status.as_u16()));
    }

    info!("FEED | connected");
    *backoff_secs = INITIAL_BACKOFF_SECS;
    pump(resp, decoder, tree, feed)
}
