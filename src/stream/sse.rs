//! Streaming `text/event-stream` decoder.
//!
//! Wire format (one event):
//! ```text
//! event: put\n
//! data: {"path":"/","data":{...}}\n
//! \n
//! ```
//!
//! The decoder accumulates incoming bytes and yields complete events.  It
//! handles partial reads: a single `read` may end mid-line, mid-event, or
//! carry several events at once.  Lines may end in `\n`, `\r\n` or `\r`.

use heapless::Vec;

/// Longest line the decoder will buffer (protects against memory
/// exhaustion).  Longer lines are dropped up to their terminator.
pub const MAX_LINE: usize = 16 * 1024;

/// Cap on one event's accumulated `data`.
pub const MAX_EVENT_DATA: usize = 64 * 1024;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field, `"message"` when absent.
    pub event: String,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Incremental SSE decoder.
pub struct SseDecoder {
    line: Vec<u8, MAX_LINE>,
    /// Current line overflowed; skip to its terminator.
    discarding: bool,
    /// Previous byte was `\r`; a following `\n` belongs to the same break.
    after_cr: bool,
    event: Option<String>,
    data: String,
    /// Current event overflowed; drop it at dispatch.
    oversized: bool,
    dropped: u32,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            line: Vec::new(),
            discarding: false,
            after_cr: false,
            event: None,
            data: String::new(),
            oversized: false,
            dropped: 0,
        }
    }

    /// Feed bytes into the decoder, calling `on_event` for every event
    /// completed by them.
    pub fn feed(&mut self, data: &[u8], mut on_event: impl FnMut(SseEvent)) {
        for &b in data {
            match b {
                b'\n' if self.after_cr => {
                    self.after_cr = false;
                }
                b'\n' | b'\r' => {
                    self.after_cr = b == b'\r';
                    self.end_line(&mut on_event);
                }
                _ => {
                    self.after_cr = false;
                    if !self.discarding && self.line.push(b).is_err() {
                        self.discarding = true;
                    }
                }
            }
        }
    }

    /// Lines or events dropped for exceeding the size caps.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Forget any partial line or event (e.g. after a reconnect).
    pub fn reset(&mut self) {
        let dropped = self.dropped;
        *self = Self::new();
        self.dropped = dropped;
    }

    fn end_line(&mut self, on_event: &mut impl FnMut(SseEvent)) {
        if self.discarding {
            self.discarding = false;
            self.line.clear();
            self.dropped = self.dropped.saturating_add(1);
            return;
        }

        if self.line.is_empty() {
            self.dispatch(on_event);
            return;
        }

        // Non-UTF-8 lines cannot carry a JSON payload; ignore them.
        if let Ok(text) = core::str::from_utf8(&self.line) {
            let (field, value) = match text.split_once(':') {
                Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
                None => (text, ""),
            };
            match field {
                // Comment line.
                "" => {}
                "event" => self.event = Some(value.to_owned()),
                "data" => {
                    if self.data.len() + value.len() + 1 > MAX_EVENT_DATA {
                        self.oversized = true;
                    } else {
                        if !self.data.is_empty() {
                            self.data.push('\n');
                        }
                        self.data.push_str(value);
                    }
                }
                // `id:` and `retry:` carry nothing we use.
                _ => {}
            }
        }
        self.line.clear();
    }

    fn dispatch(&mut self, on_event: &mut impl FnMut(SseEvent)) {
        let event = self.event.take();
        let data = core::mem::take(&mut self.data);
        if core::mem::take(&mut self.oversized) {
            self.dropped = self.dropped.saturating_add(1);
            return;
        }
        if event.is_none() && data.is_empty() {
            return;
        }
        on_event(SseEvent {
            event: event.unwrap_or_else(|| "message".into()),
            data,
        });
    }
}
