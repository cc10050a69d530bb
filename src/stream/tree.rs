//! Realtime Database stream protocol and the local mirror it maintains.
//!
//! The REST stream describes changes relative to the subscribed location:
//!
//! | SSE event      | Payload                          | Effect                     |
//! |----------------|----------------------------------|----------------------------|
//! | `put`          | `{"path": p, "data": v}`         | replace value at `p`       |
//! | `patch`        | `{"path": p, "data": {k: v,…}}`  | replace each child `p/k`   |
//! | `keep-alive`   | `null`                           | none                       |
//! | `cancel`       | reason                           | listener ended for good    |
//! | `auth_revoked` | reason                           | reconnect with fresh auth  |
//!
//! Writing `null` anywhere deletes that node; objects left empty by a
//! delete vanish too.  [`SnapshotTree`] applies the changes and reports
//! when the whole value needs to be re-delivered.

use serde_json::{Map, Value};

use crate::app::ports::FeedError;

use super::sse::SseEvent;

/// One decoded stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Put { path: String, data: Value },
    Patch { path: String, data: Map<String, Value> },
    KeepAlive,
    Cancel,
    AuthRevoked,
    /// An event type this client does not know.  Ignored.
    Other(String),
}

impl StreamMessage {
    /// Interpret one SSE event.
    pub fn parse(ev: &SseEvent) -> Result<Self, FeedError> {
        match ev.event.as_str() {
            "put" => {
                let (path, data) = split_payload(&ev.data)?;
                Ok(Self::Put { path, data })
            }
            "patch" => {
                let (path, data) = split_payload(&ev.data)?;
                match data {
                    Value::Object(children) => Ok(Self::Patch { path, data: children }),
                    _ => Err(FeedError::BadPayload("patch data is not an object")),
                }
            }
            "keep-alive" => Ok(Self::KeepAlive),
            "cancel" => Ok(Self::Cancel),
            "auth_revoked" => Ok(Self::AuthRevoked),
            other => Ok(Self::Other(other.to_owned())),
        }
    }
}

fn split_payload(raw: &str) -> Result<(String, Value), FeedError> {
    let mut payload: Value =
        serde_json::from_str(raw).map_err(|_| FeedError::BadPayload("payload is not JSON"))?;
    let path = payload
        .get("path")
        .and_then(Value::as_str)
        .ok_or(FeedError::BadPayload("payload has no path"))?
        .to_owned();
    let data = payload
        .get_mut("data")
        .map(Value::take)
        .ok_or(FeedError::BadPayload("payload has no data"))?;
    Ok((path, data))
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Local copy of the value at the subscribed location.
#[derive(Debug, Default)]
pub struct SnapshotTree {
    root: Value,
    delivered: bool,
}

impl SnapshotTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value at the subscribed location (`null` when absent).
    pub fn value(&self) -> &Value {
        &self.root
    }

    /// Apply a `put` or `patch`.  Returns `true` when the value should be
    /// delivered: on the first change ever applied, and afterwards only when
    /// the value actually differs.  Other messages return `false`.
    pub fn apply(&mut self, msg: StreamMessage) -> bool {
        let before = self.root.clone();
        match msg {
            StreamMessage::Put { path, data } => self.put(&path, data),
            StreamMessage::Patch { path, data } => {
                for (key, value) in data {
                    let child = format!("{}/{}", path.trim_end_matches('/'), key);
                    self.put(&child, value);
                }
            }
            _ => return false,
        }
        let notify = !self.delivered || self.root != before;
        self.delivered = true;
        notify
    }

    fn put(&mut self, path: &str, data: Value) {
        let parts: Vec<&str> = segments(path).collect();
        if data.is_null() {
            remove(&mut self.root, &parts);
        } else {
            insert(&mut self.root, &parts, data);
        }
    }
}

fn insert(node: &mut Value, parts: &[&str], data: Value) {
    let Some((head, rest)) = parts.split_first() else {
        *node = data;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        insert(child, rest, data);
    }
}

/// Delete the node at `parts`.  Returns `true` when `node` itself is left
/// empty and should be pruned by its parent.
fn remove(node: &mut Value, parts: &[&str]) -> bool {
    let Some((head, rest)) = parts.split_first() else {
        *node = Value::Null;
        return true;
    };
    let Value::Object(map) = node else {
        return false;
    };
    let prune = match map.get_mut(*head) {
        Some(child) => remove(child, rest),
        None => false,
    };
    if prune {
        map.remove(*head);
    }
    if map.is_empty() {
        *node = Value::Null;
        return true;
    }
    false
}
