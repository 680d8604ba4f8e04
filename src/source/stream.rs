//! # Streaming Events
//!
//! The reconciler only understands whole snapshots. Push sources that deliver
//! per-record changes are folded here first:
//!
//! - [`SseParser`] splits a `text/event-stream` body into messages.
//! - [`StreamEvent`] decodes the backend's `put` / `patch` / `keep-alive` /
//!   `cancel` / `auth_revoked` messages.
//! - [`ChildEvent`] models per-record `added` / `changed` / `removed` events.
//! - [`SnapshotFolder`] applies either kind to a held [`Snapshot`].

use crate::model::{OrderId, Snapshot};
use crate::source::TransportError;
use serde::Deserialize;
use serde_json::{Map, Value};

// =============================================================================
// 1. SERVER-SENT EVENTS
// =============================================================================

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseMessage {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser.
///
/// Feed raw body chunks as they arrive; chunk boundaries may fall anywhere.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.extend_from_slice(chunk);
        let mut messages = Vec::new();

        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw[..end]);
            let line = line.trim_end_matches('\r');

            if line.is_empty() {
                if self.event.is_some() || !self.data.is_empty() {
                    messages.push(SseMessage {
                        event: self.event.take().unwrap_or_else(|| "message".to_string()),
                        data: std::mem::take(&mut self.data).join("\n"),
                    });
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }
        messages
    }
}

// =============================================================================
// 2. BACKEND EVENTS
// =============================================================================

/// A decoded change notification from the realtime backend.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Replace the value at `path` (relative to the collection).
    Put { path: String, data: Value },
    /// Merge the children of `data` into the value at `path`.
    Patch { path: String, data: Value },
    KeepAlive,
    Cancel(String),
    AuthRevoked,
}

#[derive(Deserialize)]
struct PathPayload {
    path: String,
    data: Value,
}

impl StreamEvent {
    /// Decodes one SSE message. Unknown event names yield `Ok(None)`.
    pub fn from_message(message: &SseMessage) -> Result<Option<Self>, TransportError> {
        let event = match message.event.as_str() {
            "put" | "patch" => {
                let PathPayload { path, data } = serde_json::from_str(&message.data)?;
                if message.event == "put" {
                    StreamEvent::Put { path, data }
                } else {
                    StreamEvent::Patch { path, data }
                }
            }
            "keep-alive" => StreamEvent::KeepAlive,
            "cancel" => StreamEvent::Cancel(message.data.clone()),
            "auth_revoked" => StreamEvent::AuthRevoked,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Per-record change, for sources that report children individually.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildEvent {
    Added { id: OrderId, record: Value },
    Changed { id: OrderId, record: Value },
    Removed { id: OrderId },
}

// =============================================================================
// 3. FOLDING
// =============================================================================

/// Holds the latest whole snapshot and applies incremental events to it.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFolder {
    snapshot: Snapshot,
}

impl SnapshotFolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn apply_child(&mut self, event: ChildEvent) {
        match event {
            ChildEvent::Added { id, record } | ChildEvent::Changed { id, record } => {
                self.snapshot.insert(id, record);
            }
            ChildEvent::Removed { id } => {
                self.snapshot.remove(&id);
            }
        }
    }

    /// Applies a backend event. Returns whether the snapshot may have changed.
    pub fn apply(&mut self, event: StreamEvent) -> Result<bool, TransportError> {
        match event {
            StreamEvent::Put { path, data } => {
                self.put(&segments(&path), data)?;
                Ok(true)
            }
            StreamEvent::Patch { path, data } => {
                let Value::Object(children) = data else {
                    return Err(TransportError::Decode(format!(
                        "patch at `{path}` is not an object"
                    )));
                };
                let base = segments(&path);
                for (key, value) in children {
                    let mut target = base.clone();
                    target.extend(key.split('/').filter(|s| !s.is_empty()).map(str::to_string));
                    self.put(&target, value)?;
                }
                Ok(true)
            }
            StreamEvent::KeepAlive => Ok(false),
            StreamEvent::Cancel(reason) => Err(TransportError::Cancelled(reason)),
            StreamEvent::AuthRevoked => Err(TransportError::AuthRevoked),
        }
    }

    fn put(&mut self, path: &[String], data: Value) -> Result<(), TransportError> {
        let Some((id, rest)) = path.split_first() else {
            self.snapshot = Snapshot::deserialize(data)?;
            return Ok(());
        };
        let id = OrderId::from(id.as_str());

        if rest.is_empty() {
            if data.is_null() {
                self.snapshot.remove(&id);
            } else {
                self.snapshot.insert(id, data);
            }
            return Ok(());
        }

        if self.snapshot.get(&id).is_none() {
            if data.is_null() {
                return Ok(());
            }
            self.snapshot.insert(id.clone(), Value::Object(Map::new()));
        }
        let emptied = match self.snapshot.get_mut(&id) {
            Some(record) => {
                set_path(record, rest, data);
                record.as_object().is_some_and(Map::is_empty)
            }
            None => false,
        };
        if emptied {
            self.snapshot.remove(&id);
        }
        Ok(())
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn set_path(target: &mut Value, path: &[String], data: Value) {
    let Some((key, rest)) = path.split_first() else {
        *target = data;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(fields) = target else {
        return;
    };
    if rest.is_empty() && data.is_null() {
        fields.remove(key);
        return;
    }
    let child = fields
        .entry(key.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    set_path(child, rest, data);
}
