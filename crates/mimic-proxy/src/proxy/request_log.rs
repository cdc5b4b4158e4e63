//! Bounded in-memory log of recent requests, read by the control API.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hyper::Method;
use parking_lot::RwLock;
use serde::Serialize;

pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// One completed request, mocked or forwarded.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Time-based id, strictly increasing even under concurrent inserts.
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub duration_ms: u64,
    /// Scenario name when the request was mocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

struct LogBuffer {
    entries: VecDeque<LogEntry>,
    last_id: i64,
}

/// Ring buffer holding the N most recent entries, oldest evicted first.
pub struct RequestLog {
    capacity: usize,
    buffer: RwLock<LogBuffer>,
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffer: RwLock::new(LogBuffer {
                entries: VecDeque::new(),
                last_id: 0,
            }),
        }
    }

    pub fn push(
        &self,
        method: &Method,
        url: &str,
        status: u16,
        duration: Duration,
        matched: Option<&str>,
    ) {
        let mut buffer = self.buffer.write();

        // Ids are wall-clock microseconds, bumped past the previous id when
        // two inserts land in the same tick.
        let id = Utc::now().timestamp_micros().max(buffer.last_id + 1);
        buffer.last_id = id;

        buffer.entries.push_back(LogEntry {
            id,
            timestamp: Utc::now(),
            method: method.to_string(),
            url: url.to_string(),
            status,
            duration_ms: duration.as_millis() as u64,
            matched: matched.map(|s| s.to_string()),
        });
        while buffer.entries.len() > self.capacity {
            buffer.entries.pop_front();
        }
    }

    /// Snapshot copy, most-recent-last.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.buffer.read().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.read().entries.is_empty()
    }
}
