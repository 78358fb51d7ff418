//! In-memory event history for debugging and diagnostics.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::observer::{EventKind, Observer};

/// A recorded protocol event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: EventKind,
    pub detail: String,
    /// Seconds since history creation
    pub timestamp: f64,
}

#[derive(Debug)]
struct Inner {
    counts: HashMap<EventKind, usize>,
    last_failure: Option<String>,
    entries: Vec<HistoryEntry>,
}

/// An [`Observer`] that keeps the most recent events in memory.
///
/// ```
/// use std::sync::Arc;
/// use wiz_roomctl::{Client, ClientConfig, EventHistory};
///
/// let history = Arc::new(EventHistory::new());
/// let client = Client::new(ClientConfig::default()).with_observer(history.clone());
/// assert!(history.is_empty());
/// ```
#[derive(Debug)]
pub struct EventHistory {
    inner: Mutex<Inner>,
    start_time: Instant,
    max_entries: usize,
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                counts: EventKind::iter().map(|k| (k, 0)).collect(),
                last_failure: None,
                entries: Vec::new(),
            }),
            start_time: Instant::now(),
            max_entries,
        }
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        // Entries are plain data, so a poisoned lock is still usable.
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn record(&self, kind: EventKind, detail: &str) {
        let timestamp = self.start_time.elapsed().as_secs_f64();
        let max_entries = self.max_entries;
        self.with_inner(|inner| {
            *inner.counts.entry(kind).or_default() += 1;
            if matches!(kind, EventKind::DecodeFailed | EventKind::TransportFailed) {
                inner.last_failure = Some(detail.to_string());
            }

            inner.entries.push(HistoryEntry {
                kind,
                detail: detail.to_string(),
                timestamp,
            });
            if inner.entries.len() > max_entries {
                inner.entries.remove(0);
            }
        });
    }

    pub fn last_failure(&self) -> Option<String> {
        self.with_inner(|inner| inner.last_failure.clone())
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.with_inner(|inner| inner.entries.clone())
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.with_inner(|inner| inner.counts.get(&kind).copied().unwrap_or(0))
    }

    pub fn len(&self) -> usize {
        self.with_inner(|inner| inner.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.with_inner(|inner| {
            inner.counts.values_mut().for_each(|c| *c = 0);
            inner.entries.clear();
            inner.last_failure = None;
        });
    }

    pub fn summary(&self) -> HistorySummary {
        self.with_inner(|inner| {
            let count = |k: EventKind| inner.counts.get(&k).copied().unwrap_or(0);
            HistorySummary {
                sent_count: count(EventKind::RequestSent),
                received_count: count(EventKind::ReplyReceived),
                decode_failures: count(EventKind::DecodeFailed),
                timeouts: count(EventKind::TimedOut),
                transport_failures: count(EventKind::TransportFailed),
                total_entries: inner.entries.len(),
                last_failure: inner.last_failure.clone(),
            }
        })
    }
}

impl Observer for EventHistory {
    fn on_event(&self, kind: EventKind, detail: &str) {
        self.record(kind, detail);
    }
}

/// Summary of event history for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub sent_count: usize,
    pub received_count: usize,
    pub decode_failures: usize,
    pub timeouts: usize,
    pub transport_failures: usize,
    pub total_entries: usize,
    pub last_failure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_event() {
        let history = EventHistory::new();
        history.on_event(EventKind::RequestSent, "getPilot to 10.0.0.2:38899");

        assert_eq!(history.len(), 1);
        assert_eq!(history.count(EventKind::RequestSent), 1);
        assert_eq!(history.entries()[0].kind, EventKind::RequestSent);
    }

    #[test]
    fn test_last_failure() {
        let history = EventHistory::new();
        history.record(EventKind::TimedOut, "no reply from 10.0.0.2");
        assert_eq!(history.last_failure(), None);

        history.record(EventKind::DecodeFailed, "invalid json");
        assert_eq!(history.last_failure().as_deref(), Some("invalid json"));
    }

    #[test]
    fn test_max_entries() {
        let history = EventHistory::with_max_entries(2);
        for i in 0..5 {
            history.record(EventKind::ReplyReceived, &format!("reply {i}"));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.count(EventKind::ReplyReceived), 5);
        assert_eq!(history.entries()[1].detail, "reply 4");
    }

    #[test]
    fn test_clear_and_summary() {
        let history = EventHistory::new();
        history.record(EventKind::RequestSent, "a");
        history.record(EventKind::TransportFailed, "b");
        let summary = history.summary();
        assert_eq!(summary.sent_count, 1);
        assert_eq!(summary.transport_failures, 1);
        assert_eq!(summary.total_entries, 2);

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.summary().sent_count, 0);
    }
}
