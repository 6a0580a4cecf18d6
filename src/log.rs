//! The log stream: human-readable milestone messages.
//!
//! Every append is kept in an in-memory history, published as the latest
//! entry through a [`watch`] channel for live observers, and mirrored as a
//! `tracing` event.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::types::ExecutionId;

/// Who wrote a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "execution")]
pub enum LogSource {
    /// A task execution unit settling.
    Unit(ExecutionId),
    /// The single-task combinator.
    Single,
    /// The chain combinator.
    Chain,
    /// The parallel-join combinator.
    All,
    /// The race combinator.
    Race,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Unit(id) => write!(f, "unit {id}"),
            LogSource::Single => write!(f, "single"),
            LogSource::Chain => write!(f, "chain"),
            LogSource::All => write!(f, "all"),
            LogSource::Race => write!(f, "race"),
        }
    }
}

/// Rough classification used by presentation layers for coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Neutral progress message.
    Info,
    /// Something resolved.
    Resolved,
    /// Something was rejected.
    Rejected,
}

/// One appended message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Position in the stream, starting at 1.
    pub seq: u64,
    /// Wall-clock append time.
    pub at: DateTime<Utc>,
    /// The writer.
    pub source: LogSource,
    /// Classification.
    pub tone: Tone,
    /// The message text.
    pub message: String,
}

/// Append-only message sink.
///
/// # Examples
///
/// ```
/// use promise_sim::log::{LogSource, LogStream, Tone};
///
/// let log = LogStream::new();
/// let rx = log.subscribe();
/// log.push(LogSource::All, Tone::Info, "Starting all tasks in parallel...");
///
/// assert_eq!(log.latest_message().as_deref(), Some("Starting all tasks in parallel..."));
/// assert_eq!(rx.borrow().as_ref().map(|e| e.seq), Some(1));
/// ```
#[derive(Debug)]
pub struct LogStream {
    history: Mutex<Vec<LogEntry>>,
    latest: watch::Sender<Option<LogEntry>>,
}

impl LogStream {
    /// Creates an empty stream.
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            history: Mutex::new(Vec::new()),
            latest,
        }
    }

    /// Appends a message and publishes it as the latest entry.
    pub fn push(&self, source: LogSource, tone: Tone, message: impl Into<String>) -> LogEntry {
        // Sequence assignment, append and publish happen under one lock, so
        // history order always matches `seq` and latest always equals the tail.
        let entry = {
            let mut history = self.history.lock();
            let entry = LogEntry {
                seq: history.len() as u64 + 1,
                at: Utc::now(),
                source,
                tone,
                message: message.into(),
            };
            history.push(entry.clone());
            self.latest.send_replace(Some(entry.clone()));
            entry
        };

        match tone {
            Tone::Rejected => {
                tracing::warn!(seq = entry.seq, source = %source, "{}", entry.message);
            }
            _ => tracing::info!(seq = entry.seq, source = %source, "{}", entry.message),
        }
        entry
    }

    /// Entries appended after sequence number `seq`, oldest first.
    pub fn entries_after(&self, seq: u64) -> Vec<LogEntry> {
        let history = self.history.lock();
        let start = usize::try_from(seq).unwrap_or(usize::MAX).min(history.len());
        history[start..].to_vec()
    }

    /// The most recent entry, if any.
    pub fn latest(&self) -> Option<LogEntry> {
        self.latest.borrow().clone()
    }

    /// The most recent message text, if any.
    pub fn latest_message(&self) -> Option<String> {
        self.latest.borrow().as_ref().map(|e| e.message.clone())
    }

    /// A copy of every entry, oldest first.
    pub fn history(&self) -> Vec<LogEntry> {
        self.history.lock().clone()
    }

    /// Entries written by `source`, oldest first.
    pub fn entries_from(&self, source: LogSource) -> Vec<LogEntry> {
        self.history
            .lock()
            .iter()
            .filter(|e| e.source == source)
            .cloned()
            .collect()
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    /// Returns `true` if nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }

    /// A receiver that observes every subsequent latest-entry change.
    pub fn subscribe(&self) -> watch::Receiver<Option<LogEntry>> {
        self.latest.subscribe()
    }
}

impl Default for LogStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sequence_numbers_are_dense() {
        let log = LogStream::new();
        log.push(LogSource::Chain, Tone::Info, "Starting chained tasks...");
        log.push(LogSource::Chain, Tone::Resolved, "a");
        log.push(LogSource::Race, Tone::Rejected, "b");
        let seqs: Vec<u64> = log.history().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(log.latest_message().as_deref(), Some("b"));
    }

    #[test]
    fn filter_by_source() {
        let log = LogStream::new();
        let unit = ExecutionId::next();
        log.push(LogSource::Unit(unit), Tone::Resolved, "unit");
        log.push(LogSource::Race, Tone::Info, "race");
        let from_unit = log.entries_from(LogSource::Unit(unit));
        assert_eq!(from_unit.len(), 1);
        assert_eq!(from_unit[0].message, "unit");
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let log = LogStream::new();
        let mut rx = log.subscribe();
        assert!(rx.borrow().is_none());

        log.push(LogSource::Single, Tone::Info, "hello");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().message, "hello");
    }

    #[test]
    fn concurrent_pushes_keep_history_in_seq_order() {
        use std::sync::Arc;

        for _ in 0..50 {
            let log = Arc::new(LogStream::new());
            let writers: Vec<_> = (0..8)
                .map(|w| {
                    let log = log.clone();
                    std::thread::spawn(move || {
                        for i in 0..50 {
                            log.push(LogSource::All, Tone::Info, format!("{w}-{i}"));
                        }
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }

            let seqs: Vec<u64> = log.history().iter().map(|e| e.seq).collect();
            let expected: Vec<u64> = (1..=400).collect();
            assert_eq!(seqs, expected);
            assert_eq!(log.latest().map(|e| e.seq), Some(400));
        }
    }

    #[test]
    fn entries_after_returns_the_unseen_tail() {
        let log = LogStream::new();
        for message in ["a", "b", "c"] {
            log.push(LogSource::Chain, Tone::Info, message);
        }
        let messages = |seq| -> Vec<String> {
            log.entries_after(seq).into_iter().map(|e| e.message).collect()
        };
        assert_eq!(messages(0), vec!["a", "b", "c"]);
        assert_eq!(messages(2), vec!["c"]);
        assert!(messages(3).is_empty());
        assert!(messages(10).is_empty());
    }

    #[test]
    fn empty_stream() {
        let log = LogStream::default();
        assert!(log.is_empty());
        assert!(log.latest().is_none());
    }

    #[test]
    fn source_serializes_tagged() {
        let json = serde_json::to_value(LogSource::Unit(ExecutionId::from_raw(4))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "unit", "execution": 4}));
        let json = serde_json::to_value(LogSource::Race).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "race"}));
    }
}
