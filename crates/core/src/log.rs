// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-scoped log records and sinks.
//!
//! Executors log through the [`LogSink`] carried by their session rather
//! than a process-wide logger. A plugin process funnels records produced
//! before any consumer exists into a [`StartupBuffer`], which replays them
//! when a streaming sink attaches.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Severity of a log record, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Trace => "trace",
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub time: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, Value>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            level,
            message: message.into(),
            source: None,
            attrs: BTreeMap::new(),
        }
    }

    /// Attach an attribute. Values that fail to serialize are stored as null.
    pub fn attr(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.attrs.insert(key.into(), serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.source = Some(SourceLocation { file: file.into(), line });
        self
    }

    /// Copy without the source location.
    pub fn without_source(mut self) -> Self {
        self.source = None;
        self
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: LogRecord);
}

/// Default sink: re-emits records as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: LogRecord) {
        let attrs = if record.attrs.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&record.attrs).unwrap_or_default()
        };
        let source = record.source.as_ref().map(|s| format!("{}:{}", s.file, s.line));
        let source = source.as_deref().unwrap_or("");
        match record.level {
            LogLevel::Trace => {
                tracing::trace!(source = %source, attrs = %attrs, "{}", record.message)
            }
            LogLevel::Debug => {
                tracing::debug!(source = %source, attrs = %attrs, "{}", record.message)
            }
            LogLevel::Info => {
                tracing::info!(source = %source, attrs = %attrs, "{}", record.message)
            }
            LogLevel::Warn => {
                tracing::warn!(source = %source, attrs = %attrs, "{}", record.message)
            }
            LogLevel::Error => {
                tracing::error!(source = %source, attrs = %attrs, "{}", record.message)
            }
        }
    }
}

/// Forwards records at or above `min_level` into a channel.
///
/// Send failures (receiver gone) are ignored.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LogRecord>,
    min_level: LogLevel,
    include_source: bool,
}

impl ChannelSink {
    pub fn new(
        min_level: LogLevel,
        include_source: bool,
    ) -> (Self, mpsc::UnboundedReceiver<LogRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, min_level, include_source }, rx)
    }
}

impl LogSink for ChannelSink {
    fn emit(&self, record: LogRecord) {
        if record.level < self.min_level {
            return;
        }
        let record = if self.include_source { record } else { record.without_source() };
        let _ = self.tx.send(record);
    }
}

/// Identifies one attachment to a [`StartupBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachId(u64);

struct BufferState {
    buffered: VecDeque<LogRecord>,
    dropped: usize,
    target: Option<(AttachId, Arc<dyn LogSink>)>,
    attached_once: bool,
    next_id: u64,
}

/// Bounded buffer for records emitted before a consumer attaches.
///
/// Until the first [`attach`](Self::attach), records queue up (oldest
/// dropped beyond `capacity`). Attaching flushes the queue into the new sink
/// and forwards everything after. Detaching routes records to the fallback
/// sink.
pub struct StartupBuffer {
    state: Mutex<BufferState>,
    capacity: usize,
    fallback: Arc<dyn LogSink>,
}

impl StartupBuffer {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(capacity: usize, fallback: Arc<dyn LogSink>) -> Self {
        Self {
            state: Mutex::new(BufferState {
                buffered: VecDeque::new(),
                dropped: 0,
                target: None,
                attached_once: false,
                next_id: 0,
            }),
            capacity,
            fallback,
        }
    }

    /// Replace the active sink, replaying buffered records into it first.
    pub fn attach(&self, sink: Arc<dyn LogSink>) -> AttachId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = AttachId(state.next_id);
        if state.dropped > 0 {
            let dropped = state.dropped;
            state.dropped = 0;
            sink.emit(
                LogRecord::new(LogLevel::Warn, "startup log buffer overflowed")
                    .attr("dropped", dropped),
            );
        }
        for record in state.buffered.drain(..) {
            sink.emit(record);
        }
        state.target = Some((id, sink));
        state.attached_once = true;
        id
    }

    /// Route records back to the fallback sink, if `id` is still the active
    /// attachment. Returns whether anything was detached.
    pub fn detach(&self, id: AttachId) -> bool {
        let mut state = self.state.lock();
        let active = matches!(&state.target, Some((current, _)) if *current == id);
        if active {
            state.target = None;
        }
        active
    }

    /// Drain records that never reached a consumer into the fallback sink.
    pub fn flush_to_fallback(&self) {
        let records: Vec<_> = self.state.lock().buffered.drain(..).collect();
        for record in records {
            self.fallback.emit(record);
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.state.lock().buffered.len()
    }
}

impl LogSink for StartupBuffer {
    fn emit(&self, record: LogRecord) {
        let mut state = self.state.lock();
        let target = state.target.as_ref().map(|(_, sink)| Arc::clone(sink));
        if let Some(sink) = target {
            drop(state);
            sink.emit(record);
            return;
        }
        if state.attached_once {
            drop(state);
            self.fallback.emit(record);
            return;
        }
        if state.buffered.len() >= self.capacity {
            state.buffered.pop_front();
            state.dropped += 1;
        }
        state.buffered.push_back(record);
    }
}

/// Convenience front-end over a session's sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn record(&self, record: LogRecord) {
        self.sink.emit(record);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.record(LogRecord::new(LogLevel::Debug, message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogRecord::new(LogLevel::Info, message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(LogRecord::new(LogLevel::Warn, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(LogRecord::new(LogLevel::Error, message));
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
