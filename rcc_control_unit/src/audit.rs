//! Operator log tail.
//!
//! Bounded ring of the most recent ride events, served by the gateway's log
//! endpoint. Every entry is mirrored to `tracing` at the matching level.

use std::sync::Arc;

use heapless::Deque;
use rcc_common::config::LogLevel;
use rcc_common::consts::LOG_TAIL_CAPACITY;
use rcc_common::ride::snapshot::LogEntry;
use tracing::{debug, error, info, trace, warn};

/// Append-only event ring; the oldest entry is dropped when full.
#[derive(Debug)]
pub struct AuditLog {
    entries: Deque<LogEntry, LOG_TAIL_CAPACITY>,
    dirty: bool,
}

impl AuditLog {
    /// Empty log.
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
            dirty: false,
        }
    }

    /// Append an entry and mirror it to the tracing subscriber.
    pub fn push(&mut self, cycle: u64, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => trace!(cycle, "{message}"),
            LogLevel::Debug => debug!(cycle, "{message}"),
            LogLevel::Info => info!(cycle, "{message}"),
            LogLevel::Warn => warn!(cycle, "{message}"),
            LogLevel::Error => error!(cycle, "{message}"),
        }
        let entry = LogEntry::new(cycle, level, message);
        if self.entries.is_full() {
            self.entries.pop_front();
        }
        // Cannot fail: room was made above.
        let _ = self.entries.push_back(entry);
        self.dirty = true;
    }

    /// Informational entry.
    #[inline]
    pub fn info(&mut self, cycle: u64, message: &str) {
        self.push(cycle, LogLevel::Info, message);
    }

    /// Warning entry.
    #[inline]
    pub fn warn(&mut self, cycle: u64, message: &str) {
        self.push(cycle, LogLevel::Warn, message);
    }

    /// Error entry.
    #[inline]
    pub fn error(&mut self, cycle: u64, message: &str) {
        self.push(cycle, LogLevel::Error, message);
    }

    /// Number of retained entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been logged.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the whole tail if anything changed since the last call.
    pub fn take_snapshot(&mut self) -> Option<Arc<[LogEntry]>> {
        if !std::mem::take(&mut self.dirty) {
            return None;
        }
        Some(self.entries.iter().cloned().collect())
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
