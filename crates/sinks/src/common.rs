//! Common types shared by all sinks
//!
//! Error taxonomy and the per-sink delivery counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use courier_metrics::{SinkStatsProvider, SinkStatsSnapshot};
use courier_queue::MessageQueue;
use thiserror::Error;

/// Errors produced by sink delivery
///
/// These never propagate past the owning engine: the engine retries per its
/// policy, then drops or requeues the batch and records the outcome.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Could not reach the destination
    #[error("connect to {target} failed: {source}")]
    Connect {
        /// Endpoint or path being opened
        target: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Delivery attempt failed
    #[error("write failed: {0}")]
    Write(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message could not be encoded for the wire
    #[error("serialization failed: {0}")]
    Serialize(#[from] courier_protocol::ProtocolError),

    /// Operation exceeded its deadline
    #[error("operation timed out")]
    Timeout,

    /// Sink already closed
    #[error("sink closed")]
    Closed,
}

impl SinkError {
    /// Create a Connect error
    pub fn connect(target: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connect {
            target: target.into(),
            source,
        }
    }

    /// Create a Write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }
}

/// Delivery counters for one sink
///
/// All fields use relaxed atomics; `snapshot()` is a set of plain loads and
/// never blocks the drain loop.
#[derive(Debug, Default)]
pub struct SinkStats {
    /// Batches delivered successfully
    batches_sent: AtomicU64,

    /// Messages delivered successfully
    messages_sent: AtomicU64,

    /// Payload bytes delivered successfully
    bytes_sent: AtomicU64,

    /// Individual write attempts that failed
    failed_attempts: AtomicU64,

    /// Attempts after the first, per batch
    retries: AtomicU64,

    /// Batches abandoned after exhausting retries
    batches_dropped: AtomicU64,

    /// Unix millis of the last successful batch
    last_batch_ms: AtomicU64,
}

impl SinkStats {
    /// Create new stats with all counters at zero
    pub const fn new() -> Self {
        Self {
            batches_sent: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            failed_attempts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            batches_dropped: AtomicU64::new(0),
            last_batch_ms: AtomicU64::new(0),
        }
    }

    /// Record a successfully delivered batch
    #[inline]
    pub fn record_sent(&self, messages: u64, bytes: u64) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.messages_sent.fetch_add(messages, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
        self.last_batch_ms.store(Self::now_ms(), Ordering::Relaxed);
    }

    /// Record a failed write attempt
    #[inline]
    pub fn record_failed_attempt(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retry (an attempt after the first)
    #[inline]
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch abandoned after retry exhaustion
    #[inline]
    pub fn record_dropped_batch(&self) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failed attempt count
    #[inline]
    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts.load(Ordering::Relaxed)
    }

    /// Get successfully delivered batch count
    #[inline]
    pub fn batches_sent(&self) -> u64 {
        self.batches_sent.load(Ordering::Relaxed)
    }

    /// Get abandoned batch count
    #[inline]
    pub fn batches_dropped(&self) -> u64 {
        self.batches_dropped.load(Ordering::Relaxed)
    }

    /// Unix millis of the last successful batch, zero if none yet
    #[inline]
    pub fn last_batch_ms(&self) -> u64 {
        self.last_batch_ms.load(Ordering::Relaxed)
    }

    /// Take a snapshot of the counters
    ///
    /// Queue depth is supplied by the caller; the stats struct itself does
    /// not hold the queue.
    pub fn snapshot(&self, queue_depth: usize) -> SinkStatsSnapshot {
        SinkStatsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            queue_depth: queue_depth as u64,
        }
    }

    fn now_ms() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Handle exposing one sink's stats to the reporter
///
/// Holds Arcs to the stats and queue, so it stays valid after the engine
/// task consumes the sink.
#[derive(Clone)]
pub struct SinkStatsHandle {
    name: String,
    sink_type: &'static str,
    stats: Arc<SinkStats>,
    queue: Arc<MessageQueue>,
}

impl SinkStatsHandle {
    /// Create a handle for the given sink
    pub fn new(
        name: impl Into<String>,
        sink_type: &'static str,
        stats: Arc<SinkStats>,
        queue: Arc<MessageQueue>,
    ) -> Self {
        Self {
            name: name.into(),
            sink_type,
            stats,
            queue,
        }
    }
}

impl SinkStatsProvider for SinkStatsHandle {
    fn sink_name(&self) -> &str {
        &self.name
    }

    fn sink_type(&self) -> &str {
        self.sink_type
    }

    fn snapshot(&self) -> SinkStatsSnapshot {
        self.stats.snapshot(self.queue.depth())
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
