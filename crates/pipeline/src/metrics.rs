//! Router metrics
//!
//! Relaxed atomics throughout; values are eventually consistent and a
//! snapshot never blocks the routing path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use courier_metrics::{RouterStatsProvider, RouterStatsSnapshot};

/// Counters for the router hot path
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Messages presented to the router
    messages_received: AtomicU64,

    /// Messages accepted by at least one sink queue
    messages_routed: AtomicU64,

    /// Messages matching no routing rule
    no_route: AtomicU64,

    /// Route targets naming a sink absent from the registry
    unknown_sink: AtomicU64,

    /// Successful queue offers
    offers_ok: AtomicU64,

    /// Offers rejected (full, timeout, or closed queue)
    offers_rejected: AtomicU64,

    /// Offers that hit backpressure (full or timed out)
    backpressure_events: AtomicU64,
}

impl RouterMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_routed: AtomicU64::new(0),
            no_route: AtomicU64::new(0),
            unknown_sink: AtomicU64::new(0),
            offers_ok: AtomicU64::new(0),
            offers_rejected: AtomicU64::new(0),
            backpressure_events: AtomicU64::new(0),
        }
    }

    /// Record a message entering the router
    #[inline]
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message accepted by at least one queue
    #[inline]
    pub fn record_routed(&self) {
        self.messages_routed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message that matched no rule
    #[inline]
    pub fn record_no_route(&self) {
        self.no_route.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a route target missing from the registry
    #[inline]
    pub fn record_unknown_sink(&self) {
        self.unknown_sink.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful offer
    #[inline]
    pub fn record_offer_ok(&self) {
        self.offers_ok.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected offer
    #[inline]
    pub fn record_offer_rejected(&self) {
        self.offers_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a backpressure event
    #[inline]
    pub fn record_backpressure(&self) {
        self.backpressure_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Get no-route count
    #[inline]
    pub fn no_route(&self) -> u64 {
        self.no_route.load(Ordering::Relaxed)
    }

    /// Get unknown-sink count
    #[inline]
    pub fn unknown_sink(&self) -> u64 {
        self.unknown_sink.load(Ordering::Relaxed)
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_routed: self.messages_routed.load(Ordering::Relaxed),
            no_route: self.no_route.load(Ordering::Relaxed),
            unknown_sink: self.unknown_sink.load(Ordering::Relaxed),
            offers_ok: self.offers_ok.load(Ordering::Relaxed),
            offers_rejected: self.offers_rejected.load(Ordering::Relaxed),
            backpressure_events: self.backpressure_events.load(Ordering::Relaxed),
        }
    }
}

/// Handle exposing router stats to the reporter
///
/// Remains valid for the lifetime of the router it came from.
#[derive(Clone)]
pub struct RouterStatsHandle {
    metrics: Arc<RouterMetrics>,
}

impl RouterStatsHandle {
    pub(crate) fn new(metrics: Arc<RouterMetrics>) -> Self {
        Self { metrics }
    }
}

impl RouterStatsProvider for RouterStatsHandle {
    fn snapshot(&self) -> RouterStatsSnapshot {
        self.metrics.snapshot()
    }
}

/// Rate-limited backpressure logging
///
/// Aggregates rejected offers and logs a one-line summary per interval
/// instead of one line per message. Past the critical threshold the summary
/// escalates to error level.
pub struct BackpressureTracker {
    /// Rejections in the current interval
    interval_rejects: AtomicU64,

    /// Last log time, epoch milliseconds
    last_log_ms: AtomicU64,
}

/// Log interval in milliseconds
const LOG_INTERVAL_MS: u64 = 1000;

/// Rejections per interval that escalate the summary to error level
const CRITICAL_REJECT_THRESHOLD: u64 = 100;

impl BackpressureTracker {
    /// Create a new tracker
    pub fn new() -> Self {
        Self {
            interval_rejects: AtomicU64::new(0),
            last_log_ms: AtomicU64::new(Self::now_ms()),
        }
    }

    /// Record a rejected offer; logs at most once per interval
    ///
    /// Returns true if a summary line was emitted.
    pub fn record_reject(&self, sink: &str) -> bool {
        self.interval_rejects.fetch_add(1, Ordering::Relaxed);

        let now = Self::now_ms();
        let last = self.last_log_ms.load(Ordering::Relaxed);
        if now.saturating_sub(last) < LOG_INTERVAL_MS {
            return false;
        }

        // Claim the log slot; losers skip
        if self
            .last_log_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        let rejects = self.interval_rejects.swap(0, Ordering::Relaxed);
        if rejects == 0 {
            return false;
        }

        if rejects > CRITICAL_REJECT_THRESHOLD {
            tracing::error!(
                rejected = rejects,
                last_sink = %sink,
                "severe backpressure: sink queues cannot keep up"
            );
        } else {
            tracing::warn!(
                rejected = rejects,
                last_sink = %sink,
                "backpressure: offers rejected in the last second"
            );
        }
        true
    }

    /// Rejections recorded in the current interval (test hook)
    #[cfg(test)]
    pub fn current_rejects(&self) -> u64 {
        self.interval_rejects.load(Ordering::Relaxed)
    }

    #[inline]
    fn now_ms() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl Default for BackpressureTracker {
    fn default() -> Self {
        Self::new()
    }
}
