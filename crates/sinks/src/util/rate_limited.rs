//! Rate-limited fault logging
//!
//! A persistently failing downstream produces the same error for every
//! batch. Logging each occurrence would flood the log without adding
//! information, so faults are reported at most once per interval with a
//! count of what was suppressed in between.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default minimum interval between log lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logger that emits at most one line per interval
///
/// Thread-safe: counters are atomics, the last-log time sits behind a short
/// mutex.
pub struct RateLimitedLogger {
    /// Minimum interval between emitted lines
    min_interval: Duration,

    /// When the last line was emitted
    last_log: Mutex<Option<Instant>>,

    /// Faults recorded since the last emitted line
    suppressed: AtomicU64,

    /// Faults recorded over the logger's lifetime
    total: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a logger with the given interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log: Mutex::new(None),
            suppressed: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record a fault, logging it if the interval has passed
    ///
    /// Returns true if a line was emitted.
    pub fn error(&self, context: &str, error: &dyn std::fmt::Display) -> bool {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        let should_log = {
            let mut last = self.last_log.lock();
            let now = Instant::now();
            match *last {
                Some(at) if now.duration_since(at) < self.min_interval => false,
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };

        if !should_log {
            return false;
        }

        let since_last = self.suppressed.swap(0, Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);

        if since_last > 1 {
            tracing::error!(
                context = %context,
                error = %error,
                suppressed = since_last - 1,
                total,
                "repeated fault (rate-limited)"
            );
        } else {
            tracing::error!(context = %context, error = %error, total, "fault");
        }
        true
    }

    /// Faults recorded since the last emitted line
    pub fn pending(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    /// Faults recorded over the logger's lifetime
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
