//! Stats provider traits
//!
//! The router and sinks implement these so the reporter can collect their
//! counters without knowing the concrete types. All providers are
//! `Send + Sync`; implementations back `snapshot()` with relaxed atomic
//! loads.

/// Point-in-time snapshot of one sink's delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SinkStatsSnapshot {
    /// Batches delivered successfully
    pub batches_sent: u64,
    /// Messages delivered successfully
    pub messages_sent: u64,
    /// Payload bytes delivered successfully
    pub bytes_sent: u64,
    /// Individual write attempts that failed
    pub failed_attempts: u64,
    /// Retries performed (attempts after the first, per batch)
    pub retries: u64,
    /// Batches abandoned after exhausting retries
    pub batches_dropped: u64,
    /// Current queue depth (pending + in-flight)
    pub queue_depth: u64,
}

impl SinkStatsSnapshot {
    /// Difference from an earlier snapshot, for rate computation
    ///
    /// `queue_depth` is a gauge and is carried over, not subtracted.
    pub fn diff(&self, previous: &SinkStatsSnapshot) -> SinkStatsSnapshot {
        SinkStatsSnapshot {
            batches_sent: self.batches_sent.saturating_sub(previous.batches_sent),
            messages_sent: self.messages_sent.saturating_sub(previous.messages_sent),
            bytes_sent: self.bytes_sent.saturating_sub(previous.bytes_sent),
            failed_attempts: self
                .failed_attempts
                .saturating_sub(previous.failed_attempts),
            retries: self.retries.saturating_sub(previous.retries),
            batches_dropped: self
                .batches_dropped
                .saturating_sub(previous.batches_dropped),
            queue_depth: self.queue_depth,
        }
    }
}

/// Trait for sinks to expose stats to the reporter
pub trait SinkStatsProvider: Send + Sync {
    /// Unique sink name from configuration
    fn sink_name(&self) -> &str;

    /// Sink type ("broker", "file", "blackhole")
    fn sink_type(&self) -> &str;

    /// Get a snapshot of current counters
    fn snapshot(&self) -> SinkStatsSnapshot;
}

/// Point-in-time snapshot of the router's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RouterStatsSnapshot {
    /// Messages presented to the router
    pub messages_received: u64,
    /// Messages accepted by at least one sink queue
    pub messages_routed: u64,
    /// Messages matching no routing rule
    pub no_route: u64,
    /// Route targets naming a sink absent from the registry
    pub unknown_sink: u64,
    /// Successful queue offers
    pub offers_ok: u64,
    /// Offers rejected (full, timeout, or closed queue)
    pub offers_rejected: u64,
    /// Times an offer hit backpressure
    pub backpressure_events: u64,
}

/// Trait for the router to expose stats to the reporter
pub trait RouterStatsProvider: Send + Sync {
    /// Get a snapshot of current counters
    fn snapshot(&self) -> RouterStatsSnapshot;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_snapshot_diff() {
        let prev = SinkStatsSnapshot {
            batches_sent: 10,
            messages_sent: 1000,
            bytes_sent: 50_000,
            queue_depth: 5,
            ..Default::default()
        };
        let current = SinkStatsSnapshot {
            batches_sent: 15,
            messages_sent: 1500,
            bytes_sent: 75_000,
            queue_depth: 2,
            ..Default::default()
        };

        let diff = current.diff(&prev);
        assert_eq!(diff.batches_sent, 5);
        assert_eq!(diff.messages_sent, 500);
        assert_eq!(diff.bytes_sent, 25_000);
        // Gauge carries over
        assert_eq!(diff.queue_depth, 2);
    }

    #[test]
    fn test_sink_snapshot_diff_saturating() {
        let prev = SinkStatsSnapshot {
            batches_sent: 10,
            ..Default::default()
        };
        let current = SinkStatsSnapshot::default();

        assert_eq!(current.diff(&prev).batches_sent, 0);
    }
}
