//! Periodic stats reporter
//!
//! Collects snapshots from every registered provider on a fixed interval and
//! logs them as structured lines. Reads are atomic loads; the reporter never
//! blocks the hot path.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::traits::{RouterStatsProvider, SinkStatsProvider};

/// Reporter task handle
///
/// # Example
///
/// ```ignore
/// let mut reporter = StatsReporter::new(Duration::from_secs(10));
/// reporter.set_router(router.stats_handle());
/// reporter.add_sink(sink.stats_handle());
///
/// let token = CancellationToken::new();
/// tokio::spawn(reporter.run(token.clone()));
/// ```
pub struct StatsReporter {
    interval: Duration,
    router: Option<Arc<dyn RouterStatsProvider>>,
    sinks: Vec<Arc<dyn SinkStatsProvider>>,
}

impl StatsReporter {
    /// Create a reporter with the given interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            router: None,
            sinks: Vec::new(),
        }
    }

    /// Register the router provider
    pub fn set_router(&mut self, provider: Arc<dyn RouterStatsProvider>) {
        self.router = Some(provider);
    }

    /// Register a sink provider
    pub fn add_sink(&mut self, provider: Arc<dyn SinkStatsProvider>) {
        self.sinks.push(provider);
    }

    /// Number of registered sink providers
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Run the reporter until cancelled
    ///
    /// Emits one final report on shutdown so the last partial interval is
    /// not lost.
    pub async fn run(self, token: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            sinks = self.sinks.len(),
            "stats reporter starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so the first report
        // covers a full interval
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.report(),
            }
        }

        self.report();
        tracing::info!("stats reporter stopped");
    }

    /// Log one line per registered component
    fn report(&self) {
        if let Some(router) = &self.router {
            let s = router.snapshot();
            tracing::info!(
                received = s.messages_received,
                routed = s.messages_routed,
                no_route = s.no_route,
                unknown_sink = s.unknown_sink,
                offers_ok = s.offers_ok,
                offers_rejected = s.offers_rejected,
                backpressure = s.backpressure_events,
                "router stats"
            );
        }

        for sink in &self.sinks {
            let s = sink.snapshot();
            tracing::info!(
                sink = %sink.sink_name(),
                sink_type = %sink.sink_type(),
                batches_sent = s.batches_sent,
                messages_sent = s.messages_sent,
                bytes_sent = s.bytes_sent,
                failed_attempts = s.failed_attempts,
                retries = s.retries,
                batches_dropped = s.batches_dropped,
                queue_depth = s.queue_depth,
                "sink stats"
            );
        }
    }
}
