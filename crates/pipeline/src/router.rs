//! Router - per-message fan-out over snapshot state
//!
//! The router owns the only two pieces of state shared between producers and
//! sinks: the routing map and the sink registry, both behind `ArcSwap`. The
//! hot path takes a snapshot of each, so a concurrent swap never exposes a
//! partially-updated view.

use std::sync::Arc;

use arc_swap::ArcSwap;
use courier_protocol::Message;
use courier_queue::QueueError;
use courier_routing::RoutingMap;
use courier_sinks::util::RateLimitedLogger;

use crate::metrics::{BackpressureTracker, RouterMetrics, RouterStatsHandle};
use crate::registry::SinkRegistry;

/// Routes each message to the queues of its target sinks
///
/// # Example
///
/// ```ignore
/// let router = Router::new(map, registry);
///
/// // Hot path: evaluate rules, offer to each matched sink's queue
/// let accepted = router.route(Message::new("error.db", payload)).await;
///
/// // Reload: swap in a complete replacement, close the old topology
/// let old = router.swap_sinks(new_registry);
/// old.close_all().await;
/// ```
pub struct Router {
    /// Current routing rules, swapped wholesale on reload
    routes: ArcSwap<RoutingMap>,

    /// Current sink topology, swapped wholesale on reload
    sinks: ArcSwap<SinkRegistry>,

    /// Hot-path counters
    metrics: Arc<RouterMetrics>,

    /// Rate-limited report for routes naming unregistered sinks
    missing_sink_log: RateLimitedLogger,

    /// Rate-limited aggregate report for rejected offers
    backpressure: BackpressureTracker,
}

impl Router {
    /// Create a router over an initial map and registry
    pub fn new(routes: RoutingMap, sinks: SinkRegistry) -> Self {
        Self {
            routes: ArcSwap::from_pointee(routes),
            sinks: ArcSwap::from_pointee(sinks),
            metrics: Arc::new(RouterMetrics::new()),
            missing_sink_log: RateLimitedLogger::default(),
            backpressure: BackpressureTracker::new(),
        }
    }

    /// Route one message to every matching sink's queue
    ///
    /// Evaluates the routing snapshot against the message's routing key,
    /// deduplicates the matched sink names, and offers the message to each
    /// target queue. The message is wrapped in one `Arc`, so fan-out shares
    /// a single allocation.
    ///
    /// Returns the number of queues that accepted the message.
    ///
    /// # Failure behavior
    ///
    /// - No rule matches: counted as no-route, logged at trace, not an
    ///   error.
    /// - A matched name is missing from the registry: counted and reported
    ///   through the rate-limited log; other targets are unaffected.
    /// - A queue rejects the offer: counted, aggregated into the
    ///   backpressure summary; other targets are unaffected.
    pub async fn route(&self, msg: Message) -> usize {
        self.metrics.record_received();

        // Complete snapshots: a swap mid-call is invisible here
        let map = self.routes.load_full();
        let registry = self.sinks.load_full();

        let targets = map.targets(msg.routing_key());
        if targets.is_empty() {
            self.metrics.record_no_route();
            tracing::trace!(routing_key = %msg.routing_key(), "no route for message");
            return 0;
        }

        let msg = Arc::new(msg);
        let mut accepted = 0;

        for name in targets {
            let Some(runtime) = registry.get(name) else {
                self.metrics.record_unknown_sink();
                self.missing_sink_log
                    .error("route target not registered", &name);
                continue;
            };

            match runtime.queue().offer(Arc::clone(&msg)).await {
                Ok(()) => {
                    self.metrics.record_offer_ok();
                    accepted += 1;
                }
                Err(e) => {
                    self.metrics.record_offer_rejected();
                    if matches!(e, QueueError::Full { .. } | QueueError::Timeout { .. }) {
                        self.metrics.record_backpressure();
                        self.backpressure.record_reject(name);
                    }
                    tracing::debug!(
                        sink = %name,
                        routing_key = %msg.routing_key(),
                        error = %e,
                        "offer rejected"
                    );
                }
            }
        }

        if accepted > 0 {
            self.metrics.record_routed();
        }
        accepted
    }

    /// Replace the routing map; returns the previous one
    ///
    /// A single atomic assignment: calls in flight keep the snapshot they
    /// already loaded.
    pub fn swap_routes(&self, routes: RoutingMap) -> Arc<RoutingMap> {
        let old = self.routes.swap(Arc::new(routes));
        tracing::info!(
            rules = self.routes.load().rule_count(),
            "routing map swapped"
        );
        old
    }

    /// Replace the sink registry; returns the previous one
    ///
    /// The caller is responsible for closing the returned registry once the
    /// swap is visible.
    pub fn swap_sinks(&self, sinks: SinkRegistry) -> Arc<SinkRegistry> {
        let old = self.sinks.swap(Arc::new(sinks));
        tracing::info!(sinks = self.sinks.load().len(), "sink registry swapped");
        old
    }

    /// Get the current routing map snapshot
    pub fn routes(&self) -> Arc<RoutingMap> {
        self.routes.load_full()
    }

    /// Get the current sink registry snapshot
    pub fn registry(&self) -> Arc<SinkRegistry> {
        self.sinks.load_full()
    }

    /// Get the router metrics
    pub fn metrics(&self) -> &RouterMetrics {
        &self.metrics
    }

    /// Get a stats handle for the reporter
    pub fn stats_handle(&self) -> RouterStatsHandle {
        RouterStatsHandle::new(Arc::clone(&self.metrics))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("rules", &self.routes.load().rule_count())
            .field("sinks", &self.sinks.load().len())
            .finish()
    }
}
