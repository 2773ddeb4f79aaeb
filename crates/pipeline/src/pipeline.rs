//! Pipeline facade - ingestion API, reload, shutdown
//!
//! Ties the router, registry, and configuration together behind the three
//! operations the binary needs: submit a message, reload configuration,
//! shut down.

use std::sync::Arc;

use courier_config::Config;
use courier_protocol::Message;
use courier_sinks::SinkStatsHandle;

use crate::builder::{build_registry, build_routing_map};
use crate::error::Result;
use crate::metrics::RouterStatsHandle;
use crate::router::Router;

/// Running pipeline
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::start(&config)?;
///
/// // Ingestion boundary
/// pipeline.submit(Message::new("error.db", payload)).await;
///
/// // Hot reload: validated config swaps in atomically
/// pipeline.reload(&new_config)?;
///
/// // Drain everything and stop
/// pipeline.shutdown().await;
/// ```
pub struct Pipeline {
    router: Arc<Router>,
}

impl Pipeline {
    /// Build the topology from validated configuration and start it
    ///
    /// Must run inside a tokio runtime; one engine task is spawned per
    /// sink.
    pub fn start(config: &Config) -> Result<Self> {
        let routes = build_routing_map(config)?;
        let registry = build_registry(config)?;

        tracing::info!(
            rules = routes.rule_count(),
            sinks = registry.len(),
            "pipeline started"
        );

        Ok(Self {
            router: Arc::new(Router::new(routes, registry)),
        })
    }

    /// Submit one message - the local ingestion API
    ///
    /// Returns the number of sink queues that accepted the message.
    pub async fn submit(&self, msg: Message) -> usize {
        self.router.route(msg).await
    }

    /// Get the router, for callers that route directly
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Replace routes and sink topology from a new validated configuration
    ///
    /// The replacement topology is built and started fully off to the side;
    /// if anything fails the running topology is untouched. On success both
    /// swaps are single atomic assignments, and the old topology drains and
    /// closes in the background.
    pub fn reload(&self, config: &Config) -> Result<()> {
        let routes = build_routing_map(config)?;
        let registry = build_registry(config)?;

        self.router.swap_routes(routes);
        let old = self.router.swap_sinks(registry);

        tokio::spawn(async move {
            old.close_all().await;
        });

        tracing::info!("pipeline configuration reloaded");
        Ok(())
    }

    /// Close every sink and stop
    ///
    /// Sinks close concurrently; each drains within its own grace window.
    pub async fn shutdown(&self) {
        tracing::info!("pipeline shutting down");
        self.router.registry().close_all().await;
    }

    /// Router stats handle for the reporter
    pub fn router_stats(&self) -> RouterStatsHandle {
        self.router.stats_handle()
    }

    /// Sink stats handles for the reporter, for the current topology
    pub fn sink_stats(&self) -> Vec<SinkStatsHandle> {
        self.router.registry().stats_handles()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("router", &self.router)
            .finish()
    }
}
