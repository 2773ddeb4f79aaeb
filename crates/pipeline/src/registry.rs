//! Live sink registry
//!
//! A `SinkRuntime` is one running sink: the producer side of its queue, the
//! cancellation token and join handle of its engine task, and a stats
//! handle. A `SinkRegistry` is an immutable name-to-runtime map, built fully
//! off to the side and installed with a single pointer swap.

use std::collections::HashMap;
use std::sync::Arc;

use courier_queue::MessageQueue;
use courier_sinks::SinkStatsHandle;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};

/// One live sink: queue handle, engine task, stats
pub struct SinkRuntime {
    name: String,
    queue: Arc<MessageQueue>,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    stats: SinkStatsHandle,
}

impl SinkRuntime {
    /// Create a runtime for a spawned engine task
    pub fn new(
        name: impl Into<String>,
        queue: Arc<MessageQueue>,
        token: CancellationToken,
        task: JoinHandle<()>,
        stats: SinkStatsHandle,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            token,
            task: Mutex::new(Some(task)),
            stats,
        }
    }

    /// Get the sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the producer side of the sink's queue
    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    /// Get a stats handle for the reporter
    pub fn stats_handle(&self) -> SinkStatsHandle {
        self.stats.clone()
    }

    /// Request shutdown and wait for the engine to drain and stop
    ///
    /// Idempotent: only the first call awaits the task.
    pub async fn close(&self) {
        self.token.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(sink = %self.name, error = %e, "sink task ended abnormally");
            }
        }
    }
}

impl std::fmt::Debug for SinkRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkRuntime")
            .field("name", &self.name)
            .field("queue_depth", &self.queue.depth())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Immutable map of live sinks by name
///
/// Built during startup or reload, then installed behind an `ArcSwap` in the
/// router. Never mutated after installation; a topology change builds a new
/// registry and swaps.
#[derive(Debug, Default)]
pub struct SinkRegistry {
    sinks: HashMap<String, Arc<SinkRuntime>>,
}

impl SinkRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a runtime during construction
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSink` if the name is already taken.
    pub fn insert(&mut self, runtime: SinkRuntime) -> Result<()> {
        let name = runtime.name().to_string();
        if self.sinks.contains_key(&name) {
            return Err(PipelineError::DuplicateSink(name));
        }
        self.sinks.insert(name, Arc::new(runtime));
        Ok(())
    }

    /// Look up a sink by name
    pub fn get(&self, name: &str) -> Option<&Arc<SinkRuntime>> {
        self.sinks.get(name)
    }

    /// Number of registered sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Registered sink names, unordered
    pub fn names(&self) -> Vec<&str> {
        self.sinks.keys().map(String::as_str).collect()
    }

    /// Stats handles for every sink, for reporter registration
    pub fn stats_handles(&self) -> Vec<SinkStatsHandle> {
        self.sinks.values().map(|rt| rt.stats_handle()).collect()
    }

    /// Close every sink concurrently
    ///
    /// Each sink drains within its own grace window; total latency is
    /// bounded by the slowest sink, not the sum.
    pub async fn close_all(&self) {
        let tasks: Vec<_> = self
            .sinks
            .values()
            .map(|rt| {
                let rt = Arc::clone(rt);
                tokio::spawn(async move { rt.close().await })
            })
            .collect();

        for task in tasks {
            let _ = task.await;
        }

        tracing::info!(sinks = self.sinks.len(), "all sinks closed");
    }
}
