//! Queued sink engine - the shared batching and draining loop
//!
//! One engine runs per sink, on its own task. It polls the sink's queue with
//! a size/time dual trigger, hands batches to the writer, and commits on
//! success. Every failure is absorbed here: retried with backoff, then
//! requeued or dropped per policy, counted, and reported - never propagated
//! to the router or another sink.

use std::sync::Arc;
use std::time::Duration;

use courier_queue::MessageQueue;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::common::{SinkStats, SinkStatsHandle};
use crate::sink::BatchWrite;
use crate::util::RateLimitedLogger;

/// Default messages per batch
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Default wait for a batch to fill
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(1);

/// Default retries after the first failed attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default drain window on shutdown
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Delay schedule between write attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),

    /// Delay doubles per retry, capped
    Exponential {
        /// Delay before the first retry
        base: Duration,
        /// Upper bound on the delay
        cap: Duration,
    },
}

impl Backoff {
    /// Delay before retry number `attempt` (zero-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(d) => d,
            Self::Exponential { base, cap } => {
                let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
                base.checked_mul(factor).map_or(cap, |d| d.min(cap))
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed(Duration::from_millis(100))
    }
}

/// What happens to a batch once retries are exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Commit the batch anyway, count it dropped, report it
    ///
    /// The default: a dead downstream sheds load instead of stalling its
    /// queue.
    #[default]
    Drop,

    /// Roll the batch back to the queue front and try again next poll
    ///
    /// Preserves strict FIFO at the cost of head-of-line blocking while the
    /// destination stays down.
    Requeue,
}

/// Engine tuning knobs, one set per sink
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Messages per batch
    pub batch_size: usize,

    /// Longest wait for a batch to fill
    pub batch_timeout: Duration,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Delay schedule between attempts
    pub backoff: Backoff,

    /// Disposition of a batch after retry exhaustion
    pub on_failure: FailurePolicy,

    /// Drain window once shutdown is requested
    pub grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::default(),
            on_failure: FailurePolicy::default(),
            grace: DEFAULT_GRACE,
        }
    }
}

/// Engine lifecycle states
///
/// `Closing` always runs after `Open`: buffered messages get a delivery
/// attempt (bounded by the grace window) before the engine stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Built, not yet running
    Created,
    /// Drain loop running
    Open,
    /// Shutdown requested, draining the remainder
    Closing,
    /// Stopped, writer released
    Closed,
}

/// Generic batching engine wrapping one `BatchWrite` implementation
///
/// # Example
///
/// ```ignore
/// let queue = Arc::new(MessageQueue::with_defaults());
/// let engine = QueuedSink::new("audit_file", writer, Arc::clone(&queue), config);
/// let stats = engine.stats_handle();
///
/// let token = CancellationToken::new();
/// let task = tokio::spawn(engine.run(token.clone()));
///
/// // ... offer messages to `queue` ...
///
/// token.cancel();       // request CLOSING
/// task.await.unwrap();  // drained and CLOSED
/// ```
pub struct QueuedSink<W: BatchWrite> {
    name: String,
    writer: W,
    queue: Arc<MessageQueue>,
    config: EngineConfig,
    stats: Arc<SinkStats>,
    state: EngineState,
    failure_log: RateLimitedLogger,
}

impl<W: BatchWrite> QueuedSink<W> {
    /// Create an engine around a writer and its queue
    pub fn new(
        name: impl Into<String>,
        writer: W,
        queue: Arc<MessageQueue>,
        config: EngineConfig,
    ) -> Self {
        Self {
            name: name.into(),
            writer,
            queue,
            config,
            stats: Arc::new(SinkStats::new()),
            state: EngineState::Created,
            failure_log: RateLimitedLogger::default(),
        }
    }

    /// Get the sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Get a stats handle for the reporter
    ///
    /// Remains valid after `run()` consumes the engine.
    pub fn stats_handle(&self) -> SinkStatsHandle {
        SinkStatsHandle::new(
            self.name.clone(),
            self.writer.sink_type(),
            Arc::clone(&self.stats),
            Arc::clone(&self.queue),
        )
    }

    /// Run the drain loop until cancelled, then drain and close
    ///
    /// Consumes the engine. The loop never returns early on writer errors;
    /// failure isolation is the engine's job.
    pub async fn run(mut self, token: CancellationToken) {
        tracing::info!(
            sink = %self.name,
            sink_type = self.writer.sink_type(),
            batch_size = self.config.batch_size,
            batch_timeout_ms = self.config.batch_timeout.as_millis() as u64,
            max_retries = self.config.max_retries,
            "sink engine starting"
        );

        if let Err(e) = self.writer.open().await {
            tracing::warn!(
                sink = %self.name,
                error = %e,
                "sink open failed, deliveries will retry"
            );
        }

        self.state = EngineState::Open;

        let queue = Arc::clone(&self.queue);
        loop {
            let batch = tokio::select! {
                _ = token.cancelled() => break,
                batch = queue.poll_batch(self.config.batch_size, self.config.batch_timeout) => {
                    batch
                }
            };

            if !batch.is_empty() {
                self.deliver(batch).await;
            }
        }

        self.state = EngineState::Closing;
        self.drain_remainder().await;

        if let Err(e) = self.writer.close().await {
            tracing::warn!(sink = %self.name, error = %e, "sink close failed");
        }
        self.state = EngineState::Closed;

        let snapshot = self.stats.snapshot(self.queue.depth());
        tracing::info!(
            sink = %self.name,
            batches_sent = snapshot.batches_sent,
            messages_sent = snapshot.messages_sent,
            bytes_sent = snapshot.bytes_sent,
            failed_attempts = snapshot.failed_attempts,
            batches_dropped = snapshot.batches_dropped,
            undelivered = snapshot.queue_depth,
            "sink engine stopped"
        );
    }

    /// Drain buffered messages within the grace window
    async fn drain_remainder(&mut self) {
        self.queue.close();
        let deadline = Instant::now() + self.config.grace;

        while !self.queue.is_empty() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    sink = %self.name,
                    undelivered = self.queue.depth(),
                    "grace window expired with messages still queued"
                );
                break;
            }

            // The queue is closed, so this returns immediately with
            // whatever is left
            let batch = self
                .queue
                .poll_batch(self.config.batch_size, Duration::ZERO)
                .await;
            if batch.is_empty() {
                break;
            }
            self.deliver(batch).await;
        }
    }

    /// Deliver one batch: up to 1 + max_retries attempts, then the failure
    /// policy
    async fn deliver(&mut self, batch: Vec<Arc<courier_protocol::Message>>) {
        let messages = batch.len() as u64;
        let bytes: u64 = batch.iter().map(|m| m.len() as u64).sum();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                self.stats.record_retry();
                tokio::time::sleep(self.config.backoff.delay(attempt - 1)).await;
            }

            match self.writer.write(&batch).await {
                Ok(()) => {
                    self.queue.commit(batch.len());
                    self.stats.record_sent(messages, bytes);
                    if attempt > 0 {
                        tracing::debug!(
                            sink = %self.name,
                            attempt = attempt + 1,
                            messages,
                            "batch delivered after retry"
                        );
                    }
                    return;
                }
                Err(e) => {
                    self.stats.record_failed_attempt();
                    tracing::debug!(
                        sink = %self.name,
                        attempt = attempt + 1,
                        max_attempts = self.config.max_retries + 1,
                        error = %e,
                        "write attempt failed"
                    );

                    if attempt == self.config.max_retries {
                        self.handle_exhausted(batch.len(), &e);
                        return;
                    }
                }
            }
        }
    }

    /// Apply the configured failure policy after the final attempt
    fn handle_exhausted(&self, batch_len: usize, error: &crate::common::SinkError) {
        match self.config.on_failure {
            FailurePolicy::Drop => {
                self.queue.commit(batch_len);
                self.stats.record_dropped_batch();
                self.failure_log.error(
                    &format!("sink '{}' dropped batch of {batch_len} after retries", self.name),
                    error,
                );
            }
            FailurePolicy::Requeue => {
                self.queue.rollback();
                self.failure_log.error(
                    &format!(
                        "sink '{}' requeued batch of {batch_len} after retries",
                        self.name
                    ),
                    error,
                );
            }
        }
    }
}

impl<W: BatchWrite> std::fmt::Debug for QueuedSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedSink")
            .field("name", &self.name)
            .field("sink_type", &self.writer.sink_type())
            .field("state", &self.state)
            .field("queue_depth", &self.queue.depth())
            .finish()
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
