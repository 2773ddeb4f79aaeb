//! The polymorphic sink contract
//!
//! Concrete sinks differ only in how they open a destination, deliver one
//! batch, and release resources. Batching, retry, commit, and stats all live
//! in the engine, which composes around any `BatchWrite` implementation.

use std::sync::Arc;

use async_trait::async_trait;
use courier_protocol::Message;

use crate::common::SinkError;

/// Destination-specific delivery operations
///
/// Invoked only by the owning engine task, so implementations may hold
/// connection state in `&mut self` without synchronization. `write` performs
/// the actual I/O and is where blocking network latency is confined.
///
/// # Contract
///
/// - `open` is called once before the drain loop starts. A failed open is
///   logged and delivery proceeds; implementations should reconnect lazily
///   from `write`.
/// - `write` must deliver the whole batch or return an error; the engine
///   decides whether to retry, requeue, or drop.
/// - `close` is called exactly once after the final batch.
#[async_trait]
pub trait BatchWrite: Send {
    /// Allocate resources (connect, open files)
    async fn open(&mut self) -> Result<(), SinkError>;

    /// Deliver one batch to the destination
    async fn write(&mut self, batch: &[Arc<Message>]) -> Result<(), SinkError>;

    /// Release resources
    async fn close(&mut self) -> Result<(), SinkError>;

    /// Sink type name, for logs and stats
    fn sink_type(&self) -> &'static str;
}

#[async_trait]
impl BatchWrite for Box<dyn BatchWrite> {
    async fn open(&mut self) -> Result<(), SinkError> {
        (**self).open().await
    }

    async fn write(&mut self, batch: &[Arc<Message>]) -> Result<(), SinkError> {
        (**self).write(batch).await
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        (**self).close().await
    }

    fn sink_type(&self) -> &'static str {
        (**self).sink_type()
    }
}
