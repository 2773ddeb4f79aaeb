//! Blackhole sink - discards everything
//!
//! Accepts every batch and drops it. Useful for measuring pipeline
//! throughput without downstream I/O, and as a routing target for traffic
//! that only needs to be counted. Delivery counters still come from the
//! engine, so a blackhole sink reports sent batches like any other.

use std::sync::Arc;

use async_trait::async_trait;
use courier_protocol::Message;

use crate::common::SinkError;
use crate::sink::BatchWrite;

/// Sink that accepts and discards all batches
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackholeSink;

impl BlackholeSink {
    /// Create a blackhole sink
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BatchWrite for BlackholeSink {
    async fn open(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn write(&mut self, _batch: &[Arc<Message>]) -> Result<(), SinkError> {
        // Arc refcounts drop here; the last referencing queue frees the data
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "blackhole"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(key: &str) -> Arc<Message> {
        Arc::new(Message::new(key, "x"))
    }

    #[tokio::test]
    async fn test_accepts_everything() {
        let mut sink = BlackholeSink::new();
        sink.open().await.unwrap();
        sink.write(&[msg("a"), msg("b")]).await.unwrap();
        sink.write(&[]).await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(sink.sink_type(), "blackhole");
    }
}
