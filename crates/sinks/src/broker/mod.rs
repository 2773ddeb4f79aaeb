//! Broker sink - length-prefixed records over TCP
//!
//! Delivers each batch to a broker endpoint as a sequence of framed records.
//! The broker itself is an opaque collaborator: this sink only speaks the
//! framing below and treats anything the peer does beyond accepting bytes as
//! out of scope.
//!
//! # Wire format
//!
//! One frame per message:
//!
//! ```text
//! [4 bytes: key length (big-endian)][key bytes]
//! [4 bytes: body length (big-endian)][body bytes]
//! ```
//!
//! The key is the message's routing key; the body comes from the configured
//! `MessageSerde`. A whole batch is buffered and written in one syscall.
//!
//! # Failure handling
//!
//! Connection state lives here; retry policy does not. On any write or
//! timeout error the connection is invalidated and the error returned - the
//! owning engine decides whether to retry, and the next attempt reconnects.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use courier_protocol::{Message, MessageSerde};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::common::SinkError;
use crate::sink::BatchWrite;

/// Configuration for the broker sink
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker address (host:port)
    pub endpoint: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Write timeout per batch
    pub write_timeout: Duration,

    /// Disable Nagle's algorithm on the connection
    pub tcp_nodelay: bool,
}

impl BrokerConfig {
    /// Create a config for the given endpoint with default timeouts
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            tcp_nodelay: true,
        }
    }

    /// Set the connection timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-batch write timeout
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}

/// Sink that frames messages onto a TCP connection to a broker
pub struct BrokerSink {
    config: BrokerConfig,

    /// Wire encoding for message bodies
    serde: Box<dyn MessageSerde>,

    /// Live connection, None until (re)connected
    connection: Option<TcpStream>,

    /// Reused encode buffer
    buf: BytesMut,
}

impl BrokerSink {
    /// Create a broker sink with the given body encoding
    pub fn new(config: BrokerConfig, serde: Box<dyn MessageSerde>) -> Self {
        Self {
            config,
            serde,
            connection: None,
            buf: BytesMut::with_capacity(64 * 1024),
        }
    }

    /// Connect if not already connected
    async fn ensure_connected(&mut self) -> Result<(), SinkError> {
        if self.connection.is_some() {
            return Ok(());
        }

        let stream = match timeout(
            self.config.connect_timeout,
            TcpStream::connect(&self.config.endpoint),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(SinkError::connect(&self.config.endpoint, e)),
            Err(_) => {
                return Err(SinkError::connect(
                    &self.config.endpoint,
                    std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
                ));
            }
        };

        if self.config.tcp_nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(
                    endpoint = %self.config.endpoint,
                    error = %e,
                    "failed to set TCP_NODELAY, continuing"
                );
            }
        }

        tracing::debug!(endpoint = %self.config.endpoint, "connected to broker");
        self.connection = Some(stream);
        Ok(())
    }

    /// Encode the whole batch into the reusable buffer
    fn encode_batch(&mut self, batch: &[Arc<Message>]) -> Result<(), SinkError> {
        self.buf.clear();
        for msg in batch {
            let body = self.serde.serialize(msg)?;
            encode_record(msg.routing_key(), &body, &mut self.buf);
        }
        Ok(())
    }
}

/// Append one framed record to the buffer
fn encode_record(key: &str, body: &[u8], buf: &mut BytesMut) {
    buf.put_u32(key.len() as u32);
    buf.put_slice(key.as_bytes());
    buf.put_u32(body.len() as u32);
    buf.put_slice(body);
}

#[async_trait]
impl BatchWrite for BrokerSink {
    async fn open(&mut self) -> Result<(), SinkError> {
        self.ensure_connected().await
    }

    async fn write(&mut self, batch: &[Arc<Message>]) -> Result<(), SinkError> {
        self.ensure_connected().await?;
        self.encode_batch(batch)?;

        // Unwrap-free: ensure_connected just set it
        let Some(stream) = self.connection.as_mut() else {
            return Err(SinkError::Closed);
        };

        let result = timeout(self.config.write_timeout, async {
            stream.write_all(&self.buf).await?;
            stream.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                // Dead connection; next attempt reconnects
                self.connection = None;
                Err(SinkError::Io(e))
            }
            Err(_) => {
                self.connection = None;
                Err(SinkError::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut stream) = self.connection.take() {
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "broker"
    }
}

#[cfg(test)]
#[path = "broker_test.rs"]
mod broker_test;
