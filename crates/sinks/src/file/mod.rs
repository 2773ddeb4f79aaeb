//! File sink - append-only local log
//!
//! Writes one line per message:
//!
//! ```text
//! 2026-08-07T12:00:00.000Z\terror.db\tconnection refused
//! ```
//!
//! The whole batch is buffered and written in one call, then flushed, so a
//! committed batch is on its way to disk before the queue releases it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, SecondsFormat, Utc};
use courier_protocol::Message;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::common::SinkError;
use crate::sink::BatchWrite;

/// Configuration for the file sink
#[derive(Debug, Clone)]
pub struct FileConfig {
    /// Output file path; parent directories are created on open
    pub path: PathBuf,
}

impl FileConfig {
    /// Create a config for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Sink that appends messages to a local file
pub struct FileSink {
    config: FileConfig,
    file: Option<File>,
    buf: BytesMut,
}

impl FileSink {
    /// Create a file sink
    pub fn new(config: FileConfig) -> Self {
        Self {
            config,
            file: None,
            buf: BytesMut::with_capacity(16 * 1024),
        }
    }

    async fn ensure_open(&mut self) -> Result<(), SinkError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)
            .await
            .map_err(|e| SinkError::connect(self.config.path.display().to_string(), e))?;

        tracing::debug!(path = %self.config.path.display(), "opened sink file");
        self.file = Some(file);
        Ok(())
    }

    fn encode_batch(&mut self, batch: &[Arc<Message>]) {
        self.buf.clear();
        for msg in batch {
            let ts: DateTime<Utc> = msg.timestamp().into();
            self.buf
                .put_slice(ts.to_rfc3339_opts(SecondsFormat::Millis, true).as_bytes());
            self.buf.put_u8(b'\t');
            self.buf.put_slice(msg.routing_key().as_bytes());
            self.buf.put_u8(b'\t');
            self.buf.put_slice(msg.payload());
            self.buf.put_u8(b'\n');
        }
    }
}

#[async_trait]
impl BatchWrite for FileSink {
    async fn open(&mut self) -> Result<(), SinkError> {
        self.ensure_open().await
    }

    async fn write(&mut self, batch: &[Arc<Message>]) -> Result<(), SinkError> {
        self.ensure_open().await?;
        self.encode_batch(batch);

        let Some(file) = self.file.as_mut() else {
            return Err(SinkError::Closed);
        };

        if let Err(e) = async {
            file.write_all(&self.buf).await?;
            file.flush().await
        }
        .await
        {
            // Reopen on the next attempt; the handle may be stale
            self.file = None;
            return Err(SinkError::Io(e));
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;
