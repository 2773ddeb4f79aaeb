//! Per-sink configuration
//!
//! Every sink table carries the shared queue/batch/retry dimensions plus
//! type-specific parameters selected by the `type` field.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default queue capacity per sink, in messages
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default messages per batch
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// One sink's configuration: type-specific parameters plus shared tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Type-specific parameters, selected by `type`
    #[serde(flatten)]
    pub kind: SinkKind,

    /// Queue, batch, and retry dimensions shared by every sink type
    #[serde(flatten)]
    pub tuning: SinkTuning,
}

/// Type-specific sink parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkKind {
    /// Length-prefixed records over TCP to a broker endpoint
    Broker {
        /// Broker address (host:port)
        endpoint: String,

        /// Body encoding
        #[serde(default)]
        serde: CodecKind,

        /// Connection timeout
        #[serde(default = "default_connect_timeout", with = "humantime_serde")]
        connect_timeout: Duration,

        /// Write timeout per batch
        #[serde(default = "default_write_timeout", with = "humantime_serde")]
        write_timeout: Duration,
    },

    /// Append-only local log file
    File {
        /// Output file path
        path: PathBuf,
    },

    /// Discard everything
    Blackhole,
}

impl SinkKind {
    /// Sink type name, matching the `type` config field
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Broker { .. } => "broker",
            Self::File { .. } => "file",
            Self::Blackhole => "blackhole",
        }
    }
}

/// Body encoding for broker records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    /// Payload bytes untouched
    #[default]
    Raw,

    /// JSON envelope with routing key and timestamp
    Json,
}

/// Queue overflow behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowKind {
    /// Wait for space up to `offer_timeout`
    #[default]
    Block,

    /// Reject immediately when full
    FailFast,

    /// Evict the oldest pending entry
    DropOldest,
}

/// Backoff schedule between write attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// Same delay before every retry
    #[default]
    Fixed,

    /// Delay doubles per retry, capped at `retry_cap`
    Exponential,
}

/// Disposition of a batch after retry exhaustion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Release the batch, count it dropped
    #[default]
    Drop,

    /// Return the batch to the queue front
    Requeue,
}

/// Shared queue/batch/retry tuning, with defaults throughout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkTuning {
    /// Queue capacity in messages (pending + in-flight)
    pub queue_capacity: usize,

    /// Overflow behavior when the queue is full
    pub overflow: OverflowKind,

    /// Longest a blocking offer waits for space
    #[serde(with = "humantime_serde")]
    pub offer_timeout: Duration,

    /// Messages per batch
    pub batch_size: usize,

    /// Longest wait for a batch to fill
    #[serde(with = "humantime_serde")]
    pub batch_timeout: Duration,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Backoff schedule between attempts
    pub backoff: BackoffKind,

    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub retry_base: Duration,

    /// Upper bound on the exponential delay
    #[serde(with = "humantime_serde")]
    pub retry_cap: Duration,

    /// What happens to a batch after retries are exhausted
    pub on_failure: FailureKind,

    /// Drain window on shutdown
    #[serde(with = "humantime_serde")]
    pub grace: Duration,
}

impl Default for SinkTuning {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowKind::default(),
            offer_timeout: Duration::from_secs(5),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: Duration::from_secs(1),
            max_retries: 3,
            backoff: BackoffKind::default(),
            retry_base: Duration::from_millis(100),
            retry_cap: Duration::from_secs(10),
            on_failure: FailureKind::default(),
            grace: Duration::from_secs(10),
        }
    }
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_write_timeout() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_sink_defaults() {
        let config: SinkConfig = toml::from_str(
            r#"
type = "broker"
endpoint = "localhost:9092"
"#,
        )
        .unwrap();

        match &config.kind {
            SinkKind::Broker {
                endpoint,
                serde,
                connect_timeout,
                write_timeout,
            } => {
                assert_eq!(endpoint, "localhost:9092");
                assert_eq!(*serde, CodecKind::Raw);
                assert_eq!(*connect_timeout, Duration::from_secs(10));
                assert_eq!(*write_timeout, Duration::from_secs(5));
            }
            other => panic!("wrong kind: {other:?}"),
        }

        assert_eq!(config.tuning.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.tuning.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.tuning.batch_timeout, Duration::from_secs(1));
        assert_eq!(config.tuning.max_retries, 3);
        assert_eq!(config.tuning.overflow, OverflowKind::Block);
        assert_eq!(config.tuning.on_failure, FailureKind::Drop);
    }

    #[test]
    fn test_file_sink() {
        let config: SinkConfig = toml::from_str(
            r#"
type = "file"
path = "logs/audit.log"
batch_size = 50
"#,
        )
        .unwrap();

        assert_eq!(config.kind.type_name(), "file");
        assert_eq!(config.tuning.batch_size, 50);
    }

    #[test]
    fn test_blackhole_sink() {
        let config: SinkConfig = toml::from_str(r#"type = "blackhole""#).unwrap();
        assert_eq!(config.kind.type_name(), "blackhole");
    }

    #[test]
    fn test_overflow_variants() {
        for (s, expected) in [
            ("block", OverflowKind::Block),
            ("fail_fast", OverflowKind::FailFast),
            ("drop_oldest", OverflowKind::DropOldest),
        ] {
            let toml = format!("type = \"blackhole\"\noverflow = \"{s}\"");
            let config: SinkConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config.tuning.overflow, expected, "failed for {s}");
        }
    }

    #[test]
    fn test_missing_type_rejected() {
        let result: std::result::Result<SinkConfig, _> =
            toml::from_str(r#"endpoint = "localhost:9092""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: std::result::Result<SinkConfig, _> = toml::from_str(r#"type = "kafka""#);
        assert!(result.is_err());
    }
}
