//! Courier Configuration
//!
//! TOML-based configuration with sensible defaults. A minimal config names a
//! sink and a route; everything else falls back to defaults.
//!
//! # Parsing
//!
//! ```
//! use courier_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(r#"
//! [sinks.devnull]
//! type = "blackhole"
//!
//! [[routes]]
//! pattern = "*"
//! sinks = ["devnull"]
//! "#).unwrap();
//!
//! assert_eq!(config.sinks.len(), 1);
//! ```
//!
//! # Full example
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [metrics]
//! enabled = true
//! interval = "10s"
//!
//! [sinks.broker_main]
//! type = "broker"
//! endpoint = "broker.example.com:9092"
//! queue_capacity = 10000
//! overflow = "block"
//! batch_size = 200
//! batch_timeout = "1s"
//! max_retries = 3
//! backoff = "exponential"
//! retry_base = "100ms"
//! retry_cap = "10s"
//! on_failure = "drop"
//! serde = "json"
//!
//! [sinks.audit_file]
//! type = "file"
//! path = "logs/audit.log"
//!
//! [[routes]]
//! pattern = "error.*"
//! sinks = ["broker_main"]
//!
//! [[routes]]
//! pattern = "*"
//! sinks = ["audit_file"]
//! ```

mod error;
mod logging;
mod metrics;
mod routes;
mod sinks;
mod validation;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use logging::LogConfig;
pub use metrics::MetricsConfig;
pub use routes::RouteConfig;
pub use sinks::{
    BackoffKind, CodecKind, FailureKind, OverflowKind, SinkConfig, SinkKind, SinkTuning,
};

/// Top-level configuration
///
/// All sections are optional except the sink and route tables; an empty
/// pipeline is a configuration error caught by validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Stats reporting configuration
    pub metrics: MetricsConfig,

    /// Sinks by name; names are unique by construction (TOML table keys)
    pub sinks: BTreeMap<String, SinkConfig>,

    /// Routing rules, evaluated in order
    pub routes: Vec<RouteConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, fails to parse, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-references and value ranges
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// All sink names referenced by any route, deduplicated
    pub fn referenced_sinks(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for route in &self.routes {
            for sink in &route.sinks {
                if !names.contains(&sink.as_str()) {
                    names.push(sink.as_str());
                }
            }
        }
        names
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_minimal_config() {
        let config = Config::from_str(
            r#"
[sinks.devnull]
type = "blackhole"

[[routes]]
pattern = "*"
sinks = ["devnull"]
"#,
        )
        .unwrap();

        assert_eq!(config.sinks.len(), 1);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.log.level, "info");
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_str(
            r#"
[log]
level = "debug"

[metrics]
enabled = true
interval = "5s"

[sinks.broker_main]
type = "broker"
endpoint = "broker.example.com:9092"
queue_capacity = 5000
overflow = "fail_fast"
batch_size = 100
batch_timeout = "500ms"
max_retries = 5
backoff = "exponential"
retry_base = "50ms"
retry_cap = "5s"
on_failure = "requeue"
serde = "json"

[sinks.audit_file]
type = "file"
path = "logs/audit.log"

[sinks.devnull]
type = "blackhole"

[[routes]]
pattern = "error.*"
sinks = ["broker_main"]

[[routes]]
pattern = "*"
sinks = ["audit_file"]
"#,
        )
        .unwrap();

        assert_eq!(config.log.level, "debug");
        assert_eq!(config.metrics.interval, Duration::from_secs(5));
        assert_eq!(config.sinks.len(), 3);
        assert_eq!(config.routes.len(), 2);

        let broker = config.sinks.get("broker_main").unwrap();
        assert_eq!(broker.tuning.queue_capacity, 5000);
        assert_eq!(broker.tuning.overflow, OverflowKind::FailFast);
        assert_eq!(broker.tuning.batch_timeout, Duration::from_millis(500));
        assert_eq!(broker.tuning.max_retries, 5);
        assert_eq!(broker.tuning.backoff, BackoffKind::Exponential);
        assert_eq!(broker.tuning.on_failure, FailureKind::Requeue);
        match &broker.kind {
            SinkKind::Broker { endpoint, serde, .. } => {
                assert_eq!(endpoint, "broker.example.com:9092");
                assert_eq!(*serde, CodecKind::Json);
            }
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[test]
    fn test_referenced_sinks_dedup() {
        let config = Config::from_str(
            r#"
[sinks.a]
type = "blackhole"

[sinks.b]
type = "blackhole"

[[routes]]
pattern = "x.*"
sinks = ["a", "b"]

[[routes]]
pattern = "*"
sinks = ["a"]
"#,
        )
        .unwrap();

        assert_eq!(config.referenced_sinks(), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_str("not { toml").is_err());
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let result = Config::from_str(
            r#"
[sink.devnull]
type = "blackhole"
"#,
        );
        assert!(result.is_err());
    }
}
