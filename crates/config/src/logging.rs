//! Logging configuration

use serde::Deserialize;

/// Logging configuration
///
/// The level string is an `EnvFilter` directive, so both plain levels
/// ("info") and per-target filters ("info,courier_sinks=debug") work.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level / filter directive
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
