//! Configuration error types

use std::io;

use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors from loading or validating configuration
///
/// A validation error during a hot reload rejects the swap and leaves the
/// previous configuration active.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A route references a sink that is not configured
    #[error("route '{pattern}' references unknown sink '{sink}'")]
    UnknownSink {
        /// Pattern of the offending route
        pattern: String,
        /// Name of the missing sink
        sink: String,
    },

    /// A route's pattern or sink list is invalid
    #[error(transparent)]
    Routing(#[from] courier_routing::RoutingError),

    /// A sink has an out-of-range value
    #[error("sink '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Name of the sink
        name: String,
        /// Field name
        field: &'static str,
        /// What went wrong
        message: &'static str,
    },

    /// No sinks configured
    #[error("no sinks configured - at least one sink is required")]
    NoSinks,
}

impl ConfigError {
    /// Create an UnknownSink error
    pub fn unknown_sink(pattern: impl Into<String>, sink: impl Into<String>) -> Self {
        Self::UnknownSink {
            pattern: pattern.into(),
            sink: sink.into(),
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        name: impl Into<String>,
        field: &'static str,
        message: &'static str,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            field,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sink_display() {
        let err = ConfigError::unknown_sink("error.*", "broker_main");
        assert!(err.to_string().contains("error.*"));
        assert!(err.to_string().contains("broker_main"));
    }

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::invalid_value("broker_main", "batch_size", "must be nonzero");
        assert!(err.to_string().contains("broker_main"));
        assert!(err.to_string().contains("batch_size"));
        assert!(err.to_string().contains("nonzero"));
    }

    #[test]
    fn test_no_sinks_display() {
        assert!(ConfigError::NoSinks.to_string().contains("no sinks"));
    }
}
