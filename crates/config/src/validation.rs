//! Configuration validation
//!
//! Runs after parsing, before the configuration is handed to the pipeline.
//! A reload that fails here never reaches the running topology.

use courier_routing::KeyPattern;

use crate::error::{ConfigError, Result};
use crate::Config;

/// Validate cross-references and value ranges
///
/// Checks, in order:
/// - at least one sink is configured
/// - sink tuning values are in range (nonzero capacity and batch size,
///   batch size not exceeding capacity)
/// - broker endpoints are non-empty
/// - every route pattern parses and names at least one sink
/// - every route target names a configured sink
pub fn validate_config(config: &Config) -> Result<()> {
    if config.sinks.is_empty() {
        return Err(ConfigError::NoSinks);
    }

    for (name, sink) in &config.sinks {
        if sink.tuning.queue_capacity == 0 {
            return Err(ConfigError::invalid_value(
                name,
                "queue_capacity",
                "must be nonzero",
            ));
        }
        if sink.tuning.batch_size == 0 {
            return Err(ConfigError::invalid_value(
                name,
                "batch_size",
                "must be nonzero",
            ));
        }
        if sink.tuning.batch_size > sink.tuning.queue_capacity {
            return Err(ConfigError::invalid_value(
                name,
                "batch_size",
                "must not exceed queue_capacity",
            ));
        }

        if let crate::SinkKind::Broker { endpoint, .. } = &sink.kind {
            if endpoint.is_empty() {
                return Err(ConfigError::invalid_value(
                    name,
                    "endpoint",
                    "must not be empty",
                ));
            }
        }
    }

    for route in &config.routes {
        KeyPattern::parse(&route.pattern)?;

        if route.sinks.is_empty() {
            return Err(courier_routing::RoutingError::empty_sinks(&route.pattern).into());
        }

        for sink in &route.sinks {
            if !config.sinks.contains_key(sink) {
                return Err(ConfigError::unknown_sink(&route.pattern, sink));
            }
        }
    }

    Ok(())
}
