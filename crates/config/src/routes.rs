//! Routing rule configuration
//!
//! Rules are listed in evaluation order. A message is delivered to the
//! union of all matching rules' sinks.
//!
//! ```toml
//! [[routes]]
//! pattern = "error.*"
//! sinks = ["broker_main"]
//!
//! [[routes]]
//! pattern = "*"
//! sinks = ["audit_file"]
//! ```

use serde::Deserialize;

/// One routing rule
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Routing key pattern: exact key, trailing-`*` prefix, or `*`
    pub pattern: String,

    /// Target sink names
    pub sinks: Vec<String>,
}
