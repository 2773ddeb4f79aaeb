//! Routing error types

use thiserror::Error;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors that can occur during routing map construction
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Pattern string could not be parsed
    #[error("invalid routing pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Rule has an empty target sink list
    #[error("route '{pattern}' has no target sinks")]
    EmptySinks {
        /// Pattern of the offending rule
        pattern: String,
    },
}

impl RoutingError {
    /// Create an InvalidPattern error
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason,
        }
    }

    /// Create an EmptySinks error
    #[inline]
    pub fn empty_sinks(pattern: impl Into<String>) -> Self {
        Self::EmptySinks {
            pattern: pattern.into(),
        }
    }
}
