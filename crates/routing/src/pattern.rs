//! Routing key patterns
//!
//! Three pattern forms cover the routing configurations seen in practice:
//! exact keys, prefix wildcards ("error.*"), and the catch-all "*".

use std::fmt;

use crate::error::{Result, RoutingError};

/// A match predicate over routing keys
///
/// Parsed from the pattern string in routing configuration:
///
/// | Pattern     | Form     | Matches                          |
/// |-------------|----------|----------------------------------|
/// | `*`         | All      | every key                        |
/// | `error.*`   | Prefix   | keys starting with `error.`      |
/// | `error.db`  | Exact    | exactly `error.db`               |
///
/// A trailing `*` always means prefix; `*` anywhere else is rejected at
/// parse time so a typo fails config validation instead of silently never
/// matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    /// Matches every routing key
    All,

    /// Matches keys that start with the given prefix
    Prefix(String),

    /// Matches one key exactly
    Exact(String),
}

impl KeyPattern {
    /// Parse a pattern string from configuration
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::InvalidPattern` for an empty pattern or a `*`
    /// in a non-trailing position.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(RoutingError::invalid_pattern(pattern, "pattern is empty"));
        }

        if pattern == "*" {
            return Ok(Self::All);
        }

        match pattern.find('*') {
            None => Ok(Self::Exact(pattern.to_string())),
            Some(pos) if pos == pattern.len() - 1 => {
                Ok(Self::Prefix(pattern[..pos].to_string()))
            }
            Some(_) => Err(RoutingError::invalid_pattern(
                pattern,
                "'*' is only allowed as the final character",
            )),
        }
    }

    /// Check whether a routing key matches this pattern
    #[inline]
    pub fn matches(&self, routing_key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Prefix(prefix) => routing_key.starts_with(prefix),
            Self::Exact(key) => routing_key == key,
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
            Self::Exact(key) => write!(f, "{key}"),
        }
    }
}
