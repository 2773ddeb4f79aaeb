//! Routing map - ordered rules mapping key patterns to sink names
//!
//! The map is compiled once from configuration and never mutated afterwards.
//! Rule evaluation order is the configuration order, which makes routing
//! decisions deterministic and reload-idempotent.

use crate::error::{Result, RoutingError};
use crate::pattern::KeyPattern;

/// One routing rule: a key pattern and the sinks it targets
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// Match predicate over the routing key
    pattern: KeyPattern,

    /// Target sink names, in configuration order
    sinks: Vec<String>,
}

impl RouteRule {
    /// Get the rule's pattern
    #[inline]
    pub fn pattern(&self) -> &KeyPattern {
        &self.pattern
    }

    /// Get the rule's target sink names
    #[inline]
    pub fn sinks(&self) -> &[String] {
        &self.sinks
    }
}

/// Immutable, ordered routing map
///
/// # Evaluation
///
/// `targets()` walks the rules in order and unions the sink names of every
/// matching rule, deduplicated by first mention. A key matching no rule gets
/// an empty target list - the router counts that as a no-route event rather
/// than an error.
#[derive(Debug, Clone, Default)]
pub struct RoutingMap {
    rules: Vec<RouteRule>,
}

impl RoutingMap {
    /// Resolve the target sinks for a routing key
    ///
    /// Returns sink names in first-mention order, without duplicates.
    pub fn targets<'a>(&'a self, routing_key: &str) -> Vec<&'a str> {
        let mut targets: Vec<&str> = Vec::new();

        for rule in &self.rules {
            if !rule.pattern.matches(routing_key) {
                continue;
            }
            for sink in &rule.sinks {
                if !targets.contains(&sink.as_str()) {
                    targets.push(sink.as_str());
                }
            }
        }

        targets
    }

    /// Check whether any rule matches the given key
    pub fn has_route(&self, routing_key: &str) -> bool {
        self.rules.iter().any(|r| r.pattern.matches(routing_key))
    }

    /// Number of rules in the map
    #[inline]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Check if the map has no rules
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over the rules in evaluation order
    #[inline]
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// All sink names referenced by any rule, deduplicated
    ///
    /// Used by config validation to check every target exists.
    pub fn referenced_sinks(&self) -> Vec<&str> {
        let mut sinks: Vec<&str> = Vec::new();
        for rule in &self.rules {
            for sink in &rule.sinks {
                if !sinks.contains(&sink.as_str()) {
                    sinks.push(sink.as_str());
                }
            }
        }
        sinks
    }
}

/// Builder that validates rules as they are added
///
/// # Example
///
/// ```
/// use courier_routing::RoutingMapBuilder;
///
/// let mut builder = RoutingMapBuilder::new();
/// builder.add_rule("error.*", vec!["broker_main".into()]).unwrap();
/// let map = builder.build();
/// assert_eq!(map.rule_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RoutingMapBuilder {
    rules: Vec<RouteRule>,
}

impl RoutingMapBuilder {
    /// Create a new empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not parse or the sink list is
    /// empty. Rules keep insertion order.
    pub fn add_rule(&mut self, pattern: &str, sinks: Vec<String>) -> Result<&mut Self> {
        if sinks.is_empty() {
            return Err(RoutingError::empty_sinks(pattern));
        }

        let pattern = KeyPattern::parse(pattern)?;
        self.rules.push(RouteRule { pattern, sinks });
        Ok(self)
    }

    /// Number of rules added so far
    #[inline]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Freeze the builder into an immutable map
    #[must_use]
    pub fn build(self) -> RoutingMap {
        RoutingMap { rules: self.rules }
    }
}
