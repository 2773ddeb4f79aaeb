//! Courier - Routing
//!
//! The routing map that decides which sinks receive each message.
//!
//! # Design
//!
//! Rules are compiled once from configuration and evaluated in order against
//! a message's routing key. A key may match zero, one, or several rules; the
//! matched sink names are unioned and deduplicated, so a message matching two
//! rules that name the same sink is delivered to that sink once.
//!
//! The map is immutable after build. Hot reconfiguration replaces the whole
//! map through an atomic pointer swap in the pipeline crate - readers always
//! see a complete snapshot, never a partially-updated rule list.
//!
//! # Example
//!
//! ```
//! use courier_routing::{RoutingMap, RoutingMapBuilder};
//!
//! let mut builder = RoutingMapBuilder::new();
//! builder.add_rule("error.*", vec!["broker_main".into()]).unwrap();
//! builder.add_rule("*", vec!["audit_file".into()]).unwrap();
//! let map = builder.build();
//!
//! // "error.db" matches both rules: union of their sinks
//! let targets = map.targets("error.db");
//! assert_eq!(targets, vec!["broker_main", "audit_file"]);
//!
//! // "app.request" only matches the catch-all
//! assert_eq!(map.targets("app.request"), vec!["audit_file"]);
//! ```

mod error;
mod map;
mod pattern;

#[cfg(test)]
mod map_test;

pub use error::{Result, RoutingError};
pub use map::{RouteRule, RoutingMap, RoutingMapBuilder};
pub use pattern::KeyPattern;
