//! Courier - Pipeline
//!
//! The router that fans messages out to sink queues, the registry of live
//! sinks, and the hot-swap machinery that replaces either at runtime.
//!
//! # Architecture
//!
//! ```text
//! [Producers]          [Router]                         [Sinks]
//!    submit() ──→ RoutingMap snapshot ──→ offer ──→ [queue]──engine──→ broker
//!                 SinkRegistry snapshot      ├────→ [queue]──engine──→ file
//!                 (arc-swap, lock-free)      └────→ [queue]──engine──→ blackhole
//! ```
//!
//! # Key design
//!
//! - **Snapshot reads**: the routing map and sink registry are behind
//!   `ArcSwap`. The hot path loads a snapshot per message; a concurrent swap
//!   is invisible to in-flight calls - they see entirely old or entirely new
//!   state, never a mix.
//! - **Rebuild off to the side**: a reload parses and validates the new
//!   configuration, builds and opens the new topology, and only then swaps.
//!   Validation failure leaves the running topology untouched.
//! - **Independent shutdown**: sinks close concurrently, so total shutdown
//!   latency is bounded by the slowest sink, not the sum.

mod builder;
mod error;
mod metrics;
mod pipeline;
mod registry;
mod router;


pub use builder::{build_registry, build_routing_map};
pub use error::{PipelineError, Result};
pub use metrics::{BackpressureTracker, RouterMetrics, RouterStatsHandle};
pub use pipeline::Pipeline;
pub use registry::{SinkRegistry, SinkRuntime};
pub use router::Router;

// Re-export key types from dependencies for convenience
pub use courier_protocol::Message;
pub use courier_routing::{RoutingMap, RoutingMapBuilder};
