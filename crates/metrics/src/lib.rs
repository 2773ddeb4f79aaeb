//! Courier - Metrics
//!
//! Provider traits that let the router and every sink expose counter
//! snapshots, plus the reporter task that periodically renders them through
//! `tracing`. This is the pollable stat surface: snapshot reads are atomic
//! loads and never block a drain loop.
//!
//! # Design
//!
//! - Components keep their counters in atomics and hand out a cheap handle
//!   implementing a provider trait.
//! - The reporter collects handles at startup and logs one compact line per
//!   component per interval.
//! - Snapshots are plain `Copy` structs, so callers can also diff them over
//!   time or serialize them.

mod reporter;
mod traits;

pub use reporter::StatsReporter;
pub use traits::{
    RouterStatsProvider, RouterStatsSnapshot, SinkStatsProvider, SinkStatsSnapshot,
};
