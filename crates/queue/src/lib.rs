//! Courier - Queue
//!
//! The bounded per-sink buffer between the router and a sink's drain loop.
//!
//! # Design
//!
//! Each sink owns exactly one `MessageQueue`. The router offers messages on
//! one side; the sink's engine polls batches, delivers them, and commits on
//! the other. Entries handed to the engine stay in an in-flight region and
//! keep counting against capacity until committed, so memory is bounded at
//! the configured capacity end to end.
//!
//! A batch that fails delivery can be rolled back: in-flight entries return
//! to the front of the pending region, preserving FIFO order for the next
//! poll.
//!
//! ```text
//! [Router] --offer--> [pending | in-flight] --poll_batch--> [Engine]
//!                          ^________________commit/rollback______|
//! ```
//!
//! Overflow behavior is a configuration dimension, not a hard-coded choice:
//! block with a timeout (default), fail fast, or drop the oldest entry.

mod queue;


pub use queue::{MessageQueue, OverflowPolicy, QueueConfig, QueueError, QueueStats};

/// Result type for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;
