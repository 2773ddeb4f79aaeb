//! Courier - Protocol
//!
//! The `Message` type that flows through the pipeline, plus the serialization
//! seam used by network-facing sinks.
//!
//! # Design
//!
//! - `Message` is immutable after construction and cheap to share: the
//!   payload is a refcounted `bytes::Bytes`, and queues hold `Arc<Message>`
//!   so a message fanned out to several sinks is referenced, never copied.
//! - Serialization is a trait (`MessageSerde`) so each sink type picks its
//!   own wire encoding without the pipeline knowing about it.
//!
//! # Example
//!
//! ```
//! use courier_protocol::Message;
//!
//! let msg = Message::new("error.db", "connection refused");
//! assert_eq!(msg.routing_key(), "error.db");
//! assert_eq!(msg.payload().as_ref(), b"connection refused");
//! ```

mod codec;
mod error;
mod message;

pub use codec::{JsonSerde, MessageSerde, RawSerde};
pub use error::{ProtocolError, Result};
pub use message::Message;
