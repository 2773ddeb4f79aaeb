//! Message - the unit of data flowing through the pipeline
//!
//! A message is created once at the ingestion boundary and then referenced
//! (via `Arc`) by every sink queue it is routed to.

use std::fmt;
use std::time::SystemTime;

use bytes::Bytes;

/// Immutable message with a routing key and an opaque payload
///
/// # Design
///
/// - `payload` uses `bytes::Bytes`, which is reference-counted; cloning a
///   `Message` does not copy payload bytes.
/// - Immutable after construction, so it is safe to read concurrently from
///   multiple sink tasks without synchronization.
///
/// # Example
///
/// ```
/// use courier_protocol::Message;
///
/// let msg = Message::new("app.request", "GET /healthz");
/// assert_eq!(msg.routing_key(), "app.request");
/// assert_eq!(msg.len(), 12);
/// ```
#[derive(Debug, Clone)]
pub struct Message {
    /// Routing key used for route matching
    routing_key: String,

    /// Opaque payload - zero-copy via Bytes
    payload: Bytes,

    /// Creation time, stamped at the ingestion boundary
    timestamp: SystemTime,
}

impl Message {
    /// Create a new message stamped with the current time
    pub fn new(routing_key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload: payload.into(),
            timestamp: SystemTime::now(),
        }
    }

    /// Create a message with an explicit timestamp
    ///
    /// Used when the ingestion boundary carries an upstream-assigned time.
    pub fn with_timestamp(
        routing_key: impl Into<String>,
        payload: impl Into<Bytes>,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload: payload.into(),
            timestamp,
        }
    }

    /// Get the routing key
    #[inline]
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Get the payload
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Get the creation timestamp
    #[inline]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Payload length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} bytes)", self.routing_key, self.payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_new_message() {
        let msg = Message::new("error.db", "boom");
        assert_eq!(msg.routing_key(), "error.db");
        assert_eq!(msg.payload().as_ref(), b"boom");
        assert_eq!(msg.len(), 4);
        assert!(!msg.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let msg = Message::new("heartbeat", Bytes::new());
        assert!(msg.is_empty());
        assert_eq!(msg.len(), 0);
    }

    #[test]
    fn test_with_timestamp() {
        let ts = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let msg = Message::with_timestamp("audit", "entry", ts);
        assert_eq!(msg.timestamp(), ts);
    }

    #[test]
    fn test_clone_shares_payload() {
        let payload = Bytes::from(vec![0u8; 1024]);
        let msg = Message::new("bulk", payload.clone());
        let copy = msg.clone();

        // Bytes clones share the underlying buffer
        assert_eq!(copy.payload().as_ptr(), msg.payload().as_ptr());
    }

    #[test]
    fn test_display() {
        let msg = Message::new("error.db", "boom");
        assert_eq!(msg.to_string(), "error.db(4 bytes)");
    }
}
