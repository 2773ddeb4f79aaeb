//! Wire encoding for messages
//!
//! Network-facing sinks hand each message to a `MessageSerde` to produce the
//! byte payload that actually goes on the wire. The routing key travels next
//! to the payload (broker record key), so codecs only encode the body.

use std::time::UNIX_EPOCH;

use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;
use crate::message::Message;

/// Converts a message into a transport-ready byte payload
///
/// Implementations must be cheap to call per message and must not perform
/// I/O. The same serde instance is reused for every message a sink writes.
pub trait MessageSerde: Send + Sync {
    /// Encode one message body
    fn serialize(&self, msg: &Message) -> Result<Bytes>;

    /// Codec name, for logs and config round-trips
    fn name(&self) -> &'static str;
}

/// Passes the payload through untouched
///
/// The default for broker sinks whose consumers expect raw bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSerde;

impl MessageSerde for RawSerde {
    #[inline]
    fn serialize(&self, msg: &Message) -> Result<Bytes> {
        // Bytes clone is a refcount bump, not a copy
        Ok(msg.payload().clone())
    }

    fn name(&self) -> &'static str {
        "raw"
    }
}

/// Wraps the message in a JSON envelope
///
/// Produces `{"routing_key": ..., "timestamp_ms": ..., "payload": ...}`.
/// Non-UTF-8 payloads are carried with lossy conversion; the routing key and
/// timestamp always survive intact.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerde;

#[derive(Serialize)]
struct JsonEnvelope<'a> {
    routing_key: &'a str,
    timestamp_ms: u64,
    payload: &'a str,
}

impl MessageSerde for JsonSerde {
    fn serialize(&self, msg: &Message) -> Result<Bytes> {
        let timestamp_ms = msg
            .timestamp()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let payload = String::from_utf8_lossy(msg.payload());
        let envelope = JsonEnvelope {
            routing_key: msg.routing_key(),
            timestamp_ms,
            payload: &payload,
        };

        let encoded = serde_json::to_vec(&envelope)?;
        Ok(Bytes::from(encoded))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_serde_passthrough() {
        let msg = Message::new("a.b", "hello");
        let out = RawSerde.serialize(&msg).unwrap();
        assert_eq!(out.as_ref(), b"hello");
        assert_eq!(RawSerde.name(), "raw");
    }

    #[test]
    fn test_raw_serde_zero_copy() {
        let msg = Message::new("a.b", Bytes::from_static(b"shared"));
        let out = RawSerde.serialize(&msg).unwrap();
        assert_eq!(out.as_ptr(), msg.payload().as_ptr());
    }

    #[test]
    fn test_json_serde_envelope() {
        let msg = Message::new("error.db", "boom");
        let out = JsonSerde.serialize(&msg).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["routing_key"], "error.db");
        assert_eq!(value["payload"], "boom");
        assert!(value["timestamp_ms"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_json_serde_non_utf8_payload() {
        let msg = Message::new("bin", Bytes::from(vec![0xff, 0xfe, b'x']));
        let out = JsonSerde.serialize(&msg).unwrap();

        // Lossy conversion still yields valid JSON
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["routing_key"], "bin");
    }
}
