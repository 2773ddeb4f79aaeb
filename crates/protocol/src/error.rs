//! Protocol error types

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur when encoding messages for the wire
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON encoding failed
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is not valid for the chosen encoding
    #[error("payload rejected by '{codec}' encoding: {reason}")]
    InvalidPayload {
        /// Codec that rejected the payload
        codec: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl ProtocolError {
    /// Create an InvalidPayload error
    pub fn invalid_payload(codec: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            codec,
            reason: reason.into(),
        }
    }
}
