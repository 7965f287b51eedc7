//! Error types for message encoding and decoding.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while converting between typed messages and wire JSON.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A client message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A server message could not be parsed.
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}
