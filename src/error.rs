//! Error types for gas-relay

use thiserror::Error;

/// Errors that can occur in the relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Node connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// JSON-RPC transport or protocol error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Publish failure
    #[error("Failed to publish on topic '{topic}': {reason}")]
    Publish { topic: String, reason: String },

    /// Subscribe failure
    #[error("Failed to subscribe to topic '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Inbound payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key pair or symmetric key management error
    #[error("Key error: {0}")]
    Key(String),

    /// Payload sealing/opening failure
    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
