//! Core message types for the relay
//!
//! Wire-facing structs use camelCase JSON serialization to match the
//! payloads clients already send over Whisper.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport-level routing tag scoping a subscription to one contract
///
/// Topics are 1:1 with registered contracts and usually carry the
/// `0x`-prefixed 4-byte hex form Whisper expects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Action declared by an inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Gas-subsidized transaction request
    Transaction,
    /// Availability probe broadcast on the public channel
    Availability,
    /// Any action string the relay does not recognize
    Other(String),
}

impl Action {
    pub fn parse(s: &str) -> Self {
        match s {
            "transaction" => Action::Transaction,
            "availability" => Action::Availability,
            other => Action::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Transaction => f.write_str("transaction"),
            Action::Availability => f.write_str("availability"),
            Action::Other(s) => f.write_str(s),
        }
    }
}

/// A raw message delivered by a subscription
///
/// Ephemeral: lives only for the duration of one dispatch.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Sender's declared public key, if the message was signed
    pub sig: Option<String>,

    /// Topic the message arrived on
    pub topic: Topic,

    /// Raw payload bytes (JSON once decrypted by the transport)
    pub payload: Bytes,

    /// Unix timestamp in milliseconds
    pub timestamp: u64,
}

/// Structured view of an inbound payload
///
/// Fields outside the declared action stay unset. A decode failure
/// yields the all-unset default instead of an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRequest {
    /// Contract name declared by the client
    pub contract: Option<String>,

    /// Contract address declared by the client
    pub address: Option<String>,

    /// Declared action; `None` when the payload could not be decoded
    pub action: Option<Action>,

    /// `0x`-prefixed 4-byte function selector (transaction only)
    pub function_name: Option<String>,

    /// `0x`-prefixed encoded arguments (transaction only)
    pub function_parameters: Option<String>,

    /// Full encoded call as received (transaction only)
    pub payload: Option<String>,

    /// Token symbol offered for gas payment (availability only)
    pub token: Option<String>,

    /// Gas price offered (availability only)
    pub gas_price: Option<String>,
}

/// Outbound reply envelope
///
/// Serialized with 1-space indentation; `receipt` is always present,
/// null when the reply carries none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub message: String,
    pub receipt: Option<serde_json::Value>,
}

impl ReplyEnvelope {
    pub fn new(message: impl Into<String>, receipt: Option<serde_json::Value>) -> Self {
        Self {
            message: message.into(),
            receipt,
        }
    }

    /// Serialize to the wire form clients expect
    pub fn to_wire(&self) -> crate::error::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}

/// Current time in Unix milliseconds
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
