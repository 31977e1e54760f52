//! Whisper provider trait — the transport abstraction the relay runs on
//!
//! Backends (a JSON-RPC node, the in-memory loopback for tests)
//! implement `WhisperProvider` for a uniform API over node liveness,
//! balance queries, key material, subscriptions, and publishing.

use async_trait::async_trait;
use primitive_types::U256;

use crate::error::Result;
use crate::types::{IncomingMessage, Topic};

pub mod memory;
pub mod rpc;

/// Which key material a subscription is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    /// Shared symmetric key — broadcast availability probes
    Public { sym_key_id: String },

    /// Relay's own key pair — targeted transaction requests
    Private { key_id: String },
}

/// Immutable per-subscription configuration
///
/// Constructed fresh for every subscription; never shared or mutated
/// across registrations.
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    pub topic: Topic,
    pub channel: ChannelKind,
    pub ttl: u64,
    pub min_pow: f64,
}

/// An outbound envelope addressed to one recipient
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Recipient public key
    pub pub_key: String,

    /// Relay key pair id used to sign the envelope
    pub sig: String,

    /// Topic to publish on
    pub topic: Topic,

    /// Envelope time-to-live in seconds
    pub ttl: u64,

    /// Proof-of-work target
    pub pow_target: f64,

    /// Seconds to spend on proof-of-work
    pub pow_time: u64,

    /// Serialized payload
    pub payload: Vec<u8>,
}

/// Core trait for relay transports
#[async_trait]
pub trait WhisperProvider: Send + Sync {
    /// Probe node liveness
    async fn is_listening(&self) -> Result<bool>;

    /// Current balance of an account, in wei
    async fn balance(&self, account: &str) -> Result<U256>;

    /// Generate a fresh key pair, returning its id
    async fn new_key_pair(&self) -> Result<String>;

    /// Register shared symmetric key material, returning its id
    async fn add_sym_key(&self, material: &str) -> Result<String>;

    /// Public key for a key pair id
    async fn public_key(&self, key_id: &str) -> Result<String>;

    /// Open a subscription scoped to one topic and one channel
    async fn subscribe(&self, options: &SubscribeOptions) -> Result<Box<dyn MessageStream>>;

    /// Publish an envelope
    async fn post(&self, message: &OutgoingMessage) -> Result<()>;

    /// Tear down every active subscription
    async fn clear_subscriptions(&self) -> Result<()>;

    /// Provider name (e.g. "rpc", "memory")
    fn name(&self) -> &str;
}

/// Async handle for receiving messages from one subscription
///
/// `Ok(None)` means the subscription has been torn down.
#[async_trait]
pub trait MessageStream: Send + Sync {
    async fn next(&mut self) -> Result<Option<IncomingMessage>>;
}
