//! Reply channel — answer a message on its original topic
//!
//! Derived per incoming message and handed to the dispatcher and
//! executor. Delivery is best-effort: a message without a sender key
//! is silently unanswerable, and publish failures are logged and
//! dropped.

use std::sync::Arc;

use crate::config::WhisperConfig;
use crate::provider::{OutgoingMessage, WhisperProvider};
use crate::types::{IncomingMessage, ReplyEnvelope, Topic};

/// Everything needed to answer one message
pub struct ReplyChannel {
    provider: Arc<dyn WhisperProvider>,
    recipient: Option<String>,
    key_id: String,
    topic: Topic,
    ttl: u64,
    pow_target: f64,
    pow_time: u64,
}

impl ReplyChannel {
    pub fn new(
        provider: Arc<dyn WhisperProvider>,
        message: &IncomingMessage,
        key_id: &str,
        whisper: &WhisperConfig,
    ) -> Self {
        Self {
            provider,
            recipient: message.sig.clone(),
            key_id: key_id.to_string(),
            topic: message.topic.clone(),
            ttl: whisper.ttl,
            pow_target: whisper.min_pow,
            pow_time: whisper.pow_time,
        }
    }

    /// Whether the original sender attached a public key
    pub fn can_reply(&self) -> bool {
        self.recipient.is_some()
    }

    /// Publish a reply envelope to the original sender
    ///
    /// No-op when the sender's public key is unknown.
    pub async fn reply(&self, text: &str, receipt: Option<serde_json::Value>) {
        let Some(recipient) = &self.recipient else {
            return;
        };

        tracing::info!(topic = %self.topic, reply = %text, "Sending reply");

        let envelope = ReplyEnvelope::new(text, receipt);
        let payload = match envelope.to_wire() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(topic = %self.topic, error = %e, "Failed to serialize reply");
                return;
            }
        };

        let message = OutgoingMessage {
            pub_key: recipient.clone(),
            sig: self.key_id.clone(),
            topic: self.topic.clone(),
            ttl: self.ttl,
            pow_target: self.pow_target,
            pow_time: self.pow_time,
            payload,
        };

        if let Err(e) = self.provider.post(&message).await {
            tracing::error!(topic = %self.topic, error = %e, "Failed to publish reply");
        }
    }
}
