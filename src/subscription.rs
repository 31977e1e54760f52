//! Subscription fan-out
//!
//! For every topic in the registry the relay opens exactly two
//! subscriptions: a symmetric-key one on the shared availability
//! channel and a private-key one for targeted transaction requests.
//! Options are built fresh per subscription; a failure to open any
//! subscription propagates as a startup failure.

use crate::config::WhisperConfig;
use crate::error::Result;
use crate::provider::{ChannelKind, MessageStream, SubscribeOptions, WhisperProvider};
use crate::registry::ContractRegistry;
use crate::types::Topic;

/// Build the options for one subscription
pub fn subscription_options(
    topic: &Topic,
    channel: ChannelKind,
    whisper: &WhisperConfig,
) -> SubscribeOptions {
    SubscribeOptions {
        topic: topic.clone(),
        channel,
        ttl: whisper.ttl,
        min_pow: whisper.min_pow,
    }
}

/// Open both channels for every registered topic
///
/// Returns one stream per subscription (two per topic). Both
/// subscriptions for a topic exist before this returns.
pub async fn open_all(
    provider: &dyn WhisperProvider,
    registry: &ContractRegistry,
    key_id: &str,
    sym_key_id: &str,
    whisper: &WhisperConfig,
) -> Result<Vec<Box<dyn MessageStream>>> {
    let mut streams = Vec::with_capacity(registry.len() * 2);

    for descriptor in registry.descriptors() {
        tracing::info!(
            contract = %descriptor.name,
            topic = %descriptor.topic,
            allowed = ?descriptor.allowed_functions,
            "Listening on topic"
        );

        let public = subscription_options(
            &descriptor.topic,
            ChannelKind::Public {
                sym_key_id: sym_key_id.to_string(),
            },
            whisper,
        );
        streams.push(provider.subscribe(&public).await?);

        let private = subscription_options(
            &descriptor.topic,
            ChannelKind::Private {
                key_id: key_id.to_string(),
            },
            whisper,
        );
        streams.push(provider.subscribe(&private).await?);
    }

    Ok(streams)
}
