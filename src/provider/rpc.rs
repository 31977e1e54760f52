//! JSON-RPC Whisper provider — talks to a node over HTTP
//!
//! Subscriptions are Whisper message filters polled on a fixed
//! interval; each filter gets its own polling task feeding a channel.
//! Filter ids and task handles are tracked so `clear_subscriptions`
//! can tear everything down.

use async_trait::async_trait;
use bytes::Bytes;
use primitive_types::U256;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::{ChannelKind, MessageStream, OutgoingMessage, SubscribeOptions, WhisperProvider};
use crate::config::NodeConfig;
use crate::error::{RelayError, Result};
use crate::types::{IncomingMessage, Topic};

/// Minimal JSON-RPC 2.0 client
#[derive(Clone)]
struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcClient {
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RelayError::Connection(format!("{}: {}", self.url, e))
                } else {
                    RelayError::Rpc(format!("{}: {}", method, e))
                }
            })?;

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RelayError::Rpc(format!("{}: invalid response: {}", method, e)))?;

        if let Some(err) = body.error {
            return Err(RelayError::Rpc(format!(
                "{} failed: {} ({})",
                method, err.message, err.code
            )));
        }

        body.result
            .ok_or_else(|| RelayError::Rpc(format!("{}: missing result", method)))
    }
}

/// Whisper message as returned by `shh_getFilterMessages`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(default)]
    sig: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    payload: String,
    /// Node-reported timestamp in seconds
    #[serde(default)]
    timestamp: u64,
}

impl WireMessage {
    fn into_incoming(self, fallback_topic: &Topic) -> Result<IncomingMessage> {
        let stripped = self.payload.strip_prefix("0x").unwrap_or(&self.payload);
        let payload = hex::decode(stripped)
            .map_err(|e| RelayError::Decode(format!("Invalid payload hex: {}", e)))?;

        Ok(IncomingMessage {
            sig: self.sig,
            topic: self
                .topic
                .map(Topic::new)
                .unwrap_or_else(|| fallback_topic.clone()),
            payload: Bytes::from(payload),
            timestamp: self.timestamp * 1000,
        })
    }
}

struct FilterHandle {
    filter_id: String,
    task: JoinHandle<()>,
}

/// JSON-RPC node provider
pub struct RpcProvider {
    client: RpcClient,
    poll_interval: Duration,
    filters: Mutex<Vec<FilterHandle>>,
}

impl RpcProvider {
    /// Create a provider for the configured node endpoint
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            client: RpcClient {
                http: reqwest::Client::new(),
                url: config.endpoint_url(),
                next_id: Arc::new(AtomicU64::new(1)),
            },
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            filters: Mutex::new(Vec::new()),
        }
    }

    /// The endpoint this provider talks to
    pub fn endpoint(&self) -> &str {
        &self.client.url
    }
}

#[async_trait]
impl WhisperProvider for RpcProvider {
    async fn is_listening(&self) -> Result<bool> {
        self.client.call("net_listening", serde_json::json!([])).await
    }

    async fn balance(&self, account: &str) -> Result<U256> {
        let quantity: String = self
            .client
            .call("eth_getBalance", serde_json::json!([account, "latest"]))
            .await?;
        parse_quantity(&quantity)
    }

    async fn new_key_pair(&self) -> Result<String> {
        self.client.call("shh_newKeyPair", serde_json::json!([])).await
    }

    async fn add_sym_key(&self, material: &str) -> Result<String> {
        self.client
            .call("shh_addSymKey", serde_json::json!([material]))
            .await
    }

    async fn public_key(&self, key_id: &str) -> Result<String> {
        self.client
            .call("shh_getPublicKey", serde_json::json!([key_id]))
            .await
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<Box<dyn MessageStream>> {
        let mut criteria = serde_json::json!({
            "topics": [options.topic.as_str()],
            "minPow": options.min_pow,
        });
        match &options.channel {
            ChannelKind::Public { sym_key_id } => {
                criteria["symKeyID"] = serde_json::json!(sym_key_id);
            }
            ChannelKind::Private { key_id } => {
                criteria["privateKeyID"] = serde_json::json!(key_id);
            }
        }

        let filter_id: String = self
            .client
            .call("shh_newMessageFilter", serde_json::json!([criteria]))
            .await
            .map_err(|e| RelayError::Subscribe {
                topic: options.topic.to_string(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let poll_filter = filter_id.clone();
        let topic = options.topic.clone();
        let interval = self.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    return;
                }

                match client
                    .call::<Vec<WireMessage>>(
                        "shh_getFilterMessages",
                        serde_json::json!([poll_filter]),
                    )
                    .await
                {
                    Ok(messages) => {
                        for wire in messages {
                            match wire.into_incoming(&topic) {
                                Ok(message) => {
                                    if tx.send(message).is_err() {
                                        return;
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(%topic, error = %e, "Dropping unreadable envelope");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(filter = %poll_filter, error = %e, "Filter poll failed");
                    }
                }
            }
        });

        self.filters.lock().await.push(FilterHandle { filter_id, task });

        tracing::info!(
            topic = %options.topic,
            channel = ?options.channel,
            "Subscription created"
        );

        Ok(Box::new(RpcSubscription { rx }))
    }

    async fn post(&self, message: &OutgoingMessage) -> Result<()> {
        let envelope = serde_json::json!({
            "pubKey": message.pub_key,
            "sig": message.sig,
            "ttl": message.ttl,
            "powTarget": message.pow_target,
            "powTime": message.pow_time,
            "topic": message.topic.as_str(),
            "payload": format!("0x{}", hex::encode(&message.payload)),
        });

        let _accepted: bool = self
            .client
            .call("shh_post", serde_json::json!([envelope]))
            .await
            .map_err(|e| RelayError::Publish {
                topic: message.topic.to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    async fn clear_subscriptions(&self) -> Result<()> {
        let handles: Vec<FilterHandle> = self.filters.lock().await.drain(..).collect();
        for handle in handles {
            handle.task.abort();
            if let Err(e) = self
                .client
                .call::<bool>(
                    "shh_deleteMessageFilter",
                    serde_json::json!([handle.filter_id]),
                )
                .await
            {
                tracing::warn!(filter = %handle.filter_id, error = %e, "Failed to delete message filter");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "rpc"
    }
}

/// Subscription handle fed by a filter polling task
pub struct RpcSubscription {
    rx: mpsc::UnboundedReceiver<IncomingMessage>,
}

#[async_trait]
impl MessageStream for RpcSubscription {
    async fn next(&mut self) -> Result<Option<IncomingMessage>> {
        Ok(self.rx.recv().await)
    }
}

/// Parse a `0x`-prefixed hex quantity into an exact integer
fn parse_quantity(quantity: &str) -> Result<U256> {
    let stripped = quantity.strip_prefix("0x").unwrap_or(quantity);
    U256::from_str_radix(stripped, 16)
        .map_err(|e| RelayError::Rpc(format!("Invalid quantity '{}': {}", quantity, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x186a0").unwrap(), U256::from(100_000u64));
        assert_eq!(parse_quantity("0x0").unwrap(), U256::zero());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_rpc_request_shape() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "eth_getBalance",
            params: serde_json::json!(["0xabc", "latest"]),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 7);
        assert_eq!(json["method"], "eth_getBalance");
        assert_eq!(json["params"][1], "latest");
    }

    #[test]
    fn test_rpc_response_error() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#;
        let response: RpcResponse<bool> = serde_json::from_str(body).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn test_wire_message_mapping() {
        let wire: WireMessage = serde_json::from_str(
            r#"{"sig":"0xsender","topic":"0x4964656e","payload":"0x7b7d","timestamp":1700000000}"#,
        )
        .unwrap();

        let message = wire.into_incoming(&Topic::new("0xfallback")).unwrap();
        assert_eq!(message.sig.as_deref(), Some("0xsender"));
        assert_eq!(message.topic.as_str(), "0x4964656e");
        assert_eq!(&message.payload[..], b"{}");
        assert_eq!(message.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_wire_message_fallback_topic_and_bad_hex() {
        let wire: WireMessage =
            serde_json::from_str(r#"{"payload":"0x7b7d"}"#).unwrap();
        let message = wire.into_incoming(&Topic::new("0x01020304")).unwrap();
        assert_eq!(message.topic.as_str(), "0x01020304");
        assert!(message.sig.is_none());

        let bad: WireMessage = serde_json::from_str(r#"{"payload":"0xzz"}"#).unwrap();
        assert!(bad.into_incoming(&Topic::new("0x01020304")).is_err());
    }
}
