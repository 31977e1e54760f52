//! Relay configuration
//!
//! Loaded once at startup from a TOML file and treated as static
//! afterwards. Every subsystem reads its parameters from here: node
//! endpoint, relayer account, Whisper envelope options, and the
//! contract table the registry is built from.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RelayError, Result};

/// Top-level relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub node: NodeConfig,
    pub account: AccountConfig,
    pub whisper: WhisperConfig,
    #[serde(default)]
    pub contracts: Vec<ContractConfig>,
}

/// Blockchain node endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Transport scheme (default: http)
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Node host (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Node RPC port (default: 8545)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Message filter poll interval in milliseconds (default: 1000)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl NodeConfig {
    /// Full endpoint URL, e.g. `http://127.0.0.1:8545`
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Relayer account and funding threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Relayer account address that pays gas on behalf of clients
    pub address: String,

    /// Minimum balance in wei, as a decimal string
    ///
    /// Balances at or below this value halt the relay.
    #[serde(default = "default_minimum_balance")]
    pub minimum_balance: String,
}

impl AccountConfig {
    /// Parse the configured minimum balance into an exact integer
    pub fn min_balance(&self) -> Result<U256> {
        U256::from_dec_str(&self.minimum_balance).map_err(|e| {
            RelayError::Config(format!(
                "Invalid minimum_balance '{}': {:?}",
                self.minimum_balance, e
            ))
        })
    }
}

/// Whisper envelope parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    /// Envelope time-to-live in seconds (default: 10)
    #[serde(default = "default_ttl")]
    pub ttl: u64,

    /// Minimum proof-of-work accepted on subscriptions and targeted
    /// on outbound envelopes (default: 0.002)
    #[serde(default = "default_min_pow")]
    pub min_pow: f64,

    /// Seconds to spend on outbound proof-of-work (default: 3)
    #[serde(default = "default_pow_time")]
    pub pow_time: u64,

    /// Shared symmetric key material (`0x`-prefixed 32-byte hex) for
    /// the public availability channel
    pub sym_key: String,
}

/// One registered contract the relay serves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    pub name: String,
    pub address: String,
    pub topic: String,
    #[serde(default)]
    pub allowed_functions: Vec<String>,
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8545
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_minimum_balance() -> String {
    "100000".to_string()
}

fn default_ttl() -> u64 {
    10
}

fn default_min_pow() -> f64 {
    0.002
}

fn default_pow_time() -> u64 {
    3
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            RelayError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [node]
        host = "10.1.0.5"
        port = 8546

        [account]
        address = "0x5566d8e5bcd7a4d6f151ca5d2ebacbb6fcce4b21"
        minimum_balance = "250000"

        [whisper]
        sym_key = "0x0102030405060708010203040506070801020304050607080102030405060708"

        [[contracts]]
        name = "IdentityGasRelay"
        address = "0xeab768e4c4b5a871878a0d43bd6419ff0d54f541"
        topic = "0x4964656e"
        allowed_functions = ["approveAndCallGasRelayed(address,address,uint256,bytes,uint256,uint256,address)"]

        [[contracts]]
        name = "SNTController"
        address = "0xd41dee5e1cea979e1703bcf58d8a2b32f9c3a550"
        topic = "0x534e5443"
    "#;

    #[test]
    fn test_parse_sample() {
        let config: RelayConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.node.endpoint_url(), "http://10.1.0.5:8546");
        assert_eq!(config.account.min_balance().unwrap(), U256::from(250_000u64));
        assert_eq!(config.whisper.ttl, 10);
        assert_eq!(config.whisper.pow_time, 3);
        assert_eq!(config.contracts.len(), 2);
        assert_eq!(config.contracts[0].name, "IdentityGasRelay");
        assert_eq!(config.contracts[0].allowed_functions.len(), 1);
        assert!(config.contracts[1].allowed_functions.is_empty());
    }

    #[test]
    fn test_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [node]
            [account]
            address = "0xabc"
            [whisper]
            sym_key = "0x00"
            "#,
        )
        .unwrap();

        assert_eq!(config.node.endpoint_url(), "http://127.0.0.1:8545");
        assert_eq!(config.node.poll_interval_ms, 1000);
        assert_eq!(config.account.minimum_balance, "100000");
        assert_eq!(config.account.min_balance().unwrap(), U256::from(100_000u64));
        assert!(config.contracts.is_empty());
    }

    #[test]
    fn test_invalid_minimum_balance() {
        let account = AccountConfig {
            address: "0xabc".to_string(),
            minimum_balance: "not-a-number".to_string(),
        };
        assert!(account.min_balance().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = RelayConfig::load(&path).unwrap();
        assert_eq!(config.contracts.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = RelayConfig::load("/nonexistent/relay.toml");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }
}
