//! Contract registry — topic to contract descriptor mapping
//!
//! Built once at startup from the configured contract table and
//! immutable afterwards. Lookups by topic return `Option` so an
//! unregistered topic is a defined miss, not a fault.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ContractConfig;
use crate::error::{RelayError, Result};
use crate::types::Topic;

/// Identifies one contract the relay serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDescriptor {
    /// Topic scoping this contract's traffic
    pub topic: Topic,

    /// Human-readable contract name
    pub name: String,

    /// On-chain contract address
    pub address: String,

    /// Function selectors/signatures the relay will forward
    pub allowed_functions: BTreeSet<String>,
}

/// Ordered topic → contract mapping
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: BTreeMap<Topic, ContractDescriptor>,
}

impl ContractRegistry {
    /// Build the registry from configured contracts
    ///
    /// Duplicate topics are a configuration error: each topic owns
    /// exactly one contract.
    pub fn load(contracts: &[ContractConfig]) -> Result<Self> {
        let mut map = BTreeMap::new();

        for entry in contracts {
            let topic = Topic::new(&entry.topic);
            let descriptor = ContractDescriptor {
                topic: topic.clone(),
                name: entry.name.clone(),
                address: entry.address.clone(),
                allowed_functions: entry.allowed_functions.iter().cloned().collect(),
            };

            if map.insert(topic.clone(), descriptor).is_some() {
                return Err(RelayError::Config(format!(
                    "Duplicate contract topic '{}'",
                    topic
                )));
            }
        }

        Ok(Self { contracts: map })
    }

    /// Look up the contract for a topic
    pub fn get(&self, topic: &Topic) -> Option<&ContractDescriptor> {
        self.contracts.get(topic)
    }

    /// All registered topics, in order
    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.contracts.keys()
    }

    /// All registered descriptors, in topic order
    pub fn descriptors(&self) -> impl Iterator<Item = &ContractDescriptor> {
        self.contracts.values()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
