//! Network resolution. Maps the connected chain id to its static configuration.
//!
//! Every monitor is scoped by a `ChainConfig`: the contract addresses and
//! numeric parameters that differ between deployments. The table is supplied
//! at startup; `NetworkManager::initialize` asks the provider for the chain id
//! once and pins the matching entry for the rest of the process.
//!
//! An unknown chain is fatal. Monitors are never built against a guessed
//! configuration.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tokio::sync::OnceCell;

use chainwatch_common::error::{MonitorError, Result};

/// Per-chain constants used by monitors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Human-readable network name, used in logs.
    pub name: String,
    addresses: HashMap<String, Address>,
    params: HashMap<String, U256>,
}

impl ChainConfig {
    pub fn new(chain_id: u64, name: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
            addresses: HashMap::new(),
            params: HashMap::new(),
        }
    }

    pub fn with_address(mut self, contract: impl Into<String>, address: Address) -> Self {
        self.addresses.insert(contract.into(), address);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: U256) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn address(&self, contract: &str) -> Option<Address> {
        self.addresses.get(contract).copied()
    }

    pub fn param(&self, name: &str) -> Option<U256> {
        self.params.get(name).copied()
    }

    /// Like `address`, but a missing entry is a configuration error.
    pub fn require_address(&self, contract: &str) -> Result<Address> {
        self.address(contract).ok_or_else(|| {
            MonitorError::Config(format!(
                "contract `{contract}` is not configured on {} ({})",
                self.name, self.chain_id
            ))
        })
    }

    /// Like `param`, but a missing entry is a configuration error.
    pub fn require_param(&self, name: &str) -> Result<U256> {
        self.param(name).ok_or_else(|| {
            MonitorError::Config(format!(
                "parameter `{name}` is not configured on {} ({})",
                self.name, self.chain_id
            ))
        })
    }
}

/// Source of the connected chain's id.
#[async_trait]
pub trait ChainIdProvider: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;
}

/// Resolves and pins the configuration for the connected chain.
pub struct NetworkManager {
    table: HashMap<u64, Arc<ChainConfig>>,
    current: OnceCell<Arc<ChainConfig>>,
}

impl NetworkManager {
    pub fn new(table: impl IntoIterator<Item = ChainConfig>) -> Self {
        Self {
            table: table
                .into_iter()
                .map(|config| (config.chain_id, Arc::new(config)))
                .collect(),
            current: OnceCell::new(),
        }
    }

    /// Look up a chain in the static table.
    pub fn resolve(&self, chain_id: u64) -> Result<Arc<ChainConfig>> {
        match self.table.get(&chain_id) {
            Some(config) => Ok(config.clone()),
            None => {
                tracing::error!(
                    chain_id,
                    supported = ?self.supported_chains(),
                    "Unknown chain — refusing to evaluate transactions"
                );
                Err(MonitorError::UnknownChain(chain_id))
            }
        }
    }

    /// Query the chain id and pin its configuration.
    ///
    /// After the first success the pinned configuration is returned without
    /// querying the provider again. A failure (provider error or unknown
    /// chain) pins nothing.
    pub async fn initialize(&self, provider: &dyn ChainIdProvider) -> Result<Arc<ChainConfig>> {
        self.current
            .get_or_try_init(|| async {
                let chain_id = provider.chain_id().await?;
                let config = self.resolve(chain_id)?;
                tracing::info!(
                    chain_id,
                    network = %config.name,
                    "Network configuration resolved"
                );
                Ok(config)
            })
            .await
            .cloned()
    }

    /// The pinned configuration, if `initialize` has succeeded.
    pub fn current(&self) -> Result<Arc<ChainConfig>> {
        self.current.get().cloned().ok_or(MonitorError::NotInitialized)
    }

    pub fn supported_chains(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.table.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedChain {
        id: u64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainIdProvider for FixedChain {
        async fn chain_id(&self) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.id)
        }
    }

    fn table() -> Vec<ChainConfig> {
        vec![
            ChainConfig::new(56, "bsc").with_address("masterChef", Address::repeat_byte(0x56)),
            ChainConfig::new(97, "bsc-testnet")
                .with_address("masterChef", Address::repeat_byte(0x97))
                .with_param("threshold", U256::from(10)),
        ]
    }

    #[tokio::test]
    async fn test_initialize_queries_chain_id_once() {
        let manager = NetworkManager::new(table());
        let provider = FixedChain {
            id: 97,
            calls: AtomicUsize::new(0),
        };

        let first = manager.initialize(&provider).await.unwrap();
        let second = manager.initialize(&provider).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.address("masterChef"), Some(Address::repeat_byte(0x97)));
        assert_eq!(first.param("threshold"), Some(U256::from(10)));
        assert_eq!(manager.current().unwrap().chain_id, 97);
    }

    #[tokio::test]
    async fn test_unknown_chain_fails_and_pins_nothing() {
        let manager = NetworkManager::new(table());
        let provider = FixedChain {
            id: 1,
            calls: AtomicUsize::new(0),
        };

        let err = manager.initialize(&provider).await.unwrap_err();
        assert!(matches!(err, MonitorError::UnknownChain(1)));
        assert!(matches!(manager.current(), Err(MonitorError::NotInitialized)));
    }

    #[test]
    fn test_resolve_and_require() {
        let manager = NetworkManager::new(table());
        let bsc = manager.resolve(56).unwrap();
        assert!(bsc.require_address("masterChef").is_ok());
        assert!(matches!(bsc.require_param("threshold"), Err(MonitorError::Config(_))));
        assert_eq!(manager.supported_chains(), vec![56, 97]);
    }
}
