//! JSON-RPC backed readers for network resolution and the balance cache.

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::BlockId;
use alloy::sol;
use async_trait::async_trait;

use chainwatch_common::error::{MonitorError, Result};
use chainwatch_engine::{BalanceKey, ChainIdProvider, ChainReader};

// Only the view we read is declared.
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

/// Shared HTTP provider for everything the runner reads from the chain.
#[derive(Clone)]
pub struct RpcChainReader {
    provider: DynProvider,
}

impl RpcChainReader {
    pub fn connect(rpc_url: &str) -> anyhow::Result<Self> {
        let provider = ProviderBuilder::new()
            .connect_http(rpc_url.parse()?)
            .erased();
        Ok(Self { provider })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Balance reader for one ERC-20 token.
    pub fn token_balances(&self, token: Address) -> TokenBalances {
        TokenBalances {
            provider: self.provider.clone(),
            token,
        }
    }
}

#[async_trait]
impl ChainIdProvider for RpcChainReader {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| MonitorError::ExternalRead(format!("eth_chainId failed: {e}")))
    }
}

/// `balanceOf` reads against a single token contract.
pub struct TokenBalances {
    provider: DynProvider,
    token: Address,
}

impl TokenBalances {
    pub fn token(&self) -> Address {
        self.token
    }
}

#[async_trait]
impl ChainReader<BalanceKey, U256> for TokenBalances {
    async fn read(&self, key: &BalanceKey) -> Result<U256> {
        let contract = IERC20::new(self.token, self.provider.clone());
        let mut call = contract.balanceOf(key.account);
        if let Some(block) = key.block {
            call = call.block(BlockId::number(block));
        }

        call.call().await.map_err(|e| {
            MonitorError::ExternalRead(format!(
                "balanceOf({:#x}) on {:#x} failed: {e}",
                key.account, self.token
            ))
        })
    }
}
