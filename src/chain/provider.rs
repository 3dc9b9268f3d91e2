//! ethers HTTP provider adapter for `ChainClient`

use super::contracts::{CurveTricryptoPool, Erc20};
use super::ChainClient;
use crate::config::ChainConfig;
use crate::error::{CompounderError, CompounderResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Chain client backed by a single HTTP JSON-RPC endpoint
pub struct RpcChainClient {
    /// Chain configuration
    config: ChainConfig,
    /// HTTP provider
    provider: Arc<Provider<Http>>,
}

impl RpcChainClient {
    /// Create the provider and verify the node serves the configured chain
    pub async fn connect(config: ChainConfig) -> CompounderResult<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| {
                CompounderError::ChainConnection(format!(
                    "Invalid RPC URL {}: {}",
                    config.rpc_url, e
                ))
            })?
            .interval(Duration::from_millis(250));

        let client = Self {
            config,
            provider: Arc::new(provider),
        };

        let reported = client.chain_id().await.map_err(|e| {
            CompounderError::ChainConnection(format!(
                "Could not reach {} RPC: {}",
                client.config.name, e
            ))
        })?;

        if reported != client.config.chain_id {
            return Err(CompounderError::ChainConnection(format!(
                "RPC serves chain {} but {} ({}) is configured",
                reported, client.config.name, client.config.chain_id
            )));
        }

        info!("Connected to {} (chain {})", client.config.name, reported);
        Ok(client)
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> CompounderResult<u64> {
        self.provider
            .get_chainid()
            .await
            .map(|id| id.as_u64())
            .map_err(|e| CompounderError::rpc("eth_chainId", e))
    }

    async fn fee_history(&self, block_count: u64, percentile: f64) -> CompounderResult<FeeHistory> {
        let history = self
            .provider
            .fee_history(block_count, BlockNumber::Latest, &[percentile])
            .await
            .map_err(|e| CompounderError::rpc("eth_feeHistory", e))?;

        debug!(
            "Fee history: {} base fees, {} reward rows",
            history.base_fee_per_gas.len(),
            history.reward.len()
        );
        Ok(history)
    }

    async fn transaction_count(&self, address: Address) -> CompounderResult<U256> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| CompounderError::rpc("eth_getTransactionCount", e))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> CompounderResult<U256> {
        self.provider
            .estimate_gas(tx, None)
            .await
            .map_err(|e| CompounderError::GasEstimation(e.to_string()))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> CompounderResult<U256> {
        Erc20::new(token, self.provider.clone())
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| CompounderError::rpc("balanceOf", e))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> CompounderResult<U256> {
        Erc20::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| CompounderError::rpc("allowance", e))
    }

    async fn calc_token_amount(
        &self,
        pool: Address,
        amounts: [U256; 3],
        is_deposit: bool,
    ) -> CompounderResult<U256> {
        CurveTricryptoPool::new(pool, self.provider.clone())
            .calc_token_amount(amounts, is_deposit)
            .call()
            .await
            .map_err(|e| CompounderError::rpc("calc_token_amount", e))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> CompounderResult<H256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| CompounderError::rpc("eth_sendRawTransaction", e))?;

        Ok(pending.tx_hash())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> CompounderResult<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| CompounderError::rpc("eth_getTransactionReceipt", e))
    }
}
