//! Chain module - the read/write capabilities the workflows need from an EVM node
//!
//! This module provides:
//! - The `ChainClient` port used by fee estimation, transaction building and the workflows
//! - An ethers HTTP adapter implementing it
//! - Generated bindings for the contracts involved

pub mod contracts;
pub mod provider;

pub use provider::RpcChainClient;

use crate::error::CompounderResult;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, FeeHistory, TransactionReceipt, H256, U256};

/// Everything the compounder asks of the chain.
///
/// Implementations are expected to be thin pass-throughs; no caching or retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id reported by the node, used as the startup connectivity check
    async fn chain_id(&self) -> CompounderResult<u64>;

    /// Base fees and per-block rewards at `percentile` for the last `block_count` blocks
    async fn fee_history(&self, block_count: u64, percentile: f64) -> CompounderResult<FeeHistory>;

    /// Transaction count at the latest block, used as the next nonce
    async fn transaction_count(&self, address: Address) -> CompounderResult<U256>;

    /// Node gas estimate for a fully populated transaction
    async fn estimate_gas(&self, tx: &TypedTransaction) -> CompounderResult<U256>;

    /// ERC-20 `balanceOf`
    async fn token_balance(&self, token: Address, owner: Address) -> CompounderResult<U256>;

    /// ERC-20 `allowance`
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> CompounderResult<U256>;

    /// Curve pool `calc_token_amount`
    async fn calc_token_amount(
        &self,
        pool: Address,
        amounts: [U256; 3],
        is_deposit: bool,
    ) -> CompounderResult<U256>;

    /// Broadcast signed raw transaction bytes
    async fn send_raw_transaction(&self, raw: Bytes) -> CompounderResult<H256>;

    /// Receipt if the transaction has been mined
    async fn transaction_receipt(&self, tx_hash: H256)
        -> CompounderResult<Option<TransactionReceipt>>;
}
