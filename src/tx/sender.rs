//! Sign, broadcast and confirm transactions
//!
//! Confirmation polls for the receipt at a fixed interval and gives up after a
//! bounded wait. Nothing is retried: a failed broadcast or a timeout is returned
//! to the caller as-is.

use super::signer::TransactionSigner;
use crate::chain::ChainClient;
use crate::config::ReceiptConfig;
use crate::error::{CompounderError, CompounderResult};

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{TransactionReceipt, H256, U256, U64};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// Transaction sender with bounded receipt polling
#[derive(Debug, Clone)]
pub struct TransactionSender {
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl TransactionSender {
    /// Create a new transaction sender
    pub fn new(config: &ReceiptConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            receipt_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Sign and broadcast, returning the transaction hash
    pub async fn send(
        &self,
        client: &dyn ChainClient,
        signer: &dyn TransactionSigner,
        tx: &TypedTransaction,
    ) -> CompounderResult<H256> {
        let raw = signer.sign_transaction(tx).await?;
        debug!("Signed raw tx 0x{}", hex::encode(&raw));

        client.send_raw_transaction(raw).await
    }

    /// Poll until the receipt appears or the timeout elapses
    pub async fn wait_for_receipt(
        &self,
        client: &dyn ChainClient,
        tx_hash: H256,
    ) -> CompounderResult<TransactionReceipt> {
        let poll = async {
            loop {
                let polled = client.transaction_receipt(tx_hash).await.map_err(|e| {
                    CompounderError::ReceiptUnavailable {
                        tx_hash: format!("{:?}", tx_hash),
                        message: e.to_string(),
                    }
                })?;
                if let Some(receipt) = polled {
                    return Ok::<_, CompounderError>(receipt);
                }
                sleep(self.poll_interval).await;
            }
        };

        let receipt = timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| CompounderError::Timeout {
                operation: format!("receipt of {:?}", tx_hash),
            })??;

        if receipt.status == Some(U64::zero()) {
            return Err(CompounderError::Reverted {
                tx_hash: format!("{:?}", tx_hash),
                receipt: Box::new(receipt),
            });
        }

        debug!(
            "Receipt for {:?}: block {:?} gas used {:?}",
            tx_hash, receipt.block_number, receipt.gas_used
        );
        Ok(receipt)
    }

    /// Sign, broadcast and wait for a successful receipt
    pub async fn send_and_confirm(
        &self,
        client: &dyn ChainClient,
        signer: &dyn TransactionSigner,
        tx: &TypedTransaction,
        label: &str,
    ) -> CompounderResult<TransactionReceipt> {
        let tx_hash = self.send(client, signer, tx).await?;
        info!("{} transaction: {:?}", label, tx_hash);

        let receipt = self.wait_for_receipt(client, tx_hash).await?;
        info!("{} confirmed, gas used {}", label, receipt.gas_used.unwrap_or_default());
        Ok(receipt)
    }
}

/// Wei paid for a mined transaction
pub fn gas_cost(receipt: &TransactionReceipt) -> U256 {
    let gas_used = receipt.gas_used.unwrap_or_default();
    let price = receipt.effective_gas_price.unwrap_or_default();
    gas_used.saturating_mul(price)
}
