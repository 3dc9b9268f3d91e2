//! Transaction signing

use crate::error::{CompounderError, CompounderResult};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};

/// Turns an unsigned transaction into raw bytes ready for broadcast
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_transaction(&self, tx: &TypedTransaction) -> CompounderResult<Bytes>;
}

/// Local private-key signer
pub struct WalletSigner {
    wallet: LocalWallet,
}

impl WalletSigner {
    /// Parse a hex private key and bind it to `chain_id`
    pub fn from_private_key(private_key: &str, chain_id: u64) -> CompounderResult<Self> {
        let wallet = private_key
            .parse::<LocalWallet>()
            // parse errors may contain key material
            .map_err(|_| CompounderError::Wallet("Invalid private key".to_string()))?
            .with_chain_id(chain_id);

        Ok(Self { wallet })
    }
}

#[async_trait]
impl TransactionSigner for WalletSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign_transaction(&self, tx: &TypedTransaction) -> CompounderResult<Bytes> {
        let signature = self
            .wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| CompounderError::Wallet(e.to_string()))?;

        Ok(tx.rlp_signed(&signature))
    }
}
