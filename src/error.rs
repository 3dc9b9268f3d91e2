//! Error types for the compounder

use ethers::types::TransactionReceipt;
use thiserror::Error;

/// Main error type for the compounder
#[derive(Error, Debug)]
pub enum CompounderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain connection error: {0}")]
    ChainConnection(String),

    #[error("RPC error during {operation}: {message}")]
    Rpc { operation: String, message: String },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Aggregator error: {0}")]
    Aggregator(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Insufficient {token} balance: have {have}, need {need}")]
    InsufficientBalance {
        token: String,
        have: String,
        need: String,
    },

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Transaction {tx_hash} reverted")]
    Reverted {
        tx_hash: String,
        /// Mined receipt, kept for gas accounting
        receipt: Box<TransactionReceipt>,
    },

    #[error("Transaction {tx_hash} was broadcast but its receipt could not be fetched: {message}")]
    ReceiptUnavailable { tx_hash: String, message: String },

    #[error("Interrupted by signal")]
    Interrupted,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompounderError {
    /// Shorthand for wrapping a provider failure
    pub fn rpc(operation: &str, err: impl std::fmt::Display) -> Self {
        CompounderError::Rpc {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// True when the failure happened after something may already be on chain
    pub fn is_post_submission(&self) -> bool {
        matches!(
            self,
            CompounderError::Timeout { .. }
                | CompounderError::Reverted { .. }
                | CompounderError::ReceiptUnavailable { .. }
                | CompounderError::Interrupted
        )
    }
}

/// Result type for compounder operations
pub type CompounderResult<T> = Result<T, CompounderError>;
