//! Transaction pipeline: fee estimation, building, signing, broadcast and approvals

pub mod approval;
mod builder;
mod gas;
mod sender;
mod signer;

pub use approval::ensure_allowance;
pub use builder::TransactionBuilder;
pub use gas::{FeeEstimate, FeeEstimator};
pub use sender::{gas_cost, TransactionSender};
pub use signer::{TransactionSigner, WalletSigner};

#[cfg(test)]
pub use signer::MockTransactionSigner;
