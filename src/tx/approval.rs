//! Allowance check-then-approve

use super::builder::TransactionBuilder;
use super::sender::TransactionSender;
use super::signer::TransactionSigner;
use crate::chain::ChainClient;
use crate::error::CompounderResult;

use ethers::types::{Address, TransactionReceipt, U256};
use tracing::info;

/// Ensures `spender` may move `amount` of `token` on behalf of the wallet.
///
/// Approves the exact amount, never an unlimited allowance, and only when the
/// current allowance falls short. Returns the approval receipt when a
/// transaction was sent, `None` when the existing allowance already covers it.
pub async fn ensure_allowance(
    client: &dyn ChainClient,
    signer: &dyn TransactionSigner,
    builder: &TransactionBuilder,
    sender: &TransactionSender,
    token: Address,
    spender: Address,
    amount: U256,
) -> CompounderResult<Option<TransactionReceipt>> {
    let owner = builder.wallet();
    let allowance = client.allowance(token, owner, spender).await?;
    info!("Allowance of {:?} for {:?}: {}", token, spender, allowance);

    if allowance >= amount {
        return Ok(None);
    }

    info!("Approving {} of {:?} for {:?}", amount, token, spender);
    let tx = builder.build_approve(client, token, spender, amount).await?;
    let receipt = sender.send_and_confirm(client, signer, &tx, "Approval").await?;

    Ok(Some(receipt))
}
