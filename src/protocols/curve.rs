//! Curve tricrypto pool (crvUSD / ETH / GMAC)

use super::apply_slippage;
use crate::chain::contracts::AddLiquidityCall;
use crate::chain::ChainClient;
use crate::error::CompounderResult;

use ethers::abi::AbiEncode;
use ethers::types::{Address, Bytes, U256};
use tracing::info;

/// Coin order in the pool: [crvUSD, ETH, GMAC]
pub fn single_sided_amounts(crvusd: U256) -> [U256; 3] {
    [crvusd, U256::zero(), U256::zero()]
}

/// Minimum LP mint for depositing `amounts`, after slippage
pub async fn min_mint_amount(
    client: &dyn ChainClient,
    pool: Address,
    amounts: [U256; 3],
    slippage_percent: f64,
) -> CompounderResult<U256> {
    let expected = client.calc_token_amount(pool, amounts, true).await?;
    let min_mint = apply_slippage(expected, slippage_percent);
    info!("Expected LP mint {}, accepting at least {}", expected, min_mint);
    Ok(min_mint)
}

/// `add_liquidity(amounts, min_mint_amount, use_eth = true)`
pub fn add_liquidity_calldata(amounts: [U256; 3], min_mint_amount: U256) -> Bytes {
    AddLiquidityCall {
        amounts,
        min_mint_amount,
        use_eth: true,
    }
    .encode()
    .into()
}
