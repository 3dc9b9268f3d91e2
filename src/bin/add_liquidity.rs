//! Add a prompted amount of crvUSD to the Curve pool, single-sided

use anyhow::Result;
use tracing::info;

use compounder::cli::{finish, format_token_amount, prompt_amount, until_interrupted};
use compounder::config::Settings;
use compounder::logging::init_logging;
use compounder::workflow::Compounder;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();

    let settings = Settings::load()?;
    let mut compounder = Compounder::connect(&settings).await?;

    let amount = prompt_amount("Amount of crvUSD to add")?;
    info!("Adding {} crvUSD to the pool", format_token_amount(amount));

    let result = until_interrupted(compounder.add_liquidity(amount)).await;
    let receipt = finish(result, compounder.gas())?;

    info!("Liquidity added in block {:?}", receipt.block_number);
    Ok(())
}
