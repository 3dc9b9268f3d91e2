//! Stake DAO compounder - claim, swap, add liquidity and re-deposit in one run
//!
//! Claims rewards from the Stake DAO harvester, swaps the wallet's CRV to
//! crvUSD through 1inch, adds the crvUSD to the Curve pool and deposits the
//! resulting LP tokens into the Stake DAO vault.

use anyhow::Result;
use tracing::info;

use compounder::cli::{finish, until_interrupted};
use compounder::config::Settings;
use compounder::logging::init_logging;
use compounder::workflow::Compounder;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting compounder v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for {} (chain {})",
        settings.chain.name, settings.chain.chain_id
    );

    // Connect chain, signer and aggregator
    let mut compounder = Compounder::connect(&settings).await?;
    info!("Compounding for wallet {:?}", compounder.wallet());

    let result = until_interrupted(compounder.compound()).await;
    let outcome = finish(result, compounder.gas())?;

    info!(
        "Compounder stopped: swapped {:?}, added {:?}, deposited {:?}",
        outcome.swapped, outcome.added, outcome.deposited
    );
    Ok(())
}
