//! Full claim → swap → add liquidity → deposit run

use super::{Compounder, CRVUSD_SYMBOL, CRV_SYMBOL, LP_SYMBOL};
use crate::cli::format_token_amount;
use crate::error::CompounderResult;

use ethers::types::U256;
use tracing::{info, warn};

/// Amounts moved by each step of a compound run; `None` marks a skipped step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundOutcome {
    pub swapped: Option<U256>,
    pub added: Option<U256>,
    pub deposited: Option<U256>,
}

impl Compounder {
    /// Claim rewards, then push the whole CRV balance through to the vault.
    ///
    /// Each step consumes the wallet's full balance of its input token. A step
    /// whose input balance is zero is skipped instead of submitting a
    /// zero-amount transaction.
    pub async fn compound(&mut self) -> CompounderResult<CompoundOutcome> {
        let mut outcome = CompoundOutcome::default();

        info!("Claiming rewards");
        self.claim_rewards().await?;

        let crv = self.balance_of(self.addresses.crv()?).await?;
        outcome.swapped = self.run_step(CRV_SYMBOL, crv, Step::Swap).await?;

        let crvusd = self.balance_of(self.addresses.crvusd()?).await?;
        outcome.added = self.run_step(CRVUSD_SYMBOL, crvusd, Step::AddLiquidity).await?;

        let lp = self.balance_of(self.addresses.curve_pool()?).await?;
        outcome.deposited = self.run_step(LP_SYMBOL, lp, Step::Deposit).await?;

        info!("Compound finished: {:?}", outcome);
        Ok(outcome)
    }

    async fn run_step(
        &mut self,
        symbol: &str,
        balance: U256,
        step: Step,
    ) -> CompounderResult<Option<U256>> {
        if balance.is_zero() {
            warn!("No {} to {}, skipping", symbol, step.verb());
            return Ok(None);
        }

        info!("{} {} {}", step.label(), format_token_amount(balance), symbol);
        match step {
            Step::Swap => self.swap(balance).await?,
            Step::AddLiquidity => self.add_liquidity(balance).await?,
            Step::Deposit => self.deposit_to_vault(balance).await?,
        };

        Ok(Some(balance))
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Swap,
    AddLiquidity,
    Deposit,
}

impl Step {
    fn verb(self) -> &'static str {
        match self {
            Step::Swap => "swap",
            Step::AddLiquidity => "add to the pool",
            Step::Deposit => "deposit",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Step::Swap => "Swapping",
            Step::AddLiquidity => "Adding liquidity with",
            Step::Deposit => "Depositing",
        }
    }
}
