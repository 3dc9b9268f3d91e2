//! Workflow orchestration
//!
//! Every step follows the same sequence: input balance check, approval gate,
//! build, sign and broadcast, wait for the receipt. Steps run strictly in order
//! and the first failure ends the run; nothing already confirmed is undone.

mod gas_tracker;
mod pipeline;

pub use gas_tracker::GasTracker;
pub use pipeline::CompoundOutcome;

use crate::aggregator::{OneInchClient, SwapAggregator, SwapRequest};
use crate::chain::{ChainClient, RpcChainClient};
use crate::cli::format_token_amount;
use crate::config::{AddressBook, Settings};
use crate::error::{CompounderError, CompounderResult};
use crate::protocols::{curve, stake_dao};
use crate::tx::{
    ensure_allowance, FeeEstimator, TransactionBuilder, TransactionSender, TransactionSigner,
    WalletSigner,
};

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionReceipt, U256};
use std::sync::Arc;
use tracing::info;

pub const CRV_SYMBOL: &str = "CRV";
pub const CRVUSD_SYMBOL: &str = "crvUSD";
pub const LP_SYMBOL: &str = "LP";

/// Runs the claim / swap / add-liquidity / deposit steps for one wallet
pub struct Compounder {
    chain: Arc<dyn ChainClient>,
    signer: Arc<dyn TransactionSigner>,
    aggregator: Arc<dyn SwapAggregator>,
    builder: TransactionBuilder,
    sender: TransactionSender,
    addresses: AddressBook,
    swap_slippage_percent: f64,
    liquidity_slippage_percent: f64,
    gas: GasTracker,
}

impl Compounder {
    /// Wire up the RPC client, local signer and 1inch client from settings
    pub async fn connect(settings: &Settings) -> CompounderResult<Self> {
        let chain = RpcChainClient::connect(settings.chain.clone()).await?;
        let signer =
            WalletSigner::from_private_key(&settings.private_key()?, settings.chain.chain_id)?;
        let aggregator = OneInchClient::new(&settings.aggregator, settings.chain.chain_id)?;

        Self::new(settings, Arc::new(chain), Arc::new(signer), Arc::new(aggregator))
    }

    /// Assemble from already-built ports. The signer must control the configured wallet.
    pub fn new(
        settings: &Settings,
        chain: Arc<dyn ChainClient>,
        signer: Arc<dyn TransactionSigner>,
        aggregator: Arc<dyn SwapAggregator>,
    ) -> CompounderResult<Self> {
        let wallet = settings.wallet_address()?;
        if signer.address() != wallet {
            return Err(CompounderError::Config(format!(
                "Private key controls {:?} but wallet.address is {:?}",
                signer.address(),
                wallet
            )));
        }

        let builder = TransactionBuilder::new(
            settings.chain.chain_id,
            wallet,
            FeeEstimator::new(settings.fees.clone()),
        );

        Ok(Self {
            chain,
            signer,
            aggregator,
            builder,
            sender: TransactionSender::new(&settings.receipts),
            addresses: settings.addresses.clone(),
            swap_slippage_percent: settings.aggregator.slippage_percent,
            liquidity_slippage_percent: settings.liquidity.slippage_percent,
            gas: GasTracker::new(),
        })
    }

    pub fn wallet(&self) -> Address {
        self.builder.wallet()
    }

    /// Gas spent by everything this instance has had mined, reverts included
    pub fn gas(&self) -> &GasTracker {
        &self.gas
    }

    pub async fn balance_of(&self, token: Address) -> CompounderResult<U256> {
        self.chain.token_balance(token, self.wallet()).await
    }

    /// Fail with `InsufficientBalance` before anything is submitted
    async fn require_balance(
        &self,
        token: Address,
        symbol: &str,
        amount: U256,
    ) -> CompounderResult<U256> {
        let balance = self.balance_of(token).await?;
        info!("{} balance: {}", symbol, format_token_amount(balance));

        if balance < amount {
            return Err(CompounderError::InsufficientBalance {
                token: symbol.to_string(),
                have: format_token_amount(balance),
                need: format_token_amount(amount),
            });
        }

        Ok(balance)
    }

    async fn approve(
        &mut self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> CompounderResult<()> {
        let result = ensure_allowance(
            self.chain.as_ref(),
            self.signer.as_ref(),
            &self.builder,
            &self.sender,
            token,
            spender,
            amount,
        )
        .await;

        let receipt = self.track(result)?;
        self.gas.record_optional(receipt.as_ref());
        Ok(())
    }

    async fn submit(
        &mut self,
        tx: &TypedTransaction,
        label: &str,
    ) -> CompounderResult<TransactionReceipt> {
        let result = self
            .sender
            .send_and_confirm(self.chain.as_ref(), self.signer.as_ref(), tx, label)
            .await;

        let receipt = self.track(result)?;
        self.gas.record(&receipt);
        Ok(receipt)
    }

    /// A reverted transaction was still mined and paid for
    fn track<T>(&mut self, result: CompounderResult<T>) -> CompounderResult<T> {
        if let Err(CompounderError::Reverted { receipt, .. }) = &result {
            self.gas.record(receipt);
        }
        result
    }

    /// Swap `amount` CRV to crvUSD through the 1inch router
    pub async fn swap(&mut self, amount: U256) -> CompounderResult<TransactionReceipt> {
        let crv = self.addresses.crv()?;
        let crvusd = self.addresses.crvusd()?;
        let router = self.addresses.oneinch_router()?;

        self.require_balance(crv, CRV_SYMBOL, amount).await?;

        let quote = self.aggregator.quote(crv, crvusd, amount).await?;
        info!(
            "Expected output: {} {}",
            format_token_amount(quote.dst_amount),
            CRVUSD_SYMBOL
        );

        self.approve(crv, router, amount).await?;

        let request = SwapRequest {
            src: crv,
            dst: crvusd,
            amount,
            from: self.wallet(),
            slippage_percent: self.swap_slippage_percent,
        };
        let swap = self.aggregator.swap(&request).await?;
        let tx = self.builder.build_swap(self.chain.as_ref(), &swap, router).await?;

        self.submit(&tx, "Swap").await
    }

    /// Single-sided crvUSD deposit into the Curve pool
    pub async fn add_liquidity(&mut self, amount: U256) -> CompounderResult<TransactionReceipt> {
        let crvusd = self.addresses.crvusd()?;
        let pool = self.addresses.curve_pool()?;

        self.require_balance(crvusd, CRVUSD_SYMBOL, amount).await?;
        self.approve(crvusd, pool, amount).await?;

        let amounts = curve::single_sided_amounts(amount);
        let min_mint = curve::min_mint_amount(
            self.chain.as_ref(),
            pool,
            amounts,
            self.liquidity_slippage_percent,
        )
        .await?;
        let data = curve::add_liquidity_calldata(amounts, min_mint);
        let tx = self
            .builder
            .build_call(self.chain.as_ref(), pool, data, U256::zero())
            .await?;

        self.submit(&tx, "Add liquidity").await
    }

    /// Deposit pool LP tokens into the Stake DAO vault, credited to the wallet
    pub async fn deposit_to_vault(&mut self, amount: U256) -> CompounderResult<TransactionReceipt> {
        let lp_token = self.addresses.curve_pool()?;
        let vault = self.addresses.stake_dao_vault()?;

        self.require_balance(lp_token, LP_SYMBOL, amount).await?;
        self.approve(lp_token, vault, amount).await?;

        let data = stake_dao::deposit_calldata(amount, self.wallet());
        let tx = self
            .builder
            .build_call(self.chain.as_ref(), vault, data, U256::zero())
            .await?;

        self.submit(&tx, "Vault deposit").await
    }

    /// Claim accrued rewards for the configured gauge
    pub async fn claim_rewards(&mut self) -> CompounderResult<TransactionReceipt> {
        let harvester = self.addresses.stake_dao_harvester()?;
        let gauge = self.addresses.stake_dao_gauge()?;

        let data = stake_dao::claim_calldata(vec![gauge]);
        let tx = self
            .builder
            .build_call(self.chain.as_ref(), harvester, data, U256::zero())
            .await?;

        self.submit(&tx, "Claim").await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::aggregator::{MockSwapAggregator, Quote, SwapTransaction};
    use crate::chain::contracts::{AddLiquidityCall, ClaimCall, DepositCall};
    use crate::chain::MockChainClient;
    use crate::config::fixtures::sample_settings;
    use crate::tx::MockTransactionSigner;
    use ethers::abi::AbiDecode;
    use ethers::types::{Bytes, H256, U64};
    use std::sync::Mutex;

    fn addresses() -> AddressBook {
        sample_settings().addresses
    }

    fn swap_aggregator(events: &EventLog) -> MockSwapAggregator {
        let router = addresses().oneinch_router().unwrap();

        let mut aggregator = MockSwapAggregator::new();
        let log = events.clone();
        aggregator.expect_quote().times(1).returning(move |_, _, _| {
            log.lock().unwrap().push("quote".to_string());
            Ok(Quote {
                dst_amount: eth(410),
            })
        });
        let log = events.clone();
        aggregator
            .expect_swap()
            .withf(|request| request.from == wallet() && request.amount == eth(500))
            .times(1)
            .returning(move |_| {
                log.lock().unwrap().push("swap".to_string());
                Ok(SwapTransaction {
                    to: router,
                    data: Bytes::from(vec![0x07, 0xed, 0x23, 0x79]),
                    value: U256::zero(),
                    gas: Some(300_000),
                    gas_price: Some("10000000".to_string()),
                })
            });
        aggregator
    }

    fn swap_signer(events: &EventLog) -> MockTransactionSigner {
        let book = addresses();
        signer(
            events,
            vec![
                (book.crv().unwrap(), "approve"),
                (book.oneinch_router().unwrap(), "swap"),
            ],
        )
    }

    fn chain_with_crv(events: &EventLog, balance: U256, allowance: U256) -> MockChainClient {
        let mut chain = chain_with_plumbing(events);
        let log = events.clone();
        chain.expect_token_balance().returning(move |_, _| {
            log.lock().unwrap().push("balance".to_string());
            Ok(balance)
        });
        let log = events.clone();
        chain.expect_allowance().returning(move |_, _, _| {
            log.lock().unwrap().push("allowance".to_string());
            Ok(allowance)
        });
        chain
    }

    #[tokio::test]
    async fn test_swap_with_zero_allowance_approves_first() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let chain = chain_with_crv(&events, eth(1000), U256::zero());

        let mut compounder = compounder(chain, swap_signer(&events), swap_aggregator(&events));
        compounder.swap(eth(500)).await.unwrap();

        assert_eq!(
            recorded(&events),
            vec![
                "balance",
                "quote",
                "allowance",
                "sign:approve",
                "broadcast",
                "receipt",
                "swap",
                "sign:swap",
                "broadcast",
                "receipt",
            ]
        );
        assert_eq!(compounder.gas().transactions(), 2);
    }

    #[tokio::test]
    async fn test_swap_with_sufficient_allowance_skips_approval() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let chain = chain_with_crv(&events, eth(1000), eth(500));

        let mut compounder = compounder(chain, swap_signer(&events), swap_aggregator(&events));
        compounder.swap(eth(500)).await.unwrap();

        assert_eq!(
            recorded(&events),
            vec!["balance", "quote", "allowance", "swap", "sign:swap", "broadcast", "receipt"]
        );
        assert_eq!(compounder.gas().transactions(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_balance_halts_before_any_transaction() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let chain = chain_with_crv(&events, eth(100), U256::zero());

        let mut aggregator = MockSwapAggregator::new();
        aggregator.expect_quote().never();
        aggregator.expect_swap().never();

        let mut compounder = compounder(chain, swap_signer(&events), aggregator);
        let err = compounder.swap(eth(500)).await.unwrap_err();

        match err {
            CompounderError::InsufficientBalance { token, have, need } => {
                assert_eq!(token, CRV_SYMBOL);
                assert_eq!(have, "100.000000000000000000");
                assert_eq!(need, "500.000000000000000000");
            }
            other => panic!("expected insufficient balance, got {:?}", other),
        }
        assert_eq!(recorded(&events), vec!["balance"]);
    }

    #[tokio::test]
    async fn test_add_liquidity_applies_slippage_to_expected_mint() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let book = addresses();
        let pool = book.curve_pool().unwrap();

        let mut chain = chain_with_plumbing(&events);
        chain
            .expect_token_balance()
            .withf(move |token, _| *token == book.crvusd().unwrap())
            .returning(|_, _| Ok(eth(300)));
        chain
            .expect_allowance()
            .withf(move |_, _, spender| *spender == pool)
            .returning(|_, _, _| Ok(eth(300)));
        chain
            .expect_calc_token_amount()
            .withf(|_, amounts, is_deposit| {
                *amounts == [eth(250), U256::zero(), U256::zero()] && *is_deposit
            })
            .times(1)
            .returning(|_, _, _| Ok(eth(1000)));

        let captured: Arc<Mutex<Option<Bytes>>> = Arc::new(Mutex::new(None));
        let mut signer = MockTransactionSigner::new();
        signer.expect_address().returning(wallet);
        let slot = captured.clone();
        signer.expect_sign_transaction().times(1).returning(move |tx| {
            assert_eq!(tx.to_addr(), Some(&pool));
            *slot.lock().unwrap() = tx.data().cloned();
            Ok(Bytes::from(vec![0x02]))
        });

        let mut compounder = compounder(chain, signer, MockSwapAggregator::new());
        compounder.add_liquidity(eth(250)).await.unwrap();

        let data = captured.lock().unwrap().clone().unwrap();
        let call = AddLiquidityCall::decode(&data).unwrap();
        assert_eq!(call.amounts, [eth(250), U256::zero(), U256::zero()]);
        assert_eq!(call.min_mint_amount, eth(999));
        assert!(call.use_eth);
    }

    #[tokio::test]
    async fn test_vault_deposit_credits_wallet() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let vault = addresses().stake_dao_vault().unwrap();

        let mut chain = chain_with_plumbing(&events);
        chain.expect_token_balance().returning(|_, _| Ok(eth(40)));
        chain.expect_allowance().returning(|_, _, _| Ok(U256::zero()));

        let captured: Arc<Mutex<Vec<Bytes>>> = Arc::new(Mutex::new(Vec::new()));
        let mut signer = MockTransactionSigner::new();
        signer.expect_address().returning(wallet);
        let slot = captured.clone();
        signer.expect_sign_transaction().times(2).returning(move |tx| {
            slot.lock().unwrap().push(tx.data().cloned().unwrap_or_default());
            Ok(Bytes::from(vec![0x02]))
        });

        let mut compounder = compounder(chain, signer, MockSwapAggregator::new());
        compounder.deposit_to_vault(eth(40)).await.unwrap();

        let signed = captured.lock().unwrap().clone();
        let deposit = DepositCall::decode(&signed[1]).unwrap();
        assert_eq!(deposit.assets, eth(40));
        assert_eq!(deposit.receiver, wallet());
        assert_ne!(deposit.receiver, vault);
    }

    #[tokio::test]
    async fn test_claim_targets_configured_gauge() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let book = addresses();
        let harvester = book.stake_dao_harvester().unwrap();
        let gauge = book.stake_dao_gauge().unwrap();

        let chain = chain_with_plumbing(&events);
        let captured: Arc<Mutex<Option<Bytes>>> = Arc::new(Mutex::new(None));
        let mut signer = MockTransactionSigner::new();
        signer.expect_address().returning(wallet);
        let slot = captured.clone();
        signer.expect_sign_transaction().times(1).returning(move |tx| {
            assert_eq!(tx.to_addr(), Some(&harvester));
            *slot.lock().unwrap() = tx.data().cloned();
            Ok(Bytes::from(vec![0x02]))
        });

        let mut compounder = compounder(chain, signer, MockSwapAggregator::new());
        compounder.claim_rewards().await.unwrap();

        let data = captured.lock().unwrap().clone().unwrap();
        let call = ClaimCall::decode(&data).unwrap();
        assert_eq!(call.gauges, vec![gauge]);
        assert_eq!(call.harvest_data, vec![Bytes::default()]);
        assert_eq!(compounder.gas().transactions(), 1);
    }

    fn chain_with_reverting_receipts() -> MockChainClient {
        let mut chain = MockChainClient::new();
        chain.expect_fee_history().returning(|_, _| Ok(fee_history()));
        chain
            .expect_transaction_count()
            .returning(|_| Ok(U256::from(7u64)));
        chain
            .expect_estimate_gas()
            .returning(|_| Ok(U256::from(150_000u64)));
        chain
            .expect_send_raw_transaction()
            .returning(|_| Ok(H256::repeat_byte(0x11)));
        chain.expect_transaction_receipt().returning(|_| {
            Ok(Some(TransactionReceipt {
                status: Some(U64::zero()),
                ..receipt()
            }))
        });
        chain
    }

    #[tokio::test]
    async fn test_reverted_claim_still_counts_gas() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let signer = signer(&events, vec![]);

        let mut compounder = compounder(
            chain_with_reverting_receipts(),
            signer,
            MockSwapAggregator::new(),
        );
        let err = compounder.claim_rewards().await.unwrap_err();

        assert!(matches!(err, CompounderError::Reverted { .. }));
        assert_eq!(compounder.gas().transactions(), 1);
        assert_eq!(compounder.gas().total(), U256::from(1_100_000_000_000u64));
    }

    #[tokio::test]
    async fn test_reverted_approval_still_counts_gas() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut chain = chain_with_reverting_receipts();
        chain.expect_token_balance().returning(|_, _| Ok(eth(40)));
        chain.expect_allowance().returning(|_, _, _| Ok(U256::zero()));

        let mut compounder = compounder(chain, signer(&events, vec![]), MockSwapAggregator::new());
        let err = compounder.deposit_to_vault(eth(40)).await.unwrap_err();

        assert!(matches!(err, CompounderError::Reverted { .. }));
        // the deposit itself is never built after the approval reverts
        assert_eq!(recorded(&events), vec!["sign:unknown"]);
        assert_eq!(compounder.gas().transactions(), 1);
    }

    #[test]
    fn test_signer_must_control_configured_wallet() {
        let mut signer = MockTransactionSigner::new();
        signer
            .expect_address()
            .returning(|| Address::repeat_byte(0x99));

        let result = Compounder::new(
            &sample_settings(),
            Arc::new(MockChainClient::new()),
            Arc::new(signer),
            Arc::new(MockSwapAggregator::new()),
        );

        assert!(matches!(result, Err(CompounderError::Config(_))));
    }
}
