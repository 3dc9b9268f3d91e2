//! Unsigned EIP-1559 transaction construction
//!
//! Every build fetches a fresh nonce and fresh fees; nothing is tracked locally
//! between transactions.

use super::gas::{FeeEstimate, FeeEstimator};
use crate::aggregator::SwapTransaction;
use crate::chain::contracts::ApproveCall;
use crate::chain::ChainClient;
use crate::error::{CompounderError, CompounderResult};

use ethers::abi::AbiEncode;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, U256};
use tracing::debug;

/// Builds transactions for a single wallet on a single chain
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    chain_id: u64,
    from: Address,
    fee_estimator: FeeEstimator,
}

impl TransactionBuilder {
    /// Create a new transaction builder
    pub fn new(chain_id: u64, from: Address, fee_estimator: FeeEstimator) -> Self {
        Self {
            chain_id,
            from,
            fee_estimator,
        }
    }

    /// Wallet the builder signs for
    pub fn wallet(&self) -> Address {
        self.from
    }

    /// Build a contract call with node-estimated gas
    pub async fn build_call(
        &self,
        client: &dyn ChainClient,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> CompounderResult<TypedTransaction> {
        let fees = self.fee_estimator.estimate(client).await?;
        let nonce = client.transaction_count(self.from).await?;

        let mut tx = self.request(to, data, value, nonce, fees);
        let estimated = client.estimate_gas(&tx).await?;
        tx.set_gas(self.with_buffer(estimated));

        debug!(
            "Built tx to {:?}: nonce {} gas {:?} max fee {} priority {}",
            to,
            nonce,
            tx.gas(),
            fees.max_fee_per_gas,
            fees.max_priority_fee_per_gas
        );
        Ok(tx)
    }

    /// Build an ERC-20 `approve` for exactly `amount`
    pub async fn build_approve(
        &self,
        client: &dyn ChainClient,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> CompounderResult<TypedTransaction> {
        let data = ApproveCall { spender, amount }.encode();
        self.build_call(client, token, data.into(), U256::zero()).await
    }

    /// Build a swap from aggregator output.
    ///
    /// The aggregator's legacy `gasPrice` is dropped in favour of our own EIP-1559
    /// fees, `value` is already coerced to an integer, and the aggregator's gas
    /// figure is used as the base limit when it supplied one.
    pub async fn build_swap(
        &self,
        client: &dyn ChainClient,
        swap: &SwapTransaction,
        expected_router: Address,
    ) -> CompounderResult<TypedTransaction> {
        if swap.to != expected_router {
            return Err(CompounderError::Aggregator(format!(
                "Swap targets {:?}, expected router {:?}",
                swap.to, expected_router
            )));
        }
        if swap.data.is_empty() {
            return Err(CompounderError::Aggregator("Swap calldata is empty".to_string()));
        }

        let Some(gas) = swap.gas else {
            return self
                .build_call(client, swap.to, swap.data.clone(), swap.value)
                .await;
        };

        let fees = self.fee_estimator.estimate(client).await?;
        let nonce = client.transaction_count(self.from).await?;

        let mut tx = self.request(swap.to, swap.data.clone(), swap.value, nonce, fees);
        tx.set_gas(self.with_buffer(U256::from(gas)));

        debug!(
            "Built swap tx: nonce {} gas {:?} value {}",
            nonce,
            tx.gas(),
            swap.value
        );
        Ok(tx)
    }

    fn request(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        nonce: U256,
        fees: FeeEstimate,
    ) -> TypedTransaction {
        Eip1559TransactionRequest::new()
            .from(self.from)
            .to(to)
            .data(data)
            .value(value)
            .nonce(nonce)
            .chain_id(self.chain_id)
            .max_fee_per_gas(fees.max_fee_per_gas)
            .max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
            .into()
    }

    fn with_buffer(&self, gas: U256) -> U256 {
        gas * (100 + self.fee_estimator.gas_limit_buffer_percent()) / 100u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use crate::config::FeeConfig;
    use ethers::abi::AbiDecode;
    use ethers::types::FeeHistory;

    const CHAIN_ID: u64 = 42161;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn builder() -> TransactionBuilder {
        let fees = FeeEstimator::new(FeeConfig {
            jitter_min: 1.0,
            jitter_max: 1.0,
            ..FeeConfig::default()
        });
        TransactionBuilder::new(CHAIN_ID, addr(0xaa), fees)
    }

    fn chain_with_fees(nonce: u64) -> MockChainClient {
        let mut client = MockChainClient::new();
        client.expect_fee_history().returning(|_, _| {
            Ok(FeeHistory {
                base_fee_per_gas: vec![U256::from(100_000_000u64); 6],
                gas_used_ratio: vec![0.5; 5],
                oldest_block: U256::from(1u64),
                reward: vec![vec![U256::from(1_000_000u64)]; 5],
            })
        });
        client
            .expect_transaction_count()
            .returning(move |_| Ok(U256::from(nonce)));
        client
    }

    fn eip1559(tx: &TypedTransaction) -> &Eip1559TransactionRequest {
        match tx {
            TypedTransaction::Eip1559(inner) => inner,
            other => panic!("expected EIP-1559 transaction, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_build_call_populates_fields() {
        let mut client = chain_with_fees(7);
        client
            .expect_estimate_gas()
            .times(1)
            .returning(|_| Ok(U256::from(50_000u64)));

        let tx = builder()
            .build_call(&client, addr(0xbb), Bytes::from(vec![1, 2, 3]), U256::zero())
            .await
            .unwrap();

        let inner = eip1559(&tx);
        assert_eq!(inner.from, Some(addr(0xaa)));
        assert_eq!(inner.nonce, Some(U256::from(7u64)));
        assert_eq!(inner.chain_id.map(|id| id.as_u64()), Some(CHAIN_ID));
        assert_eq!(inner.gas, Some(U256::from(60_000u64)));
        assert_eq!(inner.max_priority_fee_per_gas, Some(U256::from(1_000_000u64)));
        // floor of 1.05 * base dominates base + priority
        assert_eq!(inner.max_fee_per_gas, Some(U256::from(105_000_000u64)));
    }

    #[tokio::test]
    async fn test_approve_encodes_exact_amount() {
        let mut client = chain_with_fees(0);
        client
            .expect_estimate_gas()
            .returning(|_| Ok(U256::from(46_000u64)));

        let amount = U256::from(500u64) * U256::exp10(18);
        let tx = builder()
            .build_approve(&client, addr(0x01), addr(0x02), amount)
            .await
            .unwrap();

        assert_eq!(tx.to_addr(), Some(&addr(0x01)));
        let call = ApproveCall::decode(tx.data().unwrap()).unwrap();
        assert_eq!(call.spender, addr(0x02));
        assert_eq!(call.amount, amount);
        assert_ne!(call.amount, U256::MAX);
    }

    #[tokio::test]
    async fn test_swap_uses_aggregator_gas_and_drops_gas_price() {
        let mut client = chain_with_fees(3);
        client.expect_estimate_gas().never();

        let swap = SwapTransaction {
            to: addr(0x11),
            data: Bytes::from(vec![0x12, 0x34]),
            value: U256::from(5u64),
            gas: Some(200_000),
            gas_price: Some("999999999999".to_string()),
        };

        let tx = builder().build_swap(&client, &swap, addr(0x11)).await.unwrap();

        let inner = eip1559(&tx);
        assert_eq!(inner.value, Some(U256::from(5u64)));
        assert_eq!(inner.gas, Some(U256::from(240_000u64)));
        assert_eq!(inner.nonce, Some(U256::from(3u64)));
        assert_ne!(inner.max_fee_per_gas, Some(U256::from(999_999_999_999u64)));
    }

    #[tokio::test]
    async fn test_swap_estimates_gas_when_aggregator_omits_it() {
        let mut client = chain_with_fees(0);
        client
            .expect_estimate_gas()
            .times(1)
            .returning(|_| Ok(U256::from(100_000u64)));

        let swap = SwapTransaction {
            to: addr(0x11),
            data: Bytes::from(vec![0x12]),
            value: U256::zero(),
            gas: None,
            gas_price: None,
        };

        let tx = builder().build_swap(&client, &swap, addr(0x11)).await.unwrap();
        assert_eq!(tx.gas(), Some(&U256::from(120_000u64)));
    }

    #[tokio::test]
    async fn test_swap_rejects_unexpected_router() {
        let client = MockChainClient::new();
        let swap = SwapTransaction {
            to: addr(0x66),
            data: Bytes::from(vec![0x12]),
            value: U256::zero(),
            gas: Some(1),
            gas_price: None,
        };

        let result = builder().build_swap(&client, &swap, addr(0x11)).await;
        assert!(matches!(result, Err(CompounderError::Aggregator(_))));
    }
}
