//! EIP-1559 fee estimation from recent fee history
//!
//! The priority fee is the median of the sampled per-block rewards scaled by a
//! small random jitter, or a fixed fraction of the base fee when the node
//! reports no rewards. The max fee never drops below `base_fee * floor_multiplier`.

use crate::chain::ChainClient;
use crate::config::FeeConfig;
use crate::error::{CompounderError, CompounderResult};

use ethers::types::U256;
use rand::Rng;
use tracing::debug;

/// Fixed-point scale used for the fractional multipliers
const PPM: u64 = 1_000_000;

/// Fee pair for an EIP-1559 transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
}

/// Gas fee estimator
#[derive(Debug, Clone)]
pub struct FeeEstimator {
    config: FeeConfig,
}

impl FeeEstimator {
    /// Create a new fee estimator
    pub fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    /// Gas limit buffer to apply on top of node estimates
    pub fn gas_limit_buffer_percent(&self) -> u64 {
        self.config.gas_limit_buffer_percent
    }

    /// Query fee history and derive a fee pair
    pub async fn estimate(&self, client: &dyn ChainClient) -> CompounderResult<FeeEstimate> {
        let history = client
            .fee_history(self.config.block_count, self.config.reward_percentile)
            .await?;

        let base_fee = history
            .base_fee_per_gas
            .last()
            .copied()
            .ok_or_else(|| {
                CompounderError::GasEstimation("No base fee in fee history".to_string())
            })?;

        let rewards: Vec<U256> = history
            .reward
            .iter()
            .filter_map(|block| block.first().copied())
            .collect();

        let jitter = rand::rng().random_range(self.config.jitter_min..=self.config.jitter_max);
        let estimate = self.estimate_from_samples(base_fee, rewards, jitter);

        debug!(
            "Fee estimate: base {} priority {} max {} (jitter {:.4})",
            base_fee, estimate.max_priority_fee_per_gas, estimate.max_fee_per_gas, jitter
        );
        Ok(estimate)
    }

    /// Pure part of the estimate, with the jitter draw supplied by the caller
    pub fn estimate_from_samples(
        &self,
        base_fee: U256,
        mut rewards: Vec<U256>,
        jitter: f64,
    ) -> FeeEstimate {
        let priority_fee = match median(&mut rewards) {
            Some(median) => scale_round(median, jitter),
            None => scale_floor(base_fee, self.config.fallback_priority_ratio),
        };

        let max_fee = std::cmp::max(
            base_fee.saturating_add(priority_fee),
            scale_floor(base_fee, self.config.floor_multiplier),
        );

        FeeEstimate {
            max_priority_fee_per_gas: priority_fee,
            max_fee_per_gas: max_fee,
        }
    }
}

/// Median of the samples; the floor of the mean of the middle pair when the count is even
fn median(values: &mut [U256]) -> Option<U256> {
    if values.is_empty() {
        return None;
    }

    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2)
    }
}

fn to_ppm(factor: f64) -> U256 {
    U256::from((factor * PPM as f64).round() as u64)
}

/// `floor(value * factor)`
fn scale_floor(value: U256, factor: f64) -> U256 {
    value.saturating_mul(to_ppm(factor)) / PPM
}

/// `round(value * factor)`, halves rounded up
fn scale_round(value: U256, factor: f64) -> U256 {
    (value.saturating_mul(to_ppm(factor)) + PPM / 2) / PPM
}
