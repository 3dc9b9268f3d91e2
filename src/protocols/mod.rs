//! Calldata and amount math for the Curve pool and Stake DAO contracts

pub mod curve;
pub mod stake_dao;

use ethers::types::U256;

const PPM: u64 = 1_000_000;

/// `floor(amount * (1 - percent / 100))`
pub fn apply_slippage(amount: U256, percent: f64) -> U256 {
    let keep_ppm = PPM - ((percent / 100.0) * PPM as f64).round() as u64;
    amount.saturating_mul(U256::from(keep_ppm)) / PPM
}
