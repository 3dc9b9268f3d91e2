//! Stake DAO reward vault and harvester

use crate::chain::contracts::{ClaimCall, DepositCall};

use ethers::abi::AbiEncode;
use ethers::types::{Address, Bytes, U256};

/// `deposit(assets, receiver)`
pub fn deposit_calldata(assets: U256, receiver: Address) -> Bytes {
    DepositCall { assets, receiver }.encode().into()
}

/// `claim(gauges, harvest_data)` with an empty harvest payload per gauge
pub fn claim_calldata(gauges: Vec<Address>) -> Bytes {
    let harvest_data = vec![Bytes::default(); gauges.len()];
    ClaimCall {
        gauges,
        harvest_data,
    }
    .encode()
    .into()
}
