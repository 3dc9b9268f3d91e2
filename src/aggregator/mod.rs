//! Swap aggregator port and response types

mod oneinch;

pub use oneinch::OneInchClient;

use crate::error::CompounderResult;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer};

/// Expected output of a swap
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Quote {
    #[serde(rename = "dstAmount", deserialize_with = "u256_from_dec_str")]
    pub dst_amount: U256,
}

/// Swap parameters sent to the aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub src: Address,
    pub dst: Address,
    pub amount: U256,
    pub from: Address,
    /// Percent, e.g. `0.1` for 0.1%
    pub slippage_percent: f64,
}

/// Ready-to-sign call returned by the aggregator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SwapTransaction {
    pub to: Address,
    pub data: Bytes,
    #[serde(deserialize_with = "u256_from_dec_str")]
    pub value: U256,
    #[serde(default)]
    pub gas: Option<u64>,
    /// Legacy gas price suggestion; never used
    #[serde(rename = "gasPrice", default)]
    pub gas_price: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SwapAggregator: Send + Sync {
    /// Price `amount` of `src` in `dst`
    async fn quote(&self, src: Address, dst: Address, amount: U256) -> CompounderResult<Quote>;

    /// Build the swap call for `request`
    async fn swap(&self, request: &SwapRequest) -> CompounderResult<SwapTransaction>;
}

/// Accepts decimal strings (as the aggregator sends amounts), plain JSON numbers,
/// and 0x-prefixed hex
fn u256_from_dec_str<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(U256::from(n)),
        Raw::Text(s) => {
            let s = s.trim();
            match s.strip_prefix("0x") {
                Some(hex) => U256::from_str_radix(hex, 16)
                    .map_err(|e| serde::de::Error::custom(format!("{:?}", e))),
                None => U256::from_dec_str(s)
                    .map_err(|e| serde::de::Error::custom(format!("{:?}", e))),
            }
        }
    }
}
