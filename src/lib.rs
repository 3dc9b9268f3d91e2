//! Stake DAO auto-compounder for the Curve crvUSD/ETH/GMAC pool on Arbitrum
//!
//! Claims Stake DAO rewards, swaps CRV to crvUSD through 1inch, adds the
//! crvUSD single-sided to the Curve pool and deposits the LP tokens back into
//! the Stake DAO vault. Every transaction is EIP-1559, priced from recent fee
//! history, and confirmed before the next one is built.

pub mod aggregator;
pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocols;
pub mod tx;
pub mod workflow;

pub use error::{CompounderError, CompounderResult};
