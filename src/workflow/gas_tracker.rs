use crate::tx::gas_cost;

use ethers::types::{TransactionReceipt, U256};
use ethers::utils::format_ether;
use tracing::info;

/// Running total of wei spent on gas during one run
#[derive(Debug, Default, Clone)]
pub struct GasTracker {
    total: U256,
    transactions: usize,
}

impl GasTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, receipt: &TransactionReceipt) {
        self.total = self.total.saturating_add(gas_cost(receipt));
        self.transactions += 1;
    }

    pub fn record_optional(&mut self, receipt: Option<&TransactionReceipt>) {
        if let Some(receipt) = receipt {
            self.record(receipt);
        }
    }

    pub fn total(&self) -> U256 {
        self.total
    }

    pub fn transactions(&self) -> usize {
        self.transactions
    }

    pub fn log_summary(&self) {
        info!(
            "Total spent on gas: {} ETH over {} transactions",
            format_ether(self.total),
            self.transactions
        );
    }
}
