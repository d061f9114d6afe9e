//! Bundle Builder
//!
//! Turns a ranked opportunity into the executor contract's call sequence:
//! the buy-leg calls (which route the token straight into the sell market),
//! followed by exactly one sell-leg call crediting the executor.
//!
//! Created: 2026-10-18

use crate::market::MarketError;
use crate::types::{CrossedMarketDetails, ExecutionPlan};
use alloy::primitives::{Address, I256, U256};
use tracing::debug;

/// Builds [`ExecutionPlan`]s for the executor contract
#[derive(Debug, Clone, Copy)]
pub struct BundleBuilder {
    base_token: Address,
    executor: Address,
}

impl BundleBuilder {
    pub fn new(base_token: Address, executor: Address) -> Self {
        Self { base_token, executor }
    }

    /// Targets/payloads for `details` plus the miner reward at `reward_percentage`.
    ///
    /// The token amount for the sell leg is re-quoted from the buy leg at the
    /// plan's volume. Any market failure is returned as-is.
    pub async fn build(
        &self,
        details: &CrossedMarketDetails,
        reward_percentage: u64,
    ) -> Result<ExecutionPlan, MarketError> {
        let buy_calls = details
            .buy_from_market
            .build_sell_calls_to_next_market(
                self.base_token,
                details.volume,
                details.sell_to_market.as_ref(),
            )
            .await?;

        let inter = details
            .buy_from_market
            .quote_out(self.base_token, details.token_address, details.volume)
            .await?;

        let sell_payload = details
            .sell_to_market
            .build_sell_call_data(details.token_address, inter, self.executor)
            .await?;

        let mut targets = buy_calls.targets;
        targets.push(details.sell_to_market.address());
        let mut payloads = buy_calls.payloads;
        payloads.push(sell_payload);

        let miner_reward = miner_reward(details.profit, reward_percentage);
        debug!(
            "Built plan: token={} calls={} intermediate={} reward={}",
            details.token_address,
            targets.len(),
            inter,
            miner_reward
        );

        Ok(ExecutionPlan {
            volume: details.volume,
            miner_reward,
            targets,
            payloads,
        })
    }
}

/// `profit * percentage / 100`, truncated. Non-positive profit pays nothing.
pub fn miner_reward(profit: I256, percentage: u64) -> U256 {
    if profit <= I256::ZERO {
        return U256::ZERO;
    }
    profit.into_raw().saturating_mul(U256::from(percentage)) / U256::from(100u64)
}
