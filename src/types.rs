//! Core data structures shared by detection, bundle building and dispatch.
//!
//! Created: 2026-10-18

use crate::market::Market;
use alloy::primitives::{Address, Bytes, I256, U256};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 1 ether in wei
pub const ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Markets trading each token against the base asset, keyed by token address.
///
/// Built once per evaluation cycle by the registry. Every market listed under a
/// token quotes that token against the base asset.
pub type MarketsByToken = BTreeMap<Address, Vec<Arc<dyn Market>>>;

/// A crossed pair for one token: buy the token on `buy_from`, sell it on `sell_to`.
#[derive(Debug, Clone)]
pub struct CrossedPair {
    pub sell_to: Arc<dyn Market>,
    pub buy_from: Arc<dyn Market>,
}

/// Best volume found for a crossed pair.
///
/// `profit` is the base-asset proceeds of the sell leg minus `volume`, both
/// evaluated at exactly this `volume`.
#[derive(Debug, Clone)]
pub struct CrossedMarketDetails {
    pub profit: I256,
    pub volume: U256,
    pub token_address: Address,
    pub buy_from_market: Arc<dyn Market>,
    pub sell_to_market: Arc<dyn Market>,
}

impl fmt::Display for CrossedMarketDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buy_tokens = self.buy_from_market.tokens();
        let sell_tokens = self.sell_to_market.tokens();
        writeln!(
            f,
            "Profit: {} Volume: {}",
            format_signed_ether(self.profit),
            format_ether(self.volume)
        )?;
        writeln!(
            f,
            "{} ({})",
            self.buy_from_market.protocol(),
            self.buy_from_market.address()
        )?;
        writeln!(f, "  {} => {}", buy_tokens[0], buy_tokens[1])?;
        writeln!(
            f,
            "{} ({})",
            self.sell_to_market.protocol(),
            self.sell_to_market.address()
        )?;
        write!(f, "  {} => {}", sell_tokens[0], sell_tokens[1])
    }
}

/// Call targets and payloads produced by a market for one leg.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallBundle {
    pub targets: Vec<Address>,
    pub payloads: Vec<Bytes>,
}

/// Executable form of an opportunity: buy-leg calls followed by the sell-leg call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub volume: U256,
    /// Amount paid to the block producer
    pub miner_reward: U256,
    pub targets: Vec<Address>,
    pub payloads: Vec<Bytes>,
}

/// `proceeds - cost` as a signed amount, saturating at the I256 bounds.
pub fn signed_diff(proceeds: U256, cost: U256) -> I256 {
    if proceeds >= cost {
        I256::try_from(proceeds - cost).unwrap_or(I256::MAX)
    } else {
        I256::try_from(cost - proceeds)
            .map(|d| -d)
            .unwrap_or(I256::MIN)
    }
}

/// Render a wei amount in ether with 18 decimal places.
///
/// Amounts too large for `Decimal` fall back to the raw wei value.
pub fn format_ether(wei: U256) -> String {
    u128::try_from(wei)
        .ok()
        .and_then(|w| i128::try_from(w).ok())
        .and_then(|w| Decimal::try_from_i128_with_scale(w, 18).ok())
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| format!("{wei} wei"))
}

/// Signed variant of [`format_ether`].
pub fn format_signed_ether(wei: I256) -> String {
    let magnitude = format_ether(wei.unsigned_abs());
    if wei.is_negative() {
        format!("-{magnitude}")
    } else {
        magnitude
    }
}
