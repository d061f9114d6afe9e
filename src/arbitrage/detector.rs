//! Crossed-Market Detector
//!
//! Screens every ordered pair of markets for one token using probe-size quotes.
//! A pair is crossed when buying the token with the probe amount of base asset
//! on one market yields more tokens than another market needs to pay the probe
//! amount back. This is a cheap necessary condition only; the volume search
//! decides whether a full-size trade is profitable.
//!
//! Created: 2026-10-18

use crate::market::Market;
use crate::types::CrossedPair;
use alloy::primitives::{Address, U256};
use std::sync::Arc;
use tracing::debug;

/// A market with its two probe quotes for one token
#[derive(Debug, Clone)]
pub struct PricedMarket {
    pub market: Arc<dyn Market>,
    /// Tokens needed here to receive the probe amount of base asset
    pub buy_token_price: U256,
    /// Tokens received here for the probe amount of base asset
    pub sell_token_price: U256,
}

/// Probe-quote screen for crossed markets
#[derive(Debug, Clone)]
pub struct CrossedMarketDetector {
    base_token: Address,
    probe_size: U256,
}

impl CrossedMarketDetector {
    pub fn new(base_token: Address, probe_size: U256) -> Self {
        Self {
            base_token,
            probe_size,
        }
    }

    /// Probe quotes for every market. Markets that cannot quote the probe are left out.
    pub async fn price_markets(
        &self,
        token: Address,
        markets: &[Arc<dyn Market>],
    ) -> Vec<PricedMarket> {
        let mut priced = Vec::with_capacity(markets.len());
        for market in markets {
            let buy_token_price = market.quote_in(token, self.base_token, self.probe_size).await;
            let sell_token_price = market.quote_out(self.base_token, token, self.probe_size).await;

            match (buy_token_price, sell_token_price) {
                (Ok(buy_token_price), Ok(sell_token_price)) => priced.push(PricedMarket {
                    market: Arc::clone(market),
                    buy_token_price,
                    sell_token_price,
                }),
                (Err(e), _) | (_, Err(e)) => {
                    debug!(
                        "Probe quote failed: token={} market={} - {}",
                        token,
                        market.address(),
                        e
                    );
                }
            }
        }
        priced
    }

    /// Every ordered pair (sell_to, buy_from) where `buy_from` hands out more
    /// tokens for the probe than `sell_to` needs to pay the probe back.
    /// A market is never paired with itself.
    pub fn crossed_pairs(priced: &[PricedMarket]) -> Vec<CrossedPair> {
        let mut crossed = Vec::new();
        for (i, sell_to) in priced.iter().enumerate() {
            for (j, buy_from) in priced.iter().enumerate() {
                if i == j || sell_to.market.address() == buy_from.market.address() {
                    continue;
                }
                if buy_from.sell_token_price > sell_to.buy_token_price {
                    crossed.push(CrossedPair {
                        sell_to: Arc::clone(&sell_to.market),
                        buy_from: Arc::clone(&buy_from.market),
                    });
                }
            }
        }
        crossed
    }

    pub async fn find_crossed_markets(
        &self,
        token: Address,
        markets: &[Arc<dyn Market>],
    ) -> Vec<CrossedPair> {
        let priced = self.price_markets(token, markets).await;
        Self::crossed_pairs(&priced)
    }
}
