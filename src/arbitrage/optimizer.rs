//! Volume Optimizer
//!
//! Walks an ascending ladder of trial volumes for a crossed pair, assuming
//! profit rises then falls with volume. On the first trial that is worse than
//! the running best it evaluates the midpoint between the two once, keeps the
//! midpoint only if it beats the best, and stops. The running best is shared
//! by every pair of a token, so later pairs start out compared against it.
//!
//! This is an approximation of the true maximum; the single midpoint probe and
//! early stop are the intended behaviour.
//!
//! Created: 2026-10-18

use crate::market::MarketError;
use crate::types::{signed_diff, CrossedMarketDetails, CrossedPair};
use alloy::primitives::{Address, I256, U256};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct VolumeOptimizer {
    base_token: Address,
    ladder: Vec<U256>,
}

impl VolumeOptimizer {
    /// `ladder` must be ascending
    pub fn new(base_token: Address, ladder: Vec<U256>) -> Self {
        debug_assert!(ladder.windows(2).all(|w| w[0] < w[1]), "volume ladder must ascend");
        Self { base_token, ladder }
    }

    /// Profit of buying `token` with `volume` on the buy leg and selling it all on the sell leg
    pub async fn profit_at(
        &self,
        pair: &CrossedPair,
        token: Address,
        volume: U256,
    ) -> Result<I256, MarketError> {
        let tokens_out = pair.buy_from.quote_out(self.base_token, token, volume).await?;
        let proceeds = pair.sell_to.quote_out(token, self.base_token, tokens_out).await?;
        Ok(signed_diff(proceeds, volume))
    }

    /// Best (volume, profit) for one pair on its own
    pub async fn optimize_pair(
        &self,
        pair: &CrossedPair,
        token: Address,
    ) -> Option<CrossedMarketDetails> {
        let mut best = None;
        self.scan_pair(pair, token, &mut best).await;
        best
    }

    /// Best result for one token, `None` if there are no pairs.
    ///
    /// One running best is carried through every pair, so a later pair's
    /// trials are compared against (and refined toward) an earlier pair's best.
    pub async fn best_crossed_market(
        &self,
        pairs: &[CrossedPair],
        token: Address,
    ) -> Option<CrossedMarketDetails> {
        let mut best = None;
        for pair in pairs {
            self.scan_pair(pair, token, &mut best).await;
        }
        best
    }

    /// Walk the ladder for `pair`, updating `best` in place. A quote failure
    /// ends this pair's scan and leaves `best` as it was.
    async fn scan_pair(
        &self,
        pair: &CrossedPair,
        token: Address,
        best: &mut Option<CrossedMarketDetails>,
    ) {
        let record = |volume: U256, profit: I256| CrossedMarketDetails {
            profit,
            volume,
            token_address: token,
            buy_from_market: pair.buy_from.clone(),
            sell_to_market: pair.sell_to.clone(),
        };

        for &size in &self.ladder {
            let profit = match self.profit_at(pair, token, size).await {
                Ok(profit) => profit,
                Err(e) => {
                    debug!("Trial volume {} failed for token {}: {}", size, token, e);
                    return;
                }
            };

            if let Some((best_volume, best_profit)) = best.as_ref().map(|b| (b.volume, b.profit)) {
                if profit < best_profit {
                    // Worse than the running best: meet halfway once, then stop
                    let try_size = (size + best_volume) / U256::from(2u64);
                    match self.profit_at(pair, token, try_size).await {
                        Ok(try_profit) if try_profit > best_profit => {
                            *best = Some(record(try_size, try_profit));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            debug!("Midpoint {} failed for token {}: {}", try_size, token, e);
                        }
                    }
                    return;
                }
            }

            *best = Some(record(size, profit));
        }
    }
}
