//! Arbitrage Ranker
//!
//! Runs the detector and the volume search for every token, keeps the single
//! best opportunity per token, drops anything at or below the profit threshold
//! and sorts the rest by profit (highest first).
//!
//! Optional diagnostics count how far each token got through the pipeline and
//! list the top opportunities before thresholding.
//!
//! Created: 2026-10-18

use super::detector::CrossedMarketDetector;
use super::optimizer::VolumeOptimizer;
use crate::config::ArbConfig;
use crate::market::Market;
use crate::types::{format_ether, format_signed_ether, CrossedMarketDetails, MarketsByToken};
use alloy::primitives::I256;
use tracing::{debug, info};

/// Per-cycle counts of how far tokens made it through evaluation
#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    pub tokens_evaluated: usize,
    pub tokens_with_crossing: usize,
    pub tokens_with_positive_profit: usize,
    /// Best opportunity per token before the threshold, highest profit first, capped at top-N
    pub top: Vec<CrossedMarketDetails>,
}

/// Opportunity evaluation over a whole market snapshot
#[derive(Debug, Clone)]
pub struct Arbitrage {
    config: ArbConfig,
    detector: CrossedMarketDetector,
    optimizer: VolumeOptimizer,
}

impl Arbitrage {
    pub fn new(config: ArbConfig) -> Self {
        let detector = CrossedMarketDetector::new(config.weth_address, config.probe_size);
        let optimizer = VolumeOptimizer::new(config.weth_address, config.volume_ladder.clone());
        Self {
            config,
            detector,
            optimizer,
        }
    }

    /// Per-market probe prices are only logged for verbose diagnostics
    fn logs_probe_prices(&self) -> bool {
        self.config.diagnostics.enabled && self.config.diagnostics.verbose
    }

    /// Profitable opportunities, one per token at most, sorted by profit descending
    pub async fn evaluate_markets(&self, markets_by_token: &MarketsByToken) -> Vec<CrossedMarketDetails> {
        let (opportunities, report) = self.evaluate_with_report(markets_by_token).await;
        if self.config.diagnostics.enabled {
            log_report(&report);
        }
        opportunities
    }

    /// [`Self::evaluate_markets`] plus the diagnostic counts, without logging them
    pub async fn evaluate_with_report(
        &self,
        markets_by_token: &MarketsByToken,
    ) -> (Vec<CrossedMarketDetails>, EvaluationReport) {
        let mut report = EvaluationReport::default();
        let mut best_per_token = Vec::new();

        for (&token, markets) in markets_by_token {
            report.tokens_evaluated += 1;

            let priced = self.detector.price_markets(token, markets).await;
            if self.logs_probe_prices() {
                for p in &priced {
                    debug!(
                        "Probe: token={} market={} buy={} sell={}",
                        token,
                        p.market.address(),
                        p.buy_token_price,
                        p.sell_token_price
                    );
                }
            }

            let pairs = CrossedMarketDetector::crossed_pairs(&priced);
            if pairs.is_empty() {
                continue;
            }
            report.tokens_with_crossing += 1;

            if let Some(best) = self.optimizer.best_crossed_market(&pairs, token).await {
                if best.profit > I256::ZERO {
                    report.tokens_with_positive_profit += 1;
                }
                best_per_token.push(best);
            }
        }

        best_per_token.sort_by(|a, b| b.profit.cmp(&a.profit));
        report.top = best_per_token
            .iter()
            .take(self.config.diagnostics.top_n)
            .cloned()
            .collect();

        let min_profit = I256::try_from(self.config.min_profit_wei).unwrap_or(I256::MAX);
        best_per_token.retain(|d| d.profit > min_profit);

        (best_per_token, report)
    }
}

fn log_report(report: &EvaluationReport) {
    info!(
        "Evaluation: {} tokens, {} crossed, {} with positive profit",
        report.tokens_evaluated, report.tokens_with_crossing, report.tokens_with_positive_profit
    );
    for (rank, d) in report.top.iter().enumerate() {
        info!(
            "  #{} token={} profit={} ETH volume={} ETH buy={} sell={}",
            rank + 1,
            d.token_address,
            format_signed_ether(d.profit),
            format_ether(d.volume),
            d.buy_from_market.address(),
            d.sell_to_market.address()
        );
    }
}
