//! Arbitrage Module
//!
//! Crossed-market detection, volume search, ranking, bundle building and
//! mode-dependent dispatch of two-leg WETH arbitrage.
//!
//! Created: 2026-10-18

pub mod bundle;
pub mod detector;
pub mod executor;
pub mod optimizer;
pub mod ranker;

#[cfg(test)]
pub(crate) mod test_support;

pub use bundle::{miner_reward, BundleBuilder};
pub use detector::{CrossedMarketDetector, PricedMarket};
pub use executor::{DispatchError, DispatchOutcome, Dispatcher, SkipReason};
pub use optimizer::VolumeOptimizer;
pub use ranker::{Arbitrage, EvaluationReport};
