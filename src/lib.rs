//! Cross-DEX Arbitrage Searcher Library
//!
//! Finds crossed WETH markets, sizes the trade, and executes it through an
//! on-chain bundle executor either on a local fork or via a private relay.
//!
//! Created: 2026-10-18

pub mod arbitrage;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod market;
pub mod types;

// Re-export commonly used types
pub use arbitrage::{Arbitrage, DispatchError, DispatchOutcome, Dispatcher};
pub use chain::{BundleRelay, ChainClient, FlashbotsRelay, RpcChainClient};
pub use config::{load_config, load_config_from_file, ArbConfig, BotConfig, ExecutionMode};
pub use market::{Market, MarketError, MarketRegistry, UniswapV2Market};
pub use types::{CrossedMarketDetails, MarketsByToken, ETHER};
