//! Market registry
//!
//! Loads the list of tradable pairs from a TOML file, groups them by the token
//! they trade against the base asset, and refreshes reserves once per block.
//!
//! Example:
//! ```toml
//! [[market]]
//! address = "0xA478c2975Ab1Ea89e8196811F51A7B7Ade33eB11"
//! token0 = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
//! token1 = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
//! protocol = "UniswapV2"
//! ```
//!
//! Created: 2026-10-18

use super::{Market, UniswapV2Market};
use crate::contracts::IUniswapV2Pair;
use crate::types::MarketsByToken;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One `[[market]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String { "UniswapV2".to_string() }

#[derive(Debug, Deserialize)]
struct MarketsFile {
    #[serde(rename = "market", default)]
    markets: Vec<MarketConfig>,
}

/// Owns every known market for the lifetime of the process
#[derive(Debug, Default)]
pub struct MarketRegistry {
    markets: Vec<Arc<UniswapV2Market>>,
}

impl MarketRegistry {
    pub fn from_configs(configs: &[MarketConfig]) -> Self {
        let markets = configs
            .iter()
            .map(|c| {
                Arc::new(UniswapV2Market::new(
                    c.address,
                    c.protocol.clone(),
                    c.token0,
                    c.token1,
                ))
            })
            .collect();
        Self { markets }
    }

    /// Load markets from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read markets file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: MarketsFile =
            toml::from_str(content).context("Failed to parse markets TOML")?;
        Ok(Self::from_configs(&file.markets))
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Group markets by the token they trade against `base_token`.
    /// Markets that do not include `base_token` are left out.
    pub fn markets_by_token(&self, base_token: Address) -> MarketsByToken {
        let mut grouped = MarketsByToken::new();
        for market in &self.markets {
            let [token0, token1] = market.tokens();
            let token = if token0 == base_token {
                token1
            } else if token1 == base_token {
                token0
            } else {
                debug!("Market {} does not trade the base asset, skipping", market.address());
                continue;
            };
            if token == base_token {
                continue;
            }
            grouped
                .entry(token)
                .or_default()
                .push(Arc::clone(market) as Arc<dyn Market>);
        }
        grouped
    }

    /// Refresh reserves of every market concurrently via `getReserves()`.
    /// A pool that fails keeps its previous reserves. Returns the number refreshed.
    pub async fn sync_reserves<P: Provider + Clone>(&self, provider: &P) -> usize {
        let futs: Vec<_> = self
            .markets
            .iter()
            .map(|market| {
                let provider = provider.clone();
                let market = Arc::clone(market);
                async move {
                    let contract = IUniswapV2Pair::new(market.address(), provider);
                    match contract.getReserves().call().await {
                        Ok(reserves) => {
                            market.set_reserves(
                                U256::from(reserves.reserve0),
                                U256::from(reserves.reserve1),
                            );
                            true
                        }
                        Err(e) => {
                            warn!("Failed to sync reserves for {}: {}", market.address(), e);
                            false
                        }
                    }
                }
            })
            .collect();

        let synced = join_all(futs).await.into_iter().filter(|ok| *ok).count();
        info!("Reserves synced: {}/{} markets", synced, self.markets.len());
        synced
    }
}
