//! Configuration management
//! Load settings from a .env file and the process environment

use crate::types::ETHER;
use alloy::primitives::{Address, U256};
use std::str::FromStr;
use thiserror::Error;

/// Production gas ceiling; estimates above this are treated as anomalous
pub const DEFAULT_GAS_CEILING: u64 = 1_400_000;

pub const DEFAULT_RELAY_URL: &str = "https://relay.flashbots.net";

/// Configuration errors with structured variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// How the dispatcher treats ranked opportunities. Selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Sign and broadcast against a local fork node, stopping after the first send.
    /// Only runs on blocks that are a multiple of `every_n_blocks`.
    LocalExecution { every_n_blocks: u64 },
    /// Estimate and `eth_call` every candidate against a local node; never submits.
    LocalSimulation,
    /// Simulate and submit bundles through the private relay.
    Production,
}

/// Side reporting for evaluation passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    /// Also log per-market probe prices
    pub verbose: bool,
    pub top_n: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            verbose: false,
            top_n: 5,
        }
    }
}

/// Settings for evaluation and dispatch, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbConfig {
    /// Opportunities must strictly exceed this profit (wei)
    pub min_profit_wei: U256,
    /// Size used for probe quotes when screening crossed markets
    pub probe_size: U256,
    /// Ascending trial volumes for the volume search
    pub volume_ladder: Vec<U256>,
    pub mode: ExecutionMode,
    pub gas_ceiling: u64,
    pub diagnostics: DiagnosticsConfig,
    /// Base asset (wrapped native currency)
    pub weth_address: Address,
    pub executor_address: Address,
}

impl ArbConfig {
    /// Defaults for everything except the two addresses
    pub fn new(weth_address: Address, executor_address: Address) -> Self {
        Self {
            min_profit_wei: ETHER / U256::from(1000u64),
            probe_size: ETHER / U256::from(100u64),
            volume_ladder: default_volume_ladder(),
            mode: ExecutionMode::Production,
            gas_ceiling: DEFAULT_GAS_CEILING,
            diagnostics: DiagnosticsConfig::default(),
            weth_address,
            executor_address,
        }
    }
}

/// 0.01, 0.1, 1/6, 0.25, 0.5, 1, 2, 5, 10 ETH
pub fn default_volume_ladder() -> Vec<U256> {
    vec![
        ETHER / U256::from(100u64),
        ETHER / U256::from(10u64),
        ETHER / U256::from(6u64),
        ETHER / U256::from(4u64),
        ETHER / U256::from(2u64),
        ETHER,
        ETHER * U256::from(2u64),
        ETHER * U256::from(5u64),
        ETHER * U256::from(10u64),
    ]
}

/// Full bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub rpc_url: String,
    pub relay_url: String,
    pub private_key: String,
    /// Key used only to authenticate with the relay; defaults to a fresh random key
    pub relay_signing_key: Option<String>,
    pub markets_file: String,
    pub poll_interval_ms: u64,
    pub miner_reward_percentage: u64,
    pub arb: ArbConfig,
}

impl BotConfig {
    /// Build the configuration from a key lookup (process env in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |field: &'static str| -> Result<String, ConfigError> {
            lookup(field)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingField { field })
        };
        let flag = |field: &str| lookup(field).map(|v| v.trim() == "1").unwrap_or(false);

        let weth_address = parse_field::<Address>("WETH_ADDRESS", &required("WETH_ADDRESS")?)?;
        let executor_address = parse_field::<Address>(
            "BUNDLE_EXECUTOR_ADDRESS",
            &required("BUNDLE_EXECUTOR_ADDRESS")?,
        )?;
        let mut arb = ArbConfig::new(weth_address, executor_address);

        if let Some(v) = lookup("ARBITRAGE_MIN_PROFIT_WEI_THRESHOLD") {
            arb.min_profit_wei = parse_field("ARBITRAGE_MIN_PROFIT_WEI_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("ARBITRAGE_VOLUME_LADDER_WEI") {
            arb.volume_ladder = parse_ladder(&v)?;
        }

        arb.diagnostics = DiagnosticsConfig {
            enabled: flag("ARBITRAGE_LOG_ENABLED"),
            verbose: flag("ARBITRAGE_LOG_VERBOSE"),
            top_n: match lookup("ARBITRAGE_LOG_TOP_N") {
                Some(v) => parse_field("ARBITRAGE_LOG_TOP_N", &v)?,
                None => DiagnosticsConfig::default().top_n,
            },
        };

        arb.mode = if flag("FORK_EXECUTE_LOCALLY") {
            let every_n_blocks = match lookup("FORK_EXECUTE_EVERY_N_BLOCKS") {
                Some(v) => parse_field("FORK_EXECUTE_EVERY_N_BLOCKS", &v)?,
                None => 1,
            };
            ExecutionMode::LocalExecution { every_n_blocks }
        } else if flag("FORK_SIMULATE_LOCALLY") {
            ExecutionMode::LocalSimulation
        } else {
            ExecutionMode::Production
        };

        let miner_reward_percentage = match lookup("MINER_REWARD_PERCENTAGE") {
            Some(v) => parse_field("MINER_REWARD_PERCENTAGE", &v)?,
            None => 80,
        };
        if miner_reward_percentage > 100 {
            return Err(ConfigError::InvalidValue {
                field: "MINER_REWARD_PERCENTAGE",
                reason: format!("{} exceeds 100", miner_reward_percentage),
            });
        }

        Ok(BotConfig {
            rpc_url: lookup("ETHEREUM_RPC_URL").unwrap_or_else(|| "http://127.0.0.1:8545".to_string()),
            relay_url: lookup("FLASHBOTS_RELAY_URL").unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            private_key: required("PRIVATE_KEY")?,
            relay_signing_key: lookup("FLASHBOTS_RELAY_SIGNING_KEY").filter(|k| !k.is_empty()),
            markets_file: lookup("MARKETS_FILE").unwrap_or_else(|| "markets.toml".to_string()),
            poll_interval_ms: match lookup("POLL_INTERVAL_MS") {
                Some(v) => parse_field("POLL_INTERVAL_MS", &v)?,
                None => 1000,
            },
            miner_reward_percentage,
            arb,
        })
    }
}

fn parse_field<T>(field: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        field,
        reason: format!("'{}': {}", value, e),
    })
}

/// Comma-separated wei amounts, strictly ascending
fn parse_ladder(value: &str) -> Result<Vec<U256>, ConfigError> {
    let ladder = value
        .split(',')
        .map(|v| parse_field::<U256>("ARBITRAGE_VOLUME_LADDER_WEI", v))
        .collect::<Result<Vec<_>, _>>()?;

    if ladder.is_empty() || ladder.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ConfigError::InvalidValue {
            field: "ARBITRAGE_VOLUME_LADDER_WEI",
            reason: "volumes must be non-empty and strictly ascending".to_string(),
        });
    }
    Ok(ladder)
}

/// Load configuration from .env and the process environment
pub fn load_config() -> anyhow::Result<BotConfig> {
    dotenv::dotenv().ok();
    Ok(BotConfig::from_lookup(|k| std::env::var(k).ok())?)
}

/// Load configuration from a specific env file, then the process environment
pub fn load_config_from_file(env_file: &str) -> anyhow::Result<BotConfig> {
    dotenv::from_filename(env_file).ok();
    Ok(BotConfig::from_lookup(|k| std::env::var(k).ok())?)
}
