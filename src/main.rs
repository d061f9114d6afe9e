//! Cross-DEX Arbitrage Searcher
//!
//! Main entry point. Loads the market registry, then on every new block:
//! refresh reserves -> evaluate crossed markets -> dispatch the ranked list.
//!
//! Dispatch mode comes from the environment (local fork execution, local
//! simulation, or private relay submission). A failed dispatch is logged and
//! the loop moves on to the next block.
//!
//! Created: 2026-10-18

use anyhow::{Context, Result};
use clap::Parser;
use simple_arb::arbitrage::{Arbitrage, DispatchOutcome, Dispatcher};
use simple_arb::chain::{FlashbotsRelay, RpcChainClient};
use simple_arb::config::{load_config, load_config_from_file};
use simple_arb::market::MarketRegistry;
use simple_arb::types::format_ether;
use alloy::signers::local::PrivateKeySigner;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Cross-DEX arbitrage searcher
#[derive(Parser)]
#[command(name = "simple-arb")]
struct Args {
    /// Env file to load before reading the environment (defaults to .env)
    #[arg(long, env = "ENV_FILE")]
    env_file: Option<String>,

    /// Market registry TOML, overrides MARKETS_FILE
    #[arg(short, long)]
    markets: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = match &args.env_file {
        Some(path) => load_config_from_file(path)?,
        None => load_config()?,
    };
    if let Some(markets) = args.markets {
        config.markets_file = markets;
    }

    info!("Arbitrage searcher starting");
    info!("RPC URL: {}", config.rpc_url.chars().take(40).collect::<String>());
    info!("Mode: {:?}", config.arb.mode);
    info!("Min profit: {} ETH", format_ether(config.arb.min_profit_wei));
    info!("Miner reward: {}%", config.miner_reward_percentage);

    let signer: PrivateKeySigner = config
        .private_key
        .parse()
        .context("PRIVATE_KEY is not a valid private key")?;
    let auth_signer = match &config.relay_signing_key {
        Some(key) => key
            .parse::<PrivateKeySigner>()
            .context("FLASHBOTS_RELAY_SIGNING_KEY is not a valid private key")?,
        None => {
            warn!("No FLASHBOTS_RELAY_SIGNING_KEY set, using a random relay identity");
            PrivateKeySigner::random()
        }
    };
    info!("Executor: {} | Sender: {}", config.arb.executor_address, signer.address());

    let chain = RpcChainClient::connect(&config.rpc_url, signer.clone())?;
    let block = chain.block_number().await?;
    info!("Connected! Current block: {}", block);

    let relay = FlashbotsRelay::new(&config.relay_url, auth_signer, signer, chain.provider().clone())?;

    let registry = MarketRegistry::load(&config.markets_file)?;
    info!("Loaded {} markets from {}", registry.len(), config.markets_file);
    if registry.is_empty() {
        anyhow::bail!("No markets configured in {}", config.markets_file);
    }

    let arbitrage = Arbitrage::new(config.arb.clone());
    let dispatcher = Dispatcher::new(config.arb.clone(), chain, relay);

    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    let mut last_block = 0u64;

    info!("Starting block polling loop ({}ms)", config.poll_interval_ms);
    loop {
        ticker.tick().await;

        let current_block = match dispatcher.chain().block_number().await {
            Ok(block) => block,
            Err(e) => {
                warn!("Block number lookup failed: {}", e);
                continue;
            }
        };
        if current_block <= last_block {
            continue;
        }
        last_block = current_block;

        let synced = registry.sync_reserves(dispatcher.chain().provider()).await;
        if synced == 0 {
            warn!("Reserve sync returned nothing at block {}, skipping", current_block);
            continue;
        }

        let markets_by_token = registry.markets_by_token(config.arb.weth_address);
        let opportunities = arbitrage.evaluate_markets(&markets_by_token).await;
        if opportunities.is_empty() {
            info!("Block {}: no crossed markets worth taking", current_block);
            continue;
        }
        info!("Block {}: {} opportunities", current_block, opportunities.len());

        match dispatcher
            .dispatch(&opportunities, current_block, config.miner_reward_percentage)
            .await
        {
            Ok(DispatchOutcome::Submitted { token, submissions }) => {
                for s in &submissions {
                    info!("Bundle {} for token {} targets block {}", s.bundle_hash, token, s.target_block);
                }
            }
            Ok(DispatchOutcome::Executed { tx_hash, success, .. }) => {
                info!("Local execution finished: {} success={}", tx_hash, success);
            }
            Ok(outcome) => info!("Dispatch finished: {:?}", outcome),
            Err(e) => error!("Dispatch failed at block {}: {}", current_block, e),
        }
    }
}
