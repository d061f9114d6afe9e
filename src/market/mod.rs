//! Market capability
//!
//! Every tradable market exposes quoting and call-data construction through the
//! [`Market`] trait. Detection, volume search and bundle building only ever
//! talk to `dyn Market`, never to a concrete protocol.
//!
//! Created: 2026-10-18

pub mod registry;
pub mod uniswap_v2;

pub use registry::{MarketConfig, MarketRegistry};
pub use uniswap_v2::UniswapV2Market;

use crate::types::CallBundle;
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Quote and call-data construction failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("market {market} does not trade {token}")]
    UnsupportedToken { market: Address, token: Address },

    #[error("market {market} has insufficient liquidity for {amount}")]
    InsufficientLiquidity { market: Address, amount: U256 },

    #[error("market {next_market} cannot receive {token} directly from {market}")]
    NoDirectReceipt {
        market: Address,
        next_market: Address,
        token: Address,
    },

    #[error("quote failed on {market}: {reason}")]
    Quote { market: Address, reason: String },
}

/// Quoting and trade-construction capability of a single market.
///
/// Quotes must be deterministic for a given on-chain state snapshot.
#[async_trait]
pub trait Market: Send + Sync + fmt::Debug {
    /// Contract address
    fn address(&self) -> Address;

    /// Protocol label, e.g. "UniswapV2"
    fn protocol(&self) -> &str;

    /// Ordered token pair traded by this market
    fn tokens(&self) -> [Address; 2];

    /// Whether this market can be paid `token` by a previous leg without
    /// routing through the executor contract.
    fn receive_directly(&self, token: Address) -> bool;

    /// Amount of `token_out` received for selling `amount_in` of `token_in`.
    async fn quote_out(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256, MarketError>;

    /// Amount of `token_in` needed to receive `amount_out` of `token_out`.
    async fn quote_in(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> Result<U256, MarketError>;

    /// Calls that sell `amount_in` of `token_in` here, delivering the output
    /// straight to `next_market`.
    async fn build_sell_calls_to_next_market(
        &self,
        token_in: Address,
        amount_in: U256,
        next_market: &dyn Market,
    ) -> Result<CallBundle, MarketError>;

    /// Payload that sells `amount_in` of `token_in` here, crediting `recipient`.
    async fn build_sell_call_data(
        &self,
        token_in: Address,
        amount_in: U256,
        recipient: Address,
    ) -> Result<Bytes, MarketError>;
}
