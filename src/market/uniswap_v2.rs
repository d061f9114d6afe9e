//! Constant-product market (Uniswap V2 pair and forks)
//!
//! Quotes from cached reserves using x * y = k with a 0.30% fee (997/1000).
//! Reserves are refreshed once per block by the registry.
//!
//! Created: 2026-10-18

use super::{Market, MarketError};
use crate::contracts::IUniswapV2Pair;
use crate::types::CallBundle;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::RwLock;
use tracing::debug;

/// V2 fee factor: 997/1000 = 0.30% fee
const FEE_NUMERATOR: u64 = 997;
const FEE_DENOMINATOR: u64 = 1000;

/// Uniswap V2 style pair with cached reserves
#[derive(Debug)]
pub struct UniswapV2Market {
    address: Address,
    protocol: String,
    tokens: [Address; 2],
    /// (reserve0, reserve1) in token order
    reserves: RwLock<(U256, U256)>,
}

impl UniswapV2Market {
    pub fn new(address: Address, protocol: impl Into<String>, token0: Address, token1: Address) -> Self {
        Self {
            address,
            protocol: protocol.into(),
            tokens: [token0, token1],
            reserves: RwLock::new((U256::ZERO, U256::ZERO)),
        }
    }

    /// Create a pair with known reserves
    pub fn with_reserves(self, reserve0: U256, reserve1: U256) -> Self {
        self.set_reserves(reserve0, reserve1);
        self
    }

    pub fn set_reserves(&self, reserve0: U256, reserve1: U256) {
        debug!(
            "Reserves updated: {} - ({}, {})",
            self.address, reserve0, reserve1
        );
        let mut guard = self.reserves.write().unwrap_or_else(|e| e.into_inner());
        *guard = (reserve0, reserve1);
    }

    pub fn reserves(&self) -> (U256, U256) {
        *self.reserves.read().unwrap_or_else(|e| e.into_inner())
    }

    /// (reserve_in, reserve_out) for a swap direction
    fn directed_reserves(
        &self,
        token_in: Address,
        token_out: Address,
    ) -> Result<(U256, U256), MarketError> {
        let (reserve0, reserve1) = self.reserves();
        let [token0, token1] = self.tokens;
        if token_in == token0 && token_out == token1 {
            Ok((reserve0, reserve1))
        } else if token_in == token1 && token_out == token0 {
            Ok((reserve1, reserve0))
        } else {
            let token = if token_in == token0 || token_in == token1 {
                token_out
            } else {
                token_in
            };
            Err(MarketError::UnsupportedToken {
                market: self.address,
                token,
            })
        }
    }

    fn other_token(&self, token: Address) -> Result<Address, MarketError> {
        match self.tokens {
            [t0, t1] if token == t0 => Ok(t1),
            [t0, t1] if token == t1 => Ok(t0),
            _ => Err(MarketError::UnsupportedToken {
                market: self.address,
                token,
            }),
        }
    }
}

/// Constant product output with fee.
///
/// amount_out = (amount_in * 997 * reserve_out) / (reserve_in * 1000 + amount_in * 997)
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }

    let amount_in_with_fee = amount_in.saturating_mul(U256::from(FEE_NUMERATOR));
    let numerator = amount_in_with_fee.saturating_mul(reserve_out);
    let denominator = reserve_in
        .saturating_mul(U256::from(FEE_DENOMINATOR))
        .saturating_add(amount_in_with_fee);

    numerator / denominator
}

/// Input required for a given output. Inverse of [`get_amount_out`].
///
/// amount_in = (reserve_in * amount_out * 1000) / ((reserve_out - amount_out) * 997) + 1
/// Returns `None` when the pair cannot provide `amount_out`.
pub fn get_amount_in(amount_out: U256, reserve_in: U256, reserve_out: U256) -> Option<U256> {
    if amount_out.is_zero() {
        return Some(U256::ZERO);
    }
    if reserve_in.is_zero() || amount_out >= reserve_out {
        return None;
    }

    let numerator = reserve_in
        .saturating_mul(amount_out)
        .saturating_mul(U256::from(FEE_DENOMINATOR));
    let denominator = (reserve_out - amount_out) * U256::from(FEE_NUMERATOR);

    Some(numerator / denominator + U256::from(1))
}

#[async_trait]
impl Market for UniswapV2Market {
    fn address(&self) -> Address {
        self.address
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn tokens(&self) -> [Address; 2] {
        self.tokens
    }

    fn receive_directly(&self, token: Address) -> bool {
        self.tokens.contains(&token)
    }

    async fn quote_out(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256, MarketError> {
        let (reserve_in, reserve_out) = self.directed_reserves(token_in, token_out)?;
        Ok(get_amount_out(amount_in, reserve_in, reserve_out))
    }

    async fn quote_in(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> Result<U256, MarketError> {
        let (reserve_in, reserve_out) = self.directed_reserves(token_in, token_out)?;
        get_amount_in(amount_out, reserve_in, reserve_out).ok_or(
            MarketError::InsufficientLiquidity {
                market: self.address,
                amount: amount_out,
            },
        )
    }

    async fn build_sell_calls_to_next_market(
        &self,
        token_in: Address,
        amount_in: U256,
        next_market: &dyn Market,
    ) -> Result<CallBundle, MarketError> {
        let token_out = self.other_token(token_in)?;
        if !next_market.receive_directly(token_out) {
            return Err(MarketError::NoDirectReceipt {
                market: self.address,
                next_market: next_market.address(),
                token: token_out,
            });
        }

        let payload = self
            .build_sell_call_data(token_in, amount_in, next_market.address())
            .await?;
        Ok(CallBundle {
            targets: vec![self.address],
            payloads: vec![payload],
        })
    }

    async fn build_sell_call_data(
        &self,
        token_in: Address,
        amount_in: U256,
        recipient: Address,
    ) -> Result<Bytes, MarketError> {
        let token_out = self.other_token(token_in)?;
        let amount_out = self.quote_out(token_in, token_out, amount_in).await?;

        let (amount0_out, amount1_out) = if token_in == self.tokens[0] {
            (U256::ZERO, amount_out)
        } else {
            (amount_out, U256::ZERO)
        };

        let call = IUniswapV2Pair::swapCall {
            amount0Out: amount0_out,
            amount1Out: amount1_out,
            to: recipient,
            data: Bytes::new(),
        };
        Ok(Bytes::from(call.abi_encode()))
    }
}
