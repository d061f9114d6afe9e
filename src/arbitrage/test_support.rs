//! Shared fixtures for the arbitrage tests

use crate::market::{Market, MarketError, UniswapV2Market};
use crate::types::{CallBundle, ETHER};
use alloy::primitives::{address, Address, Bytes, U256};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
pub const TOKEN: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");

/// Constant-product TOKEN/WETH pool at `0x..{id}`, reserves in thirtieths of an ether
pub fn cp_market(id: u8, weth_units: u64, token_units: u64) -> Arc<UniswapV2Market> {
    let unit = ETHER / U256::from(30u64);
    Arc::new(
        UniswapV2Market::new(Address::with_last_byte(id), "UniswapV2", TOKEN, WETH)
            .with_reserves(unit * U256::from(token_units), unit * U256::from(weth_units)),
    )
}

/// Two pools with equal WETH depth; the second holds 10% more TOKEN.
/// Returns `(flat, rich)`.
pub fn scenario_a_markets() -> (Arc<UniswapV2Market>, Arc<UniswapV2Market>) {
    (cp_market(1, 1000, 1000), cp_market(2, 1000, 1100))
}

/// Market with a scripted price curve.
///
/// Selling into WETH returns `amount + curve(amount)`; every other quote is
/// 1:1. Counts `quote_out` calls so tests can see how many volumes were tried.
#[derive(Debug)]
pub struct ScriptedMarket {
    address: Address,
    curve: Option<fn(U256) -> i64>,
    fail_builds: bool,
    quotes: AtomicUsize,
}

impl ScriptedMarket {
    pub fn identity(id: u8) -> Self {
        Self {
            address: Address::with_last_byte(id),
            curve: None,
            fail_builds: false,
            quotes: AtomicUsize::new(0),
        }
    }

    pub fn profit_curve(id: u8, curve: fn(U256) -> i64) -> Self {
        Self {
            curve: Some(curve),
            ..Self::identity(id)
        }
    }

    /// Call-data construction always fails
    pub fn failing_builds(mut self) -> Self {
        self.fail_builds = true;
        self
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.load(Ordering::SeqCst)
    }

    fn build_error(&self) -> MarketError {
        MarketError::Quote {
            market: self.address,
            reason: "scripted build failure".to_string(),
        }
    }

    /// Marker payload: `[0xaa, last address byte]`
    fn payload(&self) -> Bytes {
        Bytes::from(vec![0xaa, self.address.as_slice()[19]])
    }
}

#[async_trait]
impl Market for ScriptedMarket {
    fn address(&self) -> Address {
        self.address
    }

    fn protocol(&self) -> &str {
        "Scripted"
    }

    fn tokens(&self) -> [Address; 2] {
        [TOKEN, WETH]
    }

    fn receive_directly(&self, _token: Address) -> bool {
        true
    }

    async fn quote_out(
        &self,
        _token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256, MarketError> {
        self.quotes.fetch_add(1, Ordering::SeqCst);
        match self.curve {
            Some(curve) if token_out == WETH => {
                let delta = curve(amount_in);
                let magnitude = U256::from(delta.unsigned_abs());
                Ok(if delta >= 0 {
                    amount_in + magnitude
                } else {
                    amount_in - magnitude
                })
            }
            _ => Ok(amount_in),
        }
    }

    async fn quote_in(
        &self,
        _token_in: Address,
        _token_out: Address,
        amount_out: U256,
    ) -> Result<U256, MarketError> {
        Ok(amount_out)
    }

    async fn build_sell_calls_to_next_market(
        &self,
        _token_in: Address,
        _amount_in: U256,
        _next_market: &dyn Market,
    ) -> Result<CallBundle, MarketError> {
        if self.fail_builds {
            return Err(self.build_error());
        }
        Ok(CallBundle {
            targets: vec![self.address],
            payloads: vec![self.payload()],
        })
    }

    async fn build_sell_call_data(
        &self,
        _token_in: Address,
        _amount_in: U256,
        _recipient: Address,
    ) -> Result<Bytes, MarketError> {
        if self.fail_builds {
            return Err(self.build_error());
        }
        Ok(self.payload())
    }
}
