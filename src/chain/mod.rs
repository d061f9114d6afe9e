//! Execution substrate
//!
//! Node and relay capabilities the dispatcher consumes. [`RpcChainClient`] and
//! [`FlashbotsRelay`] are the alloy/reqwest backed implementations.
//!
//! Created: 2026-10-18

pub mod flashbots;
pub mod rpc;

pub use flashbots::FlashbotsRelay;
pub use rpc::RpcChainClient;

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use thiserror::Error;

/// Node RPC failures
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    /// `data` holds revert data when the node returned any
    #[error("rpc error: {message}")]
    Rpc {
        message: String,
        data: Option<String>,
    },

    #[error("contract call failed: {0}")]
    Contract(String),

    #[error("node returned no fee data")]
    NoFeeData,

    #[error("invalid rpc url '{0}'")]
    InvalidUrl(String),
}

impl ChainError {
    pub fn revert_data(&self) -> Option<&str> {
        match self {
            ChainError::Rpc { data, .. } => data.as_deref(),
            _ => None,
        }
    }
}

/// Private relay failures
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    #[error("relay transport error: {0}")]
    Transport(String),

    #[error("relay returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("relay response had no result")]
    EmptyResponse,

    #[error("failed to sign bundle: {0}")]
    Signing(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

/// Current fee parameters. EIP-1559 fields are used when both are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl FeeData {
    /// Set fee fields on `tx`, preferring EIP-1559 over a legacy gas price
    pub fn apply(&self, tx: &mut TransactionRequest) {
        if let (Some(max_fee), Some(priority_fee)) =
            (self.max_fee_per_gas, self.max_priority_fee_per_gas)
        {
            tx.max_fee_per_gas = Some(max_fee);
            tx.max_priority_fee_per_gas = Some(priority_fee);
            tx.gas_price = None;
        } else if let Some(gas_price) = self.gas_price {
            tx.gas_price = Some(gas_price);
            tx.max_fee_per_gas = None;
            tx.max_priority_fee_per_gas = None;
        }
    }
}

/// Mined transaction summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceiptSummary {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Raw signed transactions of a bundle, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedBundle {
    pub raw_txs: Vec<Bytes>,
}

/// Relay simulation result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// Relay-reported error for the whole bundle
    pub error: Option<String>,
    /// Revert reason of the first transaction that reverted
    pub first_revert: Option<String>,
    /// Payment to the block producer
    pub coinbase_diff: U256,
    pub total_gas_used: u64,
}

impl SimulationOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.first_revert.is_none()
    }

    /// coinbase_diff / total_gas_used, zero when no gas was used
    pub fn effective_gas_price(&self) -> U256 {
        if self.total_gas_used == 0 {
            U256::ZERO
        } else {
            self.coinbase_diff / U256::from(self.total_gas_used)
        }
    }
}

/// Relay acknowledgement of a submitted bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleSubmission {
    pub bundle_hash: B256,
    pub target_block: u64,
}

/// Node capabilities: estimation, fees, balances, calls and broadcast.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account that signs and sends transactions
    fn sender(&self) -> Address;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ChainError>;

    async fn fee_data(&self) -> Result<FeeData, ChainError>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    /// Non-mutating `eth_call`
    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, ChainError>;

    /// Sign and broadcast
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError>;

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceiptSummary, ChainError>;
}

/// Private relay capabilities: bundle signing, simulation and submission.
#[async_trait]
pub trait BundleRelay: Send + Sync {
    async fn sign_bundle(&self, txs: &[TransactionRequest]) -> Result<SignedBundle, RelayError>;

    async fn simulate(
        &self,
        bundle: &SignedBundle,
        block_number: u64,
    ) -> Result<SimulationOutcome, RelayError>;

    async fn send_bundle(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
    ) -> Result<BundleSubmission, RelayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_data_prefers_eip1559() {
        let fees = FeeData {
            gas_price: Some(5),
            max_fee_per_gas: Some(100),
            max_priority_fee_per_gas: Some(2),
        };
        let mut tx = TransactionRequest::default();
        tx.gas_price = Some(0);
        fees.apply(&mut tx);
        assert_eq!(tx.max_fee_per_gas, Some(100));
        assert_eq!(tx.max_priority_fee_per_gas, Some(2));
        assert_eq!(tx.gas_price, None);
    }

    #[test]
    fn test_fee_data_legacy_fallback() {
        let fees = FeeData {
            gas_price: Some(7),
            max_fee_per_gas: Some(100),
            max_priority_fee_per_gas: None,
        };
        let mut tx = TransactionRequest::default();
        fees.apply(&mut tx);
        assert_eq!(tx.gas_price, Some(7));
        assert_eq!(tx.max_fee_per_gas, None);
    }

    #[test]
    fn test_fee_data_empty_leaves_tx() {
        let mut tx = TransactionRequest::default();
        tx.gas_price = Some(0);
        FeeData::default().apply(&mut tx);
        assert_eq!(tx.gas_price, Some(0));
    }

    #[test]
    fn test_simulation_outcome() {
        let ok = SimulationOutcome {
            coinbase_diff: U256::from(1_000u64),
            total_gas_used: 10,
            ..Default::default()
        };
        assert!(ok.is_success());
        assert_eq!(ok.effective_gas_price(), U256::from(100u64));

        let reverted = SimulationOutcome {
            first_revert: Some("0x".to_string()),
            ..Default::default()
        };
        assert!(!reverted.is_success());
        assert_eq!(reverted.effective_gas_price(), U256::ZERO);
    }
}
