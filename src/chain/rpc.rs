//! alloy-backed node client
//!
//! Wraps an HTTP provider with the executor wallet attached, so
//! `send_transaction` fills nonce/chain id and signs locally.

use super::{ChainClient, ChainError, FeeData, TxReceiptSummary};
use crate::contracts::IERC20;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use async_trait::async_trait;
use tracing::debug;

impl From<TransportError> for ChainError {
    fn from(e: TransportError) -> Self {
        let data = e
            .as_error_resp()
            .and_then(|payload| payload.data.as_ref())
            .map(|raw| raw.get().to_string());
        ChainError::Rpc {
            message: e.to_string(),
            data,
        }
    }
}

impl From<alloy::contract::Error> for ChainError {
    fn from(e: alloy::contract::Error) -> Self {
        ChainError::Contract(e.to_string())
    }
}

/// Node client over an alloy HTTP provider
#[derive(Clone)]
pub struct RpcChainClient {
    provider: DynProvider,
    sender: Address,
}

impl RpcChainClient {
    /// Connect to `rpc_url`, signing with `signer`
    pub fn connect(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self, ChainError> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|_| ChainError::InvalidUrl(rpc_url.to_string()))?;
        let sender = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Ok(Self { provider, sender })
    }

    /// Underlying provider, for reserve sync and relay nonce lookups
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_block_number().await?)
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ChainError> {
        Ok(self.provider.estimate_gas(tx.clone()).await?)
    }

    async fn fee_data(&self) -> Result<FeeData, ChainError> {
        let eip1559 = match self.provider.estimate_eip1559_fees().await {
            Ok(estimate) => Some(estimate),
            Err(e) => {
                debug!("EIP-1559 fee estimate unavailable: {}", e);
                None
            }
        };
        let gas_price = self.provider.get_gas_price().await.ok();

        if eip1559.is_none() && gas_price.is_none() {
            return Err(ChainError::NoFeeData);
        }
        Ok(FeeData {
            gas_price,
            max_fee_per_gas: eip1559.map(|e| e.max_fee_per_gas),
            max_priority_fee_per_gas: eip1559.map(|e| e.max_priority_fee_per_gas),
        })
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        let contract = IERC20::new(token, self.provider.clone());
        Ok(contract.balanceOf(owner).call().await?)
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, ChainError> {
        Ok(self.provider.call(tx.clone()).await?)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        let pending = self.provider.send_transaction(tx).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceiptSummary, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc {
                message: e.to_string(),
                data: None,
            })?;

        Ok(TxReceiptSummary {
            tx_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }
}
