//! Flashbots relay client
//!
//! Signs bundle transactions locally, simulates them with `eth_callBundle` and
//! submits them with `eth_sendBundle`. Every request carries an
//! `X-Flashbots-Signature` header: `<address>:<EIP-191 signature of keccak(body)>`.
//! The authentication key only identifies the searcher; it never holds funds.

use super::{BundleRelay, BundleSubmission, ChainError, RelayError, SignedBundle, SimulationOutcome};
use alloy::eips::eip2718::Encodable2718;
use alloy::hex;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{keccak256, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallBundleResponse {
    #[serde(default)]
    coinbase_diff: Option<String>,
    #[serde(default)]
    total_gas_used: u64,
    #[serde(default)]
    results: Vec<CallBundleTxResult>,
}

#[derive(Debug, Deserialize)]
struct CallBundleTxResult {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    revert: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBundleResponse {
    bundle_hash: B256,
}

/// Private relay client
pub struct FlashbotsRelay {
    http: Client,
    relay_url: String,
    /// Identifies the searcher to the relay
    auth_signer: PrivateKeySigner,
    /// Signs the bundle transactions
    wallet: EthereumWallet,
    tx_sender: alloy::primitives::Address,
    /// Nonce and chain id lookups
    provider: DynProvider,
}

impl FlashbotsRelay {
    pub fn new(
        relay_url: impl Into<String>,
        auth_signer: PrivateKeySigner,
        tx_signer: PrivateKeySigner,
        provider: DynProvider,
    ) -> Result<Self, RelayError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let relay_url = relay_url.into();

        info!(
            "Relay client initialised: url={} searcher={}",
            relay_url,
            auth_signer.address()
        );

        Ok(Self {
            http,
            relay_url,
            auth_signer,
            tx_sender: tx_signer.address(),
            wallet: EthereumWallet::from(tx_signer),
            provider,
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RelayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": [params],
        })
        .to_string();
        let signature = signature_header(&self.auth_signer, &body).await?;

        debug!("Relay request: {}", method);
        let response: JsonRpcResponse<T> = self
            .http
            .post(&self.relay_url)
            .header("Content-Type", "application/json")
            .header("X-Flashbots-Signature", signature)
            .body(body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(RelayError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response.result.ok_or(RelayError::EmptyResponse)
    }
}

/// `<address>:<signature>` over the hex keccak of `body`
async fn signature_header(signer: &PrivateKeySigner, body: &str) -> Result<String, RelayError> {
    let digest = hex::encode_prefixed(keccak256(body.as_bytes()));
    let signature = signer
        .sign_message(digest.as_bytes())
        .await
        .map_err(|e| RelayError::Signing(e.to_string()))?;
    Ok(format!(
        "{}:{}",
        signer.address(),
        hex::encode_prefixed(signature.as_bytes())
    ))
}

fn encode_txs(bundle: &SignedBundle) -> Vec<String> {
    bundle.raw_txs.iter().map(hex::encode_prefixed).collect()
}

fn simulation_outcome(response: CallBundleResponse) -> SimulationOutcome {
    let first_revert = response.results.into_iter().find_map(|r| {
        r.error
            .or_else(|| r.revert.filter(|revert| !revert.is_empty()))
    });
    let coinbase_diff = response
        .coinbase_diff
        .as_deref()
        .and_then(|d| U256::from_str(d).ok())
        .unwrap_or(U256::ZERO);

    SimulationOutcome {
        error: None,
        first_revert,
        coinbase_diff,
        total_gas_used: response.total_gas_used,
    }
}

#[async_trait]
impl BundleRelay for FlashbotsRelay {
    async fn sign_bundle(&self, txs: &[TransactionRequest]) -> Result<SignedBundle, RelayError> {
        let mut nonce = self
            .provider
            .get_transaction_count(self.tx_sender)
            .await
            .map_err(ChainError::from)?;
        let chain_id = self.provider.get_chain_id().await.map_err(ChainError::from)?;

        let mut raw_txs = Vec::with_capacity(txs.len());
        for tx in txs {
            let mut tx = tx.clone();
            tx.from = Some(self.tx_sender);
            tx.nonce = Some(nonce);
            tx.chain_id = Some(chain_id);
            if tx.gas_price.is_none() && tx.max_fee_per_gas.is_none() {
                tx.gas_price = Some(0);
            }

            let envelope = tx
                .build(&self.wallet)
                .await
                .map_err(|e| RelayError::Signing(e.to_string()))?;
            raw_txs.push(Bytes::from(envelope.encoded_2718()));
            nonce += 1;
        }

        Ok(SignedBundle { raw_txs })
    }

    async fn simulate(
        &self,
        bundle: &SignedBundle,
        block_number: u64,
    ) -> Result<SimulationOutcome, RelayError> {
        let params = json!({
            "txs": encode_txs(bundle),
            "blockNumber": format!("{:#x}", block_number),
            "stateBlockNumber": "latest",
        });

        match self.request::<CallBundleResponse>("eth_callBundle", params).await {
            Ok(response) => Ok(simulation_outcome(response)),
            // The relay rejecting the bundle is a simulation result, not a transport failure
            Err(RelayError::Rpc { code, message }) => Ok(SimulationOutcome {
                error: Some(format!("{}: {}", code, message)),
                ..Default::default()
            }),
            Err(e) => Err(e),
        }
    }

    async fn send_bundle(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
    ) -> Result<BundleSubmission, RelayError> {
        let params = json!({
            "txs": encode_txs(bundle),
            "blockNumber": format!("{:#x}", target_block),
        });

        let response: SendBundleResponse = self.request("eth_sendBundle", params).await?;
        info!(
            "Bundle submitted: hash={} target_block={}",
            response.bundle_hash, target_block
        );
        Ok(BundleSubmission {
            bundle_hash: response.bundle_hash,
            target_block,
        })
    }
}
