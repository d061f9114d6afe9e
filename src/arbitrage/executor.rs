//! Execution Dispatcher
//!
//! Walks ranked opportunities in order and hands the first workable one to the
//! chain. The mode is fixed at startup:
//! - LocalExecution: estimate, sign and broadcast on a local node. Stops after
//!   the first send attempt whether it lands or not.
//! - LocalSimulation: estimate and `eth_call` every candidate, never sends.
//! - Production: estimate, reject anomalous gas, sign a one-transaction bundle,
//!   simulate it on the relay and submit it for the next two blocks.
//!
//! Per-candidate failures (build, estimation, anomalous gas, simulation) are
//! logged and the next candidate is tried. Running out of candidates in a mode
//! that must submit is an error.
//!
//! Created: 2026-10-18

use super::bundle::BundleBuilder;
use crate::chain::{BundleRelay, BundleSubmission, ChainClient, ChainError, RelayError};
use crate::config::{ArbConfig, ExecutionMode};
use crate::contracts::IBundleExecutor;
use crate::market::{Market, MarketError};
use crate::types::{format_ether, format_signed_ether, signed_diff, CrossedMarketDetails, ExecutionPlan};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, I256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use futures::future::try_join;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Gas limit on the zero-priced draft, replaced by the estimate before sending
const DRAFT_GAS_LIMIT: u64 = 1_000_000;

/// Result of a dispatch that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Local execution gate closed for this block
    Skipped { block_number: u64 },
    /// Local execution broadcast and mined a transaction
    Executed {
        token: Address,
        tx_hash: TxHash,
        success: bool,
        /// Executor base-asset balance after minus before, when both reads succeeded
        balance_delta: Option<I256>,
    },
    /// Local simulation went through the list; `candidates` plans were checked
    SimulatedOnly { candidates: usize },
    /// Bundle accepted by the relay for each target block
    Submitted {
        token: Address,
        submissions: Vec<BundleSubmission>,
    },
}

/// Terminal dispatch failures
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no opportunity submitted after trying {candidates} candidates")]
    NoSubmission { candidates: usize },

    #[error("local send failed for token {token}: {source}")]
    LocalSendFailed {
        token: Address,
        #[source]
        source: ChainError,
    },

    #[error("relay failure: {0}")]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Why a single candidate was passed over
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("bundle build failed: {0}")]
    Build(#[from] MarketError),

    #[error("gas estimation failed: {0}")]
    Estimation(ChainError),

    #[error("gas estimate {estimate} exceeds ceiling {ceiling}")]
    AnomalousGas { estimate: u64, ceiling: u64 },

    #[error("fee lookup failed: {0}")]
    FeeData(ChainError),

    #[error("simulation failed: {0}")]
    Simulation(String),
}

/// Dispatches ranked opportunities according to the configured [`ExecutionMode`]
pub struct Dispatcher<C, R> {
    config: ArbConfig,
    builder: BundleBuilder,
    chain: C,
    relay: R,
}

impl<C: ChainClient, R: BundleRelay> Dispatcher<C, R> {
    pub fn new(config: ArbConfig, chain: C, relay: R) -> Self {
        let builder = BundleBuilder::new(config.weth_address, config.executor_address);
        Self {
            config,
            builder,
            chain,
            relay,
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Try `opportunities` in order at `block_number`, paying the block producer
    /// `reward_percentage` of each candidate's profit.
    pub async fn dispatch(
        &self,
        opportunities: &[CrossedMarketDetails],
        block_number: u64,
        reward_percentage: u64,
    ) -> Result<DispatchOutcome, DispatchError> {
        match self.config.mode {
            ExecutionMode::LocalExecution { every_n_blocks } => {
                if every_n_blocks > 1 && block_number % every_n_blocks != 0 {
                    debug!(
                        "Block {} not a multiple of {}, skipping local execution",
                        block_number, every_n_blocks
                    );
                    return Ok(DispatchOutcome::Skipped { block_number });
                }
                self.execute_locally(opportunities, reward_percentage).await
            }
            ExecutionMode::LocalSimulation => {
                Ok(self.simulate_locally(opportunities, reward_percentage).await)
            }
            ExecutionMode::Production => {
                self.submit_bundles(opportunities, block_number, reward_percentage)
                    .await
            }
        }
    }

    /// Zero-priced call of the executor's `uniswapWeth` entry point
    pub fn draft_transaction(&self, plan: &ExecutionPlan) -> TransactionRequest {
        let input = IBundleExecutor::uniswapWethCall {
            wethAmountToFirstMarket: plan.volume,
            ethAmountToCoinbase: plan.miner_reward,
            targets: plan.targets.clone(),
            payloads: plan.payloads.clone(),
        }
        .abi_encode();

        TransactionRequest::default()
            .with_from(self.chain.sender())
            .with_to(self.config.executor_address)
            .with_input(input)
            .with_gas_price(0)
            .with_gas_limit(DRAFT_GAS_LIMIT)
    }

    async fn prepare(
        &self,
        details: &CrossedMarketDetails,
        reward_percentage: u64,
    ) -> Result<TransactionRequest, SkipReason> {
        let plan = self.builder.build(details, reward_percentage).await?;
        Ok(self.draft_transaction(&plan))
    }

    // ── LocalExecution ────────────────────────────────────────────────

    async fn execute_locally(
        &self,
        opportunities: &[CrossedMarketDetails],
        reward_percentage: u64,
    ) -> Result<DispatchOutcome, DispatchError> {
        for details in opportunities {
            info!("Local execution candidate:\n{}", details);

            let mut tx = match self.prepare(details, reward_percentage).await {
                Ok(tx) => tx,
                Err(reason) => {
                    skip(details, &reason);
                    continue;
                }
            };

            let estimate = match self.chain.estimate_gas(&tx).await {
                Ok(estimate) => estimate,
                Err(e) => {
                    skip(details, &SkipReason::Estimation(e));
                    continue;
                }
            };

            let fees = match self.chain.fee_data().await {
                Ok(fees) => fees,
                Err(e) => {
                    skip(details, &SkipReason::FeeData(e));
                    continue;
                }
            };

            let before = self.executor_balance().await;

            fees.apply(&mut tx);
            tx.set_gas_limit(estimate.saturating_mul(2));

            let tx_hash = match self.chain.send_transaction(tx).await {
                Ok(hash) => hash,
                Err(e) => {
                    error!(
                        "Local send failed for token {}: {} (revert data: {})",
                        details.token_address,
                        e,
                        e.revert_data().unwrap_or("none")
                    );
                    return Err(DispatchError::LocalSendFailed {
                        token: details.token_address,
                        source: e,
                    });
                }
            };
            info!("Local tx sent: {} (gas limit {})", tx_hash, estimate.saturating_mul(2));

            let receipt = self.chain.wait_for_receipt(tx_hash).await?;
            let after = self.executor_balance().await;

            let balance_delta = match (before, after) {
                (Some(before), Some(after)) => Some(signed_diff(after, before)),
                _ => None,
            };
            if receipt.success {
                info!(
                    "Local tx mined: {} block={:?} gas_used={} balance delta={}",
                    tx_hash,
                    receipt.block_number,
                    receipt.gas_used,
                    balance_delta
                        .map(format_signed_ether)
                        .unwrap_or_else(|| "unknown".to_string())
                );
            } else {
                warn!("Local tx reverted: {} block={:?}", tx_hash, receipt.block_number);
            }

            return Ok(DispatchOutcome::Executed {
                token: details.token_address,
                tx_hash,
                success: receipt.success,
                balance_delta,
            });
        }

        Err(DispatchError::NoSubmission {
            candidates: opportunities.len(),
        })
    }

    async fn executor_balance(&self) -> Option<U256> {
        match self
            .chain
            .balance_of(self.config.weth_address, self.config.executor_address)
            .await
        {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("Executor balance lookup failed: {}", e);
                None
            }
        }
    }

    // ── LocalSimulation ───────────────────────────────────────────────

    async fn simulate_locally(
        &self,
        opportunities: &[CrossedMarketDetails],
        reward_percentage: u64,
    ) -> DispatchOutcome {
        let mut checked = 0;

        for details in opportunities {
            info!("Local simulation candidate:\n{}", details);

            let tx = match self.prepare(details, reward_percentage).await {
                Ok(tx) => tx,
                Err(reason) => {
                    skip(details, &reason);
                    continue;
                }
            };
            checked += 1;

            match self.chain.estimate_gas(&tx).await {
                Ok(estimate) => info!("Estimated gas for token {}: {}", details.token_address, estimate),
                Err(e) => warn!("Gas estimation failed for token {}: {}", details.token_address, e),
            }

            match self.chain.call(&tx).await {
                Ok(output) => info!(
                    "Simulation succeeded for token {}: return data {}",
                    details.token_address, output
                ),
                Err(e) => warn!(
                    "Simulation failed for token {}: {} (revert data: {})",
                    details.token_address,
                    e,
                    e.revert_data().unwrap_or("none")
                ),
            }
        }

        info!("Local simulation finished: {} candidates checked", checked);
        DispatchOutcome::SimulatedOnly { candidates: checked }
    }

    // ── Production ────────────────────────────────────────────────────

    async fn submit_bundles(
        &self,
        opportunities: &[CrossedMarketDetails],
        block_number: u64,
        reward_percentage: u64,
    ) -> Result<DispatchOutcome, DispatchError> {
        let target = block_number + 1;

        for details in opportunities {
            info!("Bundle candidate:\n{}", details);

            let mut tx = match self.prepare(details, reward_percentage).await {
                Ok(tx) => tx,
                Err(reason) => {
                    skip(details, &reason);
                    continue;
                }
            };

            let estimate = match self.chain.estimate_gas(&tx).await {
                Ok(estimate) => estimate,
                Err(e) => {
                    skip(details, &SkipReason::Estimation(e));
                    continue;
                }
            };
            if estimate > self.config.gas_ceiling {
                skip(
                    details,
                    &SkipReason::AnomalousGas {
                        estimate,
                        ceiling: self.config.gas_ceiling,
                    },
                );
                continue;
            }
            tx.set_gas_limit(estimate.saturating_mul(2));

            let bundle = self.relay.sign_bundle(&[tx]).await?;

            let outcome = match self.relay.simulate(&bundle, target).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    skip(details, &SkipReason::Simulation(e.to_string()));
                    continue;
                }
            };
            if !outcome.is_success() {
                let reason = outcome
                    .error
                    .or(outcome.first_revert)
                    .unwrap_or_else(|| "unknown".to_string());
                skip(details, &SkipReason::Simulation(reason));
                continue;
            }
            info!(
                "Bundle simulated: coinbase diff={} ETH, effective gas price={} gwei",
                format_ether(outcome.coinbase_diff),
                outcome.effective_gas_price() / U256::from(1_000_000_000u64)
            );

            let (next, after_next) = try_join(
                self.relay.send_bundle(&bundle, target),
                self.relay.send_bundle(&bundle, target + 1),
            )
            .await?;
            info!(
                "Bundle submitted for token {} targeting blocks {} and {}",
                details.token_address, next.target_block, after_next.target_block
            );

            return Ok(DispatchOutcome::Submitted {
                token: details.token_address,
                submissions: vec![next, after_next],
            });
        }

        Err(DispatchError::NoSubmission {
            candidates: opportunities.len(),
        })
    }
}

fn skip(details: &CrossedMarketDetails, reason: &SkipReason) {
    warn!(
        "Skipping token {} (buy {} / sell {}, volume {}, profit {}): {}",
        details.token_address,
        details.buy_from_market.address(),
        details.sell_to_market.address(),
        format_ether(details.volume),
        format_signed_ether(details.profit),
        reason
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::test_support::{ScriptedMarket, TOKEN, WETH};
    use crate::chain::{FeeData, SignedBundle, SimulationOutcome, TxReceiptSummary};
    use crate::types::ETHER;
    use alloy::primitives::{address, Bytes, B256};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const EXECUTOR: Address = address!("00000000000000000000000000000000000000ee");
    const SENDER: Address = address!("00000000000000000000000000000000000000aa");
    const BLOCK: u64 = 100;

    // ── Mocks ─────────────────────────────────────────────────────────

    #[derive(Default)]
    struct MockChain {
        /// Popped per estimate; 200k once empty
        estimates: Mutex<VecDeque<Result<u64, ChainError>>>,
        call_error: Option<ChainError>,
        send_error: Option<ChainError>,
        /// Popped per balance read; zero once empty
        balances: Mutex<VecDeque<U256>>,
        estimated: AtomicUsize,
        called: AtomicUsize,
        sent: Mutex<Vec<TransactionRequest>>,
    }

    impl MockChain {
        fn with_estimates(estimates: Vec<Result<u64, ChainError>>) -> Self {
            Self {
                estimates: Mutex::new(estimates.into()),
                ..Default::default()
            }
        }
    }

    fn rpc_error(message: &str) -> ChainError {
        ChainError::Rpc {
            message: message.to_string(),
            data: Some("0xdeadbeef".to_string()),
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        fn sender(&self) -> Address {
            SENDER
        }

        async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64, ChainError> {
            self.estimated.fetch_add(1, Ordering::SeqCst);
            self.estimates.lock().unwrap().pop_front().unwrap_or(Ok(200_000))
        }

        async fn fee_data(&self) -> Result<FeeData, ChainError> {
            Ok(FeeData {
                gas_price: Some(30),
                max_fee_per_gas: Some(40),
                max_priority_fee_per_gas: Some(2),
            })
        }

        async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
            assert_eq!((token, owner), (WETH, EXECUTOR));
            Ok(self.balances.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn call(&self, _tx: &TransactionRequest) -> Result<Bytes, ChainError> {
            self.called.fetch_add(1, Ordering::SeqCst);
            match &self.call_error {
                Some(e) => Err(e.clone()),
                None => Ok(Bytes::new()),
            }
        }

        async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
            self.sent.lock().unwrap().push(tx);
            match &self.send_error {
                Some(e) => Err(e.clone()),
                None => Ok(TxHash::repeat_byte(0x11)),
            }
        }

        async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceiptSummary, ChainError> {
            Ok(TxReceiptSummary {
                tx_hash,
                success: true,
                block_number: Some(BLOCK + 1),
                gas_used: 180_000,
            })
        }
    }

    #[derive(Default)]
    struct MockRelay {
        simulation: SimulationOutcome,
        fail_send: bool,
        signed: Mutex<Vec<TransactionRequest>>,
        simulated_blocks: Mutex<Vec<u64>>,
        sent_blocks: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl BundleRelay for MockRelay {
        async fn sign_bundle(&self, txs: &[TransactionRequest]) -> Result<SignedBundle, RelayError> {
            self.signed.lock().unwrap().extend_from_slice(txs);
            Ok(SignedBundle {
                raw_txs: vec![Bytes::from(vec![0x02])],
            })
        }

        async fn simulate(
            &self,
            _bundle: &SignedBundle,
            block_number: u64,
        ) -> Result<SimulationOutcome, RelayError> {
            self.simulated_blocks.lock().unwrap().push(block_number);
            Ok(self.simulation.clone())
        }

        async fn send_bundle(
            &self,
            _bundle: &SignedBundle,
            target_block: u64,
        ) -> Result<BundleSubmission, RelayError> {
            if self.fail_send {
                return Err(RelayError::Transport("connection reset".to_string()));
            }
            self.sent_blocks.lock().unwrap().push(target_block);
            Ok(BundleSubmission {
                bundle_hash: B256::with_last_byte(target_block as u8),
                target_block,
            })
        }
    }

    // ── Fixtures ──────────────────────────────────────────────────────

    fn config(mode: ExecutionMode) -> ArbConfig {
        let mut config = ArbConfig::new(WETH, EXECUTOR);
        config.mode = mode;
        config
    }

    /// Scripted two-leg candidate; `id` distinguishes the markets
    fn candidate(id: u8, volume: U256, failing: bool) -> CrossedMarketDetails {
        let buy = ScriptedMarket::identity(id);
        let buy: Arc<dyn Market> = Arc::new(if failing { buy.failing_builds() } else { buy });
        CrossedMarketDetails {
            profit: I256::try_from(ETHER / U256::from(50u64)).unwrap(),
            volume,
            token_address: TOKEN,
            buy_from_market: buy,
            sell_to_market: Arc::new(ScriptedMarket::identity(id + 100)),
        }
    }

    fn decoded_volume(tx: &TransactionRequest) -> U256 {
        let input = tx.input.input().unwrap();
        IBundleExecutor::uniswapWethCall::abi_decode(input)
            .unwrap()
            .wethAmountToFirstMarket
    }

    fn dispatcher(mode: ExecutionMode, chain: MockChain, relay: MockRelay) -> Dispatcher<MockChain, MockRelay> {
        Dispatcher::new(config(mode), chain, relay)
    }

    // ── Draft ─────────────────────────────────────────────────────────

    #[test]
    fn test_draft_transaction() {
        let d = dispatcher(ExecutionMode::Production, MockChain::default(), MockRelay::default());
        let plan = ExecutionPlan {
            volume: ETHER,
            miner_reward: U256::from(8u64),
            targets: vec![Address::with_last_byte(1), Address::with_last_byte(2)],
            payloads: vec![Bytes::from(vec![1]), Bytes::from(vec![2])],
        };
        let tx = d.draft_transaction(&plan);

        assert_eq!(tx.from, Some(SENDER));
        assert_eq!(tx.to, Some(EXECUTOR.into()));
        assert_eq!(tx.gas_price, Some(0));
        assert_eq!(tx.gas, Some(DRAFT_GAS_LIMIT));

        let call = IBundleExecutor::uniswapWethCall::abi_decode(tx.input.input().unwrap()).unwrap();
        assert_eq!(call.wethAmountToFirstMarket, ETHER);
        assert_eq!(call.ethAmountToCoinbase, U256::from(8u64));
        assert_eq!(call.targets, plan.targets);
        assert_eq!(call.payloads, plan.payloads);
    }

    // ── Production ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_scenario_e_anomalous_gas_skipped() {
        let chain = MockChain::with_estimates(vec![Ok(1_500_000), Ok(300_000)]);
        let d = dispatcher(ExecutionMode::Production, chain, MockRelay::default());
        let first = candidate(1, ETHER, false);
        let second = candidate(2, ETHER * U256::from(2u64), false);

        let outcome = d.dispatch(&[first, second], BLOCK, 80).await.unwrap();

        let signed = d.relay().signed.lock().unwrap().clone();
        assert_eq!(signed.len(), 1);
        assert_eq!(decoded_volume(&signed[0]), ETHER * U256::from(2u64));
        assert_eq!(signed[0].gas, Some(600_000));

        assert_eq!(*d.relay().simulated_blocks.lock().unwrap(), vec![BLOCK + 1]);
        let mut sent = d.relay().sent_blocks.lock().unwrap().clone();
        sent.sort();
        assert_eq!(sent, vec![BLOCK + 1, BLOCK + 2]);

        match outcome {
            DispatchOutcome::Submitted { token, submissions } => {
                assert_eq!(token, TOKEN);
                assert_eq!(submissions.len(), 2);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_production_first_success_wins() {
        let d = dispatcher(ExecutionMode::Production, MockChain::default(), MockRelay::default());
        let candidates = [candidate(1, ETHER, false), candidate(2, ETHER, false)];

        d.dispatch(&candidates, BLOCK, 80).await.unwrap();
        assert_eq!(d.chain().estimated.load(Ordering::SeqCst), 1);
        assert_eq!(d.relay().signed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_production_build_and_estimate_failures_skip() {
        let chain = MockChain::with_estimates(vec![Err(rpc_error("execution reverted")), Ok(250_000)]);
        let d = dispatcher(ExecutionMode::Production, chain, MockRelay::default());
        let candidates = [
            candidate(1, ETHER, true),
            candidate(2, ETHER, false),
            candidate(3, ETHER * U256::from(3u64), false),
        ];

        d.dispatch(&candidates, BLOCK, 80).await.unwrap();
        // Build failure never reaches estimation
        assert_eq!(d.chain().estimated.load(Ordering::SeqCst), 2);
        let signed = d.relay().signed.lock().unwrap().clone();
        assert_eq!(decoded_volume(&signed[0]), ETHER * U256::from(3u64));
    }

    #[tokio::test]
    async fn test_production_simulation_revert_exhausts() {
        let relay = MockRelay {
            simulation: SimulationOutcome {
                first_revert: Some("0x08c379a0".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let d = dispatcher(ExecutionMode::Production, MockChain::default(), relay);
        let candidates = [candidate(1, ETHER, false), candidate(2, ETHER, false)];

        let err = d.dispatch(&candidates, BLOCK, 80).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoSubmission { candidates: 2 }));
        assert_eq!(d.relay().simulated_blocks.lock().unwrap().len(), 2);
        assert!(d.relay().sent_blocks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_production_empty_list_is_error() {
        let d = dispatcher(ExecutionMode::Production, MockChain::default(), MockRelay::default());
        let err = d.dispatch(&[], BLOCK, 80).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoSubmission { candidates: 0 }));
    }

    #[tokio::test]
    async fn test_production_relay_send_failure_propagates() {
        let relay = MockRelay {
            fail_send: true,
            ..Default::default()
        };
        let d = dispatcher(ExecutionMode::Production, MockChain::default(), relay);
        let err = d.dispatch(&[candidate(1, ETHER, false)], BLOCK, 80).await.unwrap_err();
        assert!(matches!(err, DispatchError::Relay(RelayError::Transport(_))));
    }

    // ── LocalSimulation ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_scenario_d_simulation_failure_continues() {
        let chain = MockChain {
            call_error: Some(rpc_error("execution reverted")),
            ..Default::default()
        };
        let d = dispatcher(ExecutionMode::LocalSimulation, chain, MockRelay::default());
        let candidates = [candidate(1, ETHER, false), candidate(2, ETHER, false)];

        let outcome = d.dispatch(&candidates, BLOCK, 80).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::SimulatedOnly { candidates: 2 });
        assert_eq!(d.chain().called.load(Ordering::SeqCst), 2);
        assert!(d.chain().sent.lock().unwrap().is_empty());
        assert!(d.relay().signed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_simulation_estimate_failure_still_calls() {
        let chain = MockChain::with_estimates(vec![Err(rpc_error("out of gas"))]);
        let d = dispatcher(ExecutionMode::LocalSimulation, chain, MockRelay::default());

        let outcome = d.dispatch(&[candidate(1, ETHER, false)], BLOCK, 80).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::SimulatedOnly { candidates: 1 });
        assert_eq!(d.chain().called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_local_simulation_empty_is_ok() {
        let d = dispatcher(ExecutionMode::LocalSimulation, MockChain::default(), MockRelay::default());
        let outcome = d.dispatch(&[candidate(1, ETHER, true)], BLOCK, 80).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::SimulatedOnly { candidates: 0 });
    }

    // ── LocalExecution ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_local_execution_gate() {
        let d = dispatcher(
            ExecutionMode::LocalExecution { every_n_blocks: 3 },
            MockChain::default(),
            MockRelay::default(),
        );
        let candidates = [candidate(1, ETHER, false)];

        let outcome = d.dispatch(&candidates, 101, 80).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Skipped { block_number: 101 });
        assert_eq!(d.chain().estimated.load(Ordering::SeqCst), 0);

        let outcome = d.dispatch(&candidates, 102, 80).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Executed { .. }));
    }

    #[tokio::test]
    async fn test_local_execution_reports_balance_delta() {
        let chain = MockChain {
            balances: Mutex::new(VecDeque::from([U256::from(1_000u64), U256::from(1_250u64)])),
            ..Default::default()
        };
        let d = dispatcher(ExecutionMode::LocalExecution { every_n_blocks: 1 }, chain, MockRelay::default());

        let outcome = d.dispatch(&[candidate(1, ETHER, false)], BLOCK, 80).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Executed {
                token: TOKEN,
                tx_hash: TxHash::repeat_byte(0x11),
                success: true,
                balance_delta: Some(I256::try_from(250i64).unwrap()),
            }
        );

        let sent = d.chain().sent.lock().unwrap().clone();
        assert_eq!(sent[0].gas, Some(400_000));
        assert_eq!(sent[0].max_fee_per_gas, Some(40));
        assert_eq!(sent[0].gas_price, None);
    }

    #[tokio::test]
    async fn test_local_execution_estimate_failure_advances() {
        let chain = MockChain::with_estimates(vec![Err(rpc_error("execution reverted"))]);
        let d = dispatcher(ExecutionMode::LocalExecution { every_n_blocks: 1 }, chain, MockRelay::default());
        let candidates = [candidate(1, ETHER, false), candidate(2, ETHER * U256::from(2u64), false)];

        d.dispatch(&candidates, BLOCK, 80).await.unwrap();
        let sent = d.chain().sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(decoded_volume(&sent[0]), ETHER * U256::from(2u64));
    }

    #[tokio::test]
    async fn test_local_execution_send_failure_stops() {
        let chain = MockChain {
            send_error: Some(rpc_error("nonce too low")),
            ..Default::default()
        };
        let d = dispatcher(ExecutionMode::LocalExecution { every_n_blocks: 1 }, chain, MockRelay::default());
        let candidates = [candidate(1, ETHER, false), candidate(2, ETHER, false)];

        let err = d.dispatch(&candidates, BLOCK, 80).await.unwrap_err();
        assert!(matches!(err, DispatchError::LocalSendFailed { token, .. } if token == TOKEN));
        assert_eq!(d.chain().estimated.load(Ordering::SeqCst), 1);
        assert_eq!(d.chain().sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_local_execution_exhausted_is_error() {
        let chain = MockChain::with_estimates(vec![Err(rpc_error("a")), Err(rpc_error("b"))]);
        let d = dispatcher(ExecutionMode::LocalExecution { every_n_blocks: 1 }, chain, MockRelay::default());
        let candidates = [candidate(1, ETHER, false), candidate(2, ETHER, false)];

        let err = d.dispatch(&candidates, BLOCK, 80).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoSubmission { candidates: 2 }));
    }
}
