// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::constants::{
    DEFAULT_CANCEL_POLL_MS, DEFAULT_DEADLINE_SECS, DEFAULT_MAX_DELAY_SECS,
    DEFAULT_MIN_DELAY_SECS, SWAP_ROUTER, WRAPPED_NATIVE_SYMBOL,
};
use crate::domain::error::AppError;
use crate::network::gas::GasEstimator;
use crate::network::ledger::SharedLedger;
use crate::services::swap::engine::{EngineSettings, SwapEngine};
use crate::services::swap::pairs::{Asset, PairBook, SwapPairConfig};
use crate::services::swap::queue::NonceSequencedQueue;
use crate::services::swap::scheduler::{CancellationSignal, RunReport, SwapScheduler};
use crate::services::swap::wallet::{WalletReporter, WalletSnapshot};
use alloy::primitives::Address;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct SessionOptions {
    pub wrapped_native: Address,
    pub router: Address,
    pub pairs: Vec<SwapPairConfig>,
    pub deadline_secs: u64,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub cancel_poll: Duration,
    /// Fixed seed for amount sampling; entropy when unset.
    pub rng_seed: Option<u64>,
}

impl SessionOptions {
    pub fn new(wrapped_native: Address, pairs: Vec<SwapPairConfig>) -> Self {
        Self {
            wrapped_native,
            router: SWAP_ROUTER,
            pairs,
            deadline_secs: DEFAULT_DEADLINE_SECS,
            min_delay: Duration::from_secs(DEFAULT_MIN_DELAY_SECS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            cancel_poll: Duration::from_millis(DEFAULT_CANCEL_POLL_MS),
            rng_seed: None,
        }
    }
}

/// Everything one wallet needs to run swap loops: the queue worker that owns
/// its nonce, the pair book, the engine and the scheduler.
pub struct SwapSession {
    queue: NonceSequencedQueue,
    pairs: Arc<PairBook>,
    engine: Arc<SwapEngine>,
    scheduler: SwapScheduler,
    reporter: Arc<WalletReporter>,
    shutdown: CancellationToken,
    worker: JoinHandle<()>,
}

impl SwapSession {
    pub fn start(ledger: SharedLedger, options: SessionOptions) -> Self {
        let shutdown = CancellationToken::new();
        let (queue, worker) = NonceSequencedQueue::spawn(ledger.clone(), shutdown.clone());

        let mut tokens = vec![(WRAPPED_NATIVE_SYMBOL.to_string(), options.wrapped_native)];
        for pair in &options.pairs {
            if !tokens.iter().any(|(_, addr)| *addr == pair.token) {
                tokens.push((pair.token_symbol.clone(), pair.token));
            }
        }
        let reporter = Arc::new(WalletReporter::new(ledger.clone(), tokens));

        let pairs = Arc::new(PairBook::new(options.pairs));
        let settings = EngineSettings {
            wallet: ledger.wallet_address(),
            wrapped_native: options.wrapped_native,
            router: options.router,
            deadline_secs: options.deadline_secs,
        };
        let mut engine = SwapEngine::new(
            ledger.clone(),
            queue.clone(),
            GasEstimator::new(ledger),
            pairs.clone(),
            settings,
        );
        if let Some(seed) = options.rng_seed {
            engine = engine.with_rng(StdRng::seed_from_u64(seed));
        }

        let scheduler = SwapScheduler::new(
            Arc::new(CancellationSignal::new()),
            options.min_delay,
            options.max_delay,
            options.cancel_poll,
        )
        .with_refresher(reporter.clone());

        Self {
            queue,
            pairs,
            engine: Arc::new(engine),
            scheduler,
            reporter,
            shutdown,
            worker,
        }
    }

    /// Run `iterations` swap cycles on `pair_key`. Fails fast only when the pair
    /// is unknown or a loop is already running.
    pub async fn start_swap_loop(
        &self,
        pair_key: &str,
        iterations: u32,
    ) -> Result<RunReport, AppError> {
        let pair = self.pairs.get(pair_key).ok_or_else(|| AppError::Validation {
            field: "pair".into(),
            message: self.pairs.unknown_pair_message(pair_key),
        })?;
        let engine = &self.engine;
        let key = pair.pair_key.as_str();
        self.scheduler
            .run(
                key,
                move || async move { engine.run_one_cycle(key).await.is_success() },
                iterations,
            )
            .await
    }

    /// Stop the running loop. Does nothing when no loop is running.
    pub fn stop_swap_loop(&self) {
        if !self.scheduler.is_running() {
            tracing::debug!(target: "system", "Stop requested with no loop running");
            return;
        }
        tracing::info!(target: "system", "Stop requested");
        self.scheduler.signal().cancel();
    }

    pub fn set_amount_range(
        &self,
        pair_key: &str,
        asset: Asset,
        min: Decimal,
        max: Decimal,
    ) -> Result<(), AppError> {
        self.pairs.set_amount_range(pair_key, asset, min, max)
    }

    /// Shared stop flag, for wiring signal handlers.
    pub fn cancel_signal(&self) -> Arc<CancellationSignal> {
        self.scheduler.signal().clone()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn pairs(&self) -> &Arc<PairBook> {
        &self.pairs
    }

    pub fn engine(&self) -> &Arc<SwapEngine> {
        &self.engine
    }

    pub fn queue(&self) -> &NonceSequencedQueue {
        &self.queue
    }

    pub async fn wallet_snapshot(&self) -> Result<WalletSnapshot, AppError> {
        self.reporter.snapshot().await
    }

    /// Handle for stopping the queue worker from another task.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the queue worker. An in-flight transaction finishes first.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.worker.await {
            tracing::error!(target: "system", error = %e, "Transaction queue worker panicked");
        }
    }
}
