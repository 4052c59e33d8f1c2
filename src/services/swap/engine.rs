// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::parsing::{format_base_units, short_hash, to_base_units};
use crate::domain::constants::{NATIVE_DECIMALS, NATIVE_SYMBOL, WRAPPED_NATIVE_SYMBOL};
use crate::network::gas::{CallKind, GasEstimator};
use crate::network::ledger::{ContractCall, SharedLedger};
use crate::services::swap::calls::{self, SingleHop};
use crate::services::swap::pairs::{Direction, PairBook, SwapPairConfig};
use crate::services::swap::queue::{NonceSequencedQueue, TransactionRequest, TxStatus};
use alloy::primitives::{Address, B256, U256};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of one swap cycle. Only `Swapped` counts as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Swapped { tx_hash: B256 },
    InsufficientBalance { required: String, available: String },
    ApprovalFailed,
    /// The swap itself was mined and reverted.
    Rejected,
    /// Anything else: unknown pair, read failure, submission failure.
    Failed { reason: String },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Swapped { .. })
    }
}

pub struct EngineSettings {
    pub wallet: Address,
    pub wrapped_native: Address,
    pub router: Address,
    pub deadline_secs: u64,
}

/// Ping-pong swap driver shared by every pair.
pub struct SwapEngine {
    ledger: SharedLedger,
    queue: NonceSequencedQueue,
    gas: GasEstimator,
    pairs: Arc<PairBook>,
    settings: EngineSettings,
    rng: Mutex<StdRng>,
}

/// Amounts for one cycle, in both human and base units.
struct Leg {
    amount: Decimal,
    amount_in: U256,
    source_symbol: String,
    target_symbol: String,
}

impl SwapEngine {
    pub fn new(
        ledger: SharedLedger,
        queue: NonceSequencedQueue,
        gas: GasEstimator,
        pairs: Arc<PairBook>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            ledger,
            queue,
            gas,
            pairs,
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the amount sampler, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub async fn run_one_cycle(&self, pair_key: &str) -> CycleOutcome {
        let direction = self.pairs.next_direction(pair_key);
        let Some(pair) = self.pairs.get(pair_key) else {
            tracing::error!(target: "system", pair = pair_key, "Unknown pair");
            return CycleOutcome::Failed {
                reason: self.pairs.unknown_pair_message(pair_key),
            };
        };

        let amount = self.sample_amount(&pair, direction);
        let outcome = match self.prepare_leg(&pair, direction, amount).await {
            Ok(leg) => self.execute(&pair, direction, leg).await,
            Err(outcome) => outcome,
        };

        match &outcome {
            CycleOutcome::Swapped { tx_hash } => {
                tracing::info!(
                    target: "swap",
                    status = "success",
                    pair = %pair.pair_key,
                    %direction,
                    %amount,
                    hash = %short_hash(tx_hash),
                    "Swap succeeded"
                );
            }
            CycleOutcome::InsufficientBalance { .. } => {}
            other => {
                tracing::error!(
                    target: "swap",
                    pair = %pair.pair_key,
                    %direction,
                    %amount,
                    outcome = ?other,
                    "Swap failed"
                );
            }
        }
        outcome
    }

    fn sample_amount(&self, pair: &SwapPairConfig, direction: Direction) -> Decimal {
        let range = pair.source_range(direction);
        match self.rng.lock() {
            Ok(mut rng) => range.sample(&mut *rng),
            Err(poisoned) => range.sample(&mut *poisoned.into_inner()),
        }
    }

    fn is_wrap_pair(&self, pair: &SwapPairConfig) -> bool {
        pair.token == self.settings.wrapped_native
    }

    async fn prepare_leg(
        &self,
        pair: &SwapPairConfig,
        direction: Direction,
        amount: Decimal,
    ) -> Result<Leg, CycleOutcome> {
        let failed = |reason: String| CycleOutcome::Failed { reason };
        let wallet = self.settings.wallet;

        match direction {
            Direction::NativeToToken => {
                let amount_in = to_base_units(amount, NATIVE_DECIMALS)
                    .map_err(|e| failed(e.to_string()))?;
                let kind = if self.is_wrap_pair(pair) {
                    CallKind::Wrap
                } else {
                    CallKind::RouterSwap
                };
                let balance = self
                    .ledger
                    .native_balance(wallet)
                    .await
                    .map_err(|e| failed(e.to_string()))?;
                let gas_cost = self.gas.estimate_cost(kind).await;
                let required = amount_in.saturating_add(gas_cost);
                if balance < required {
                    return Err(self.insufficient(
                        NATIVE_SYMBOL,
                        format_base_units(required, NATIVE_DECIMALS),
                        format_base_units(balance, NATIVE_DECIMALS),
                        "swap + gas",
                    ));
                }
                Ok(Leg {
                    amount,
                    amount_in,
                    source_symbol: NATIVE_SYMBOL.to_string(),
                    target_symbol: pair.token_symbol.clone(),
                })
            }
            Direction::TokenToNative => {
                let decimals = self
                    .ledger
                    .token_decimals(pair.token)
                    .await
                    .map_err(|e| failed(e.to_string()))?;
                let amount_in =
                    to_base_units(amount, decimals).map_err(|e| failed(e.to_string()))?;
                let balance = self
                    .ledger
                    .token_balance(pair.token, wallet)
                    .await
                    .map_err(|e| failed(e.to_string()))?;
                if balance < amount_in {
                    return Err(self.insufficient(
                        &pair.token_symbol,
                        amount.to_string(),
                        format_base_units(balance, decimals),
                        "swap",
                    ));
                }
                Ok(Leg {
                    amount,
                    amount_in,
                    source_symbol: pair.token_symbol.clone(),
                    target_symbol: NATIVE_SYMBOL.to_string(),
                })
            }
        }
    }

    fn insufficient(
        &self,
        symbol: &str,
        required: String,
        available: String,
        covers: &str,
    ) -> CycleOutcome {
        tracing::warn!(
            target: "swap",
            %symbol,
            %required,
            %available,
            "Insufficient {} balance: {} < {} ({})",
            symbol,
            available,
            required,
            covers
        );
        CycleOutcome::InsufficientBalance {
            required,
            available,
        }
    }

    async fn execute(&self, pair: &SwapPairConfig, direction: Direction, leg: Leg) -> CycleOutcome {
        tracing::info!(
            target: "swap",
            pair = %pair.pair_key,
            "Swapping {} {} -> {}",
            leg.amount,
            leg.source_symbol,
            leg.target_symbol
        );

        let wrapped = self.settings.wrapped_native;
        match (direction, self.is_wrap_pair(pair)) {
            (Direction::NativeToToken, true) => {
                let call = calls::deposit(wrapped, leg.amount_in);
                self.submit_terminal(call, &leg).await
            }
            (Direction::TokenToNative, true) => {
                let call = calls::withdraw(wrapped, leg.amount_in);
                self.submit_terminal(call, &leg).await
            }
            (Direction::NativeToToken, false) => self.native_to_token(pair, leg).await,
            (Direction::TokenToNative, false) => self.token_to_native(pair, leg).await,
        }
    }

    async fn native_to_token(&self, pair: &SwapPairConfig, leg: Leg) -> CycleOutcome {
        let expected = pair.expected_output(Direction::NativeToToken, leg.amount);
        let minimum = pair.minimum_output(expected);
        let decimals = match self.ledger.token_decimals(pair.token).await {
            Ok(d) => d,
            Err(e) => {
                return CycleOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };
        let amount_out_min = match to_base_units(minimum, decimals) {
            Ok(v) => v,
            Err(e) => {
                return CycleOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };
        tracing::info!(
            target: "swap",
            pair = %pair.pair_key,
            %expected,
            %minimum,
            "Expected output {} {}, minimum {} {}",
            expected,
            pair.token_symbol,
            minimum,
            pair.token_symbol
        );

        let wrapped = self.settings.wrapped_native;
        if let Err(outcome) = self
            .ensure_allowance(wrapped, WRAPPED_NATIVE_SYMBOL, leg.amount_in, &leg)
            .await
        {
            return outcome;
        }

        let hop = SingleHop {
            token_in: wrapped,
            token_out: pair.token,
            fee_tier: pair.fee_tier,
            recipient: self.settings.wallet,
            amount_in: leg.amount_in,
            amount_out_min,
        };
        let call = calls::swap_native_for_token(self.settings.router, &hop, self.deadline());
        self.submit_terminal(call, &leg).await
    }

    async fn token_to_native(&self, pair: &SwapPairConfig, leg: Leg) -> CycleOutcome {
        let expected = pair.expected_output(Direction::TokenToNative, leg.amount);
        let minimum = pair.minimum_output(expected);
        // Reference only: the on-chain minimum is zero, checked after the fact.
        tracing::debug!(target: "swap", %expected, %minimum, "Expected native output");

        if let Err(outcome) = self
            .ensure_allowance(pair.token, &pair.token_symbol, leg.amount_in, &leg)
            .await
        {
            return outcome;
        }

        let wallet = self.settings.wallet;
        let before = self.ledger.native_balance(wallet).await.ok();

        let call = calls::swap_token_for_native(
            self.settings.router,
            pair.token,
            self.settings.wrapped_native,
            pair.fee_tier,
            leg.amount_in,
            wallet,
            self.deadline(),
        );
        let outcome = self.submit_terminal(call, &leg).await;

        if outcome.is_success() {
            let after = self.ledger.native_balance(wallet).await.ok();
            match (before, after) {
                (Some(before), Some(after)) if after > before => {
                    tracing::debug!(
                        target: "swap",
                        balance = %format_base_units(after, NATIVE_DECIMALS),
                        "Native balance after swap"
                    );
                }
                (Some(before), Some(after)) => {
                    tracing::warn!(
                        target: "swap",
                        pair = %pair.pair_key,
                        before = %format_base_units(before, NATIVE_DECIMALS),
                        after = %format_base_units(after, NATIVE_DECIMALS),
                        "No native received after swap"
                    );
                }
                _ => {
                    tracing::warn!(
                        target: "swap",
                        pair = %pair.pair_key,
                        "Could not verify native balance after swap"
                    );
                }
            }
        }
        outcome
    }

    /// Approval gate: approves exactly `amount` when the router's allowance is short.
    async fn ensure_allowance(
        &self,
        token: Address,
        symbol: &str,
        amount: U256,
        leg: &Leg,
    ) -> Result<(), CycleOutcome> {
        let router = self.settings.router;
        let allowance = self
            .ledger
            .allowance(token, self.settings.wallet, router)
            .await
            .map_err(|e| CycleOutcome::Failed {
                reason: e.to_string(),
            })?;
        if allowance >= amount {
            return Ok(());
        }

        tracing::info!(target: "swap", token = symbol, "Requesting approval for {}", symbol);
        let call = calls::approve(token, router, amount);
        let gas_limit = self.gas.estimate(&call).await;
        let request = TransactionRequest::new(
            call,
            gas_limit,
            format!("Approve {} {} for {}", leg.amount, symbol, leg.source_symbol),
        );
        let outcome = self.queue.submit(request).await;
        if outcome.is_success() {
            tracing::info!(target: "swap", token = symbol, "Approval succeeded");
            Ok(())
        } else {
            tracing::error!(
                target: "swap",
                token = symbol,
                status = ?outcome.status,
                "Approval failed; aborting swap"
            );
            Err(CycleOutcome::ApprovalFailed)
        }
    }

    async fn submit_terminal(&self, call: ContractCall, leg: &Leg) -> CycleOutcome {
        let gas_limit = self.gas.estimate(&call).await;
        let request = TransactionRequest::new(
            call,
            gas_limit,
            format!(
                "Swap {} {} to {}",
                leg.amount, leg.source_symbol, leg.target_symbol
            ),
        );
        let outcome = self.queue.submit(request).await;
        match (outcome.status, outcome.tx_hash) {
            (TxStatus::Success, Some(tx_hash)) => CycleOutcome::Swapped { tx_hash },
            (TxStatus::ContractRejected, _) => CycleOutcome::Rejected,
            _ => CycleOutcome::Failed {
                reason: outcome
                    .message
                    .unwrap_or_else(|| "transaction failed".to_string()),
            },
        }
    }

    fn deadline(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        now.saturating_add(self.settings.deadline_secs)
    }
}
