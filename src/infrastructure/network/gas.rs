// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::constants::{
    DEFAULT_APPROVE_GAS, DEFAULT_ROUTER_SWAP_GAS, DEFAULT_ROUTER_SWAP_UNWRAP_GAS,
    DEFAULT_WRAP_GAS, FALLBACK_GAS_PRICE_WEI, MULTI_LEG_GAS_MARGIN_PCT,
    SINGLE_LEG_GAS_MARGIN_PCT,
};
use crate::network::ledger::{ContractCall, SharedLedger};
use alloy::primitives::U256;

/// What an outbound call does, which decides its gas margin and fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Wrap,
    Unwrap,
    Approve,
    /// Router multicall with a single exact-input leg.
    RouterSwap,
    /// Router multicall combining a swap leg with an unwrap leg.
    RouterSwapAndUnwrap,
}

impl CallKind {
    pub fn margin_pct(self) -> u64 {
        match self {
            CallKind::RouterSwapAndUnwrap => MULTI_LEG_GAS_MARGIN_PCT,
            _ => SINGLE_LEG_GAS_MARGIN_PCT,
        }
    }

    pub fn default_gas_limit(self) -> u64 {
        match self {
            CallKind::Wrap | CallKind::Unwrap => DEFAULT_WRAP_GAS,
            CallKind::Approve => DEFAULT_APPROVE_GAS,
            CallKind::RouterSwap => DEFAULT_ROUTER_SWAP_GAS,
            CallKind::RouterSwapAndUnwrap => DEFAULT_ROUTER_SWAP_UNWRAP_GAS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CallKind::Wrap => "deposit",
            CallKind::Unwrap => "withdraw",
            CallKind::Approve => "approve",
            CallKind::RouterSwap => "swap",
            CallKind::RouterSwapAndUnwrap => "swap+unwrap",
        }
    }
}

pub fn apply_margin(raw: u64, margin_pct: u64) -> u64 {
    let scaled = u128::from(raw) * u128::from(margin_pct) / 100;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Gas limits and fee data for outbound calls. Never fails: every network
/// error degrades to a conservative default.
#[derive(Clone)]
pub struct GasEstimator {
    ledger: SharedLedger,
}

impl GasEstimator {
    pub fn new(ledger: SharedLedger) -> Self {
        Self { ledger }
    }

    pub async fn estimate(&self, call: &ContractCall) -> u64 {
        let kind = call.kind;
        match self.ledger.estimate_gas(call).await {
            Ok(raw) => {
                let limit = apply_margin(raw, kind.margin_pct());
                tracing::debug!(
                    target: "swap",
                    call = kind.label(),
                    raw,
                    gas_limit = limit,
                    "Gas estimate"
                );
                limit
            }
            Err(e) => {
                let fallback = kind.default_gas_limit();
                tracing::debug!(
                    target: "swap",
                    call = kind.label(),
                    error = %e,
                    gas_limit = fallback,
                    "Gas estimate failed; using default"
                );
                fallback
            }
        }
    }

    pub async fn gas_price(&self) -> u128 {
        match self.ledger.gas_price().await {
            Ok(price) => price,
            Err(e) => {
                tracing::debug!(
                    target: "swap",
                    error = %e,
                    "Gas price fetch failed; using 5 gwei"
                );
                FALLBACK_GAS_PRICE_WEI
            }
        }
    }

    /// Worst-case fee for a call of `kind` at its default limit.
    pub async fn estimate_cost(&self, kind: CallKind) -> U256 {
        let price = self.gas_price().await;
        U256::from(price).saturating_mul(U256::from(kind.default_gas_limit()))
    }
}
