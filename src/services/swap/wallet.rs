// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::parsing::{format_base_units, short_address};
use crate::domain::constants::{NATIVE_DECIMALS, NATIVE_SYMBOL, NETWORK_NAME};
use crate::domain::error::AppError;
use crate::network::ledger::SharedLedger;
use crate::services::swap::scheduler::BalanceRefresh;
use alloy::primitives::Address;
use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub address: Address,
    pub native: String,
    /// (symbol, formatted balance); "0" when the read failed.
    pub tokens: Vec<(String, String)>,
}

impl fmt::Display for WalletSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}={}",
            short_address(&self.address),
            NETWORK_NAME,
            NATIVE_SYMBOL,
            self.native
        )?;
        for (symbol, balance) in &self.tokens {
            write!(f, " {symbol}={balance}")?;
        }
        Ok(())
    }
}

/// Reads wallet balances for the native asset and every tracked token.
pub struct WalletReporter {
    ledger: SharedLedger,
    tokens: Vec<(String, Address)>,
}

impl WalletReporter {
    pub fn new(ledger: SharedLedger, tokens: Vec<(String, Address)>) -> Self {
        Self { ledger, tokens }
    }

    pub async fn snapshot(&self) -> Result<WalletSnapshot, AppError> {
        let address = self.ledger.wallet_address();
        let native = self.ledger.native_balance(address).await?;

        let mut tokens = Vec::with_capacity(self.tokens.len());
        for (symbol, token) in &self.tokens {
            let formatted = match self.token_balance(*token, address).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(
                        target: "system",
                        token = %symbol,
                        error = %e,
                        "Failed to fetch token balance"
                    );
                    "0".to_string()
                }
            };
            tokens.push((symbol.clone(), formatted));
        }

        Ok(WalletSnapshot {
            address,
            native: format_base_units(native, NATIVE_DECIMALS),
            tokens,
        })
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<String, AppError> {
        let decimals = self.ledger.token_decimals(token).await?;
        let balance = self.ledger.token_balance(token, owner).await?;
        Ok(format_base_units(balance, decimals))
    }
}

#[async_trait]
impl BalanceRefresh for WalletReporter {
    async fn refresh(&self) {
        match self.snapshot().await {
            Ok(snapshot) => {
                tracing::info!(target: "system", wallet = %snapshot, "Wallet information updated");
            }
            Err(e) => {
                tracing::error!(target: "system", error = %e, "Failed to fetch wallet data");
            }
        }
    }
}
