// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::parsing::parse_range;
use crate::domain::constants::{
    DEFAULT_CANCEL_POLL_MS, DEFAULT_DEADLINE_SECS, DEFAULT_MAX_DELAY_SECS,
    DEFAULT_MIN_DELAY_SECS, DEFAULT_PAIRS, SWAP_ROUTER, WRAPPED_NATIVE_SYMBOL,
};
use crate::domain::error::AppError;
use crate::services::swap::pairs::{AmountRange, SwapPairConfig};
use crate::services::swap::session::SessionOptions;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Per-pair amount override, each side written as `"min,max"`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RangeOverride {
    pub native: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    // General
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub log_json: bool,

    // Network
    pub rpc_url: Option<String>,
    /// Deployment-specific alias for `rpc_url`.
    pub rpc_url_xos: Option<String>,

    // Identity
    pub private_key: String,

    // Tokens (symbol -> contract)
    #[serde(default)]
    pub token_addresses: HashMap<String, Address>,

    // Loop timing
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default = "default_cancel_poll_ms")]
    pub cancel_poll_ms: u64,

    // Transactions
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    pub receipt_timeout_secs: Option<u64>,
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    #[serde(default)]
    pub amount_ranges: HashMap<String, RangeOverride>,
}

// Defaults
fn default_min_delay_secs() -> u64 {
    DEFAULT_MIN_DELAY_SECS
}
fn default_max_delay_secs() -> u64 {
    DEFAULT_MAX_DELAY_SECS
}
fn default_cancel_poll_ms() -> u64 {
    DEFAULT_CANCEL_POLL_MS
}
fn default_receipt_poll_ms() -> u64 {
    1_000
}
fn default_deadline_secs() -> u64 {
    DEFAULT_DEADLINE_SECS
}

impl Settings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected_path) = path {
            builder = builder.add_source(File::from(Path::new(selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Env overrides the file; CLI flags are applied on top in main.
        builder = builder.add_source(Environment::default());

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.rpc_url()?;
        self.signer()?;
        if self.min_delay_secs > self.max_delay_secs {
            return Err(AppError::Validation {
                field: "min_delay_secs".into(),
                message: format!(
                    "must not exceed max_delay_secs ({} > {})",
                    self.min_delay_secs, self.max_delay_secs
                ),
            });
        }
        if self.cancel_poll_ms == 0 {
            return Err(AppError::Validation {
                field: "cancel_poll_ms".into(),
                message: "must be positive".into(),
            });
        }
        self.pair_configs()?;
        Ok(())
    }

    pub fn rpc_url(&self) -> Result<Url, AppError> {
        let raw = self
            .rpc_url
            .as_deref()
            .or(self.rpc_url_xos.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Config("RPC_URL is missing".to_string()))?;
        Url::parse(raw).map_err(|e| AppError::Config(format!("Invalid RPC URL {raw}: {e}")))
    }

    pub fn signer(&self) -> Result<PrivateKeySigner, AppError> {
        let key = self.private_key.trim();
        if key.is_empty() {
            return Err(AppError::Config("PRIVATE_KEY is missing".to_string()));
        }
        PrivateKeySigner::from_str(key)
            .map_err(|_| AppError::Config("PRIVATE_KEY is not a valid secp256k1 key".to_string()))
    }

    /// Configured map first (keys are case-insensitive), then `<SYMBOL>_ADDRESS`.
    pub fn token_address(&self, symbol: &str) -> Result<Address, AppError> {
        let wanted = symbol.to_ascii_uppercase();
        if let Some(addr) = self
            .token_addresses
            .iter()
            .find(|(k, _)| k.to_ascii_uppercase() == wanted)
            .map(|(_, v)| *v)
        {
            return Ok(addr);
        }
        let env_key = format!("{wanted}_ADDRESS");
        let raw = std::env::var(&env_key)
            .map_err(|_| AppError::Config(format!("{env_key} is missing")))?;
        Address::from_str(raw.trim()).map_err(|_| AppError::InvalidAddress(raw))
    }

    pub fn wrapped_native(&self) -> Result<Address, AppError> {
        self.token_address(WRAPPED_NATIVE_SYMBOL)
    }

    /// Compiled-in pair table with token addresses resolved and overrides applied.
    pub fn pair_configs(&self) -> Result<Vec<SwapPairConfig>, AppError> {
        DEFAULT_PAIRS
            .iter()
            .map(|spec| {
                let token = self.token_address(spec.token_symbol)?;
                let mut pair = SwapPairConfig::from_spec(spec, token)?;
                if let Some(over) = self.range_override(spec.pair_key) {
                    if let Some(raw) = over.native.as_deref() {
                        let (min, max) = parse_range(raw)?;
                        pair.native_range = AmountRange::new(min, max)?;
                    }
                    if let Some(raw) = over.token.as_deref() {
                        let (min, max) = parse_range(raw)?;
                        pair.token_range = AmountRange::new(min, max)?;
                    }
                }
                Ok(pair)
            })
            .collect()
    }

    fn range_override(&self, pair_key: &str) -> Option<&RangeOverride> {
        self.amount_ranges
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(pair_key))
            .map(|(_, v)| v)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn receipt_timeout(&self) -> Option<Duration> {
        self.receipt_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    pub fn session_options(&self) -> Result<SessionOptions, AppError> {
        let mut options = SessionOptions::new(self.wrapped_native()?, self.pair_configs()?);
        options.router = SWAP_ROUTER;
        options.deadline_secs = self.deadline_secs;
        options.min_delay = Duration::from_secs(self.min_delay_secs);
        options.max_delay = Duration::from_secs(self.max_delay_secs);
        options.cancel_poll = Duration::from_millis(self.cancel_poll_ms);
        Ok(options)
    }
}
