// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::constants::{AMOUNT_PRECISION, PairSpec};
use crate::domain::error::AppError;
use alloy::primitives::Address;
use dashmap::DashMap;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Native spent, token received.
    NativeToToken,
    /// Token spent, native received.
    TokenToNative,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::NativeToToken => Direction::TokenToNative,
            Direction::TokenToNative => Direction::NativeToToken,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::NativeToToken => f.write_str("NATIVE_TO_TOKEN"),
            Direction::TokenToNative => f.write_str("TOKEN_TO_NATIVE"),
        }
    }
}

/// Which side of a pair an amount range belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    Native,
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountRange {
    pub min: Decimal,
    pub max: Decimal,
}

fn micro_units(value: Decimal) -> Option<Decimal> {
    value.checked_mul(Decimal::from(10u64.pow(AMOUNT_PRECISION)))
}

impl AmountRange {
    pub fn new(min: Decimal, max: Decimal) -> Result<Self, AppError> {
        if min <= Decimal::ZERO || max <= min {
            return Err(AppError::Validation {
                field: "amount_range".into(),
                message: format!("need 0 < min < max, got {min}..{max}"),
            });
        }
        // Sampling works in i64 micro-units.
        if micro_units(max).and_then(|v| v.floor().to_i64()).is_none() {
            return Err(AppError::Validation {
                field: "amount_range".into(),
                message: format!("max {max} is too large"),
            });
        }
        Ok(Self { min, max })
    }

    /// Uniform sample in `[min, max]` at `AMOUNT_PRECISION` decimal places.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Decimal {
        let lo = micro_units(self.min).and_then(|v| v.ceil().to_i64());
        let hi = micro_units(self.max).and_then(|v| v.floor().to_i64());
        match (lo, hi) {
            (Some(lo), Some(hi)) if lo <= hi => {
                Decimal::new(rng.gen_range(lo..=hi), AMOUNT_PRECISION)
            }
            // Range narrower than one step at this precision.
            _ => self.min,
        }
    }

    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min && amount <= self.max
    }
}

pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

/// Runtime configuration of one native/token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPairConfig {
    pub pair_key: String,
    pub token_symbol: String,
    pub token: Address,
    pub native_range: AmountRange,
    pub token_range: AmountRange,
    pub fee_tier: u32,
    /// Static rate: native units per token unit.
    pub native_per_token: Decimal,
    pub slippage_tolerance: Decimal,
}

impl SwapPairConfig {
    pub fn from_spec(spec: &PairSpec, token: Address) -> Result<Self, AppError> {
        Ok(Self {
            pair_key: spec.pair_key.to_string(),
            token_symbol: spec.token_symbol.to_string(),
            token,
            native_range: AmountRange::new(spec.native_range.0, spec.native_range.1)?,
            token_range: AmountRange::new(spec.token_range.0, spec.token_range.1)?,
            fee_tier: spec.fee_tier,
            native_per_token: spec.native_per_token,
            slippage_tolerance: spec.slippage_tolerance,
        })
    }

    /// Range of the asset spent in `direction`.
    pub fn source_range(&self, direction: Direction) -> AmountRange {
        match direction {
            Direction::NativeToToken => self.native_range,
            Direction::TokenToNative => self.token_range,
        }
    }

    pub fn expected_output(&self, direction: Direction, amount: Decimal) -> Decimal {
        if self.native_per_token.is_zero() {
            return Decimal::ZERO;
        }
        let raw = match direction {
            Direction::NativeToToken => amount / self.native_per_token,
            Direction::TokenToNative => amount * self.native_per_token,
        };
        round_amount(raw)
    }

    pub fn minimum_output(&self, expected: Decimal) -> Decimal {
        round_amount(expected * (Decimal::ONE - self.slippage_tolerance))
    }
}

/// All pairs plus the per-pair direction flags.
#[derive(Default)]
pub struct PairBook {
    pairs: DashMap<String, SwapPairConfig>,
    last_direction: DashMap<String, Direction>,
}

fn normalize_key(pair_key: &str) -> String {
    pair_key.trim().to_ascii_uppercase()
}

impl PairBook {
    pub fn new(pairs: impl IntoIterator<Item = SwapPairConfig>) -> Self {
        let book = Self::default();
        for pair in pairs {
            book.pairs.insert(normalize_key(&pair.pair_key), pair);
        }
        book
    }

    pub fn get(&self, pair_key: &str) -> Option<SwapPairConfig> {
        self.pairs.get(&normalize_key(pair_key)).map(|p| p.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.pairs.iter().map(|p| p.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn unknown_pair_message(&self, pair_key: &str) -> String {
        format!("unknown pair {pair_key}; known: {}", self.keys().join(", "))
    }

    pub fn set_amount_range(
        &self,
        pair_key: &str,
        asset: Asset,
        min: Decimal,
        max: Decimal,
    ) -> Result<(), AppError> {
        let range = AmountRange::new(min, max)?;
        let mut pair = self
            .pairs
            .get_mut(&normalize_key(pair_key))
            .ok_or_else(|| AppError::Validation {
                field: "pair".into(),
                message: self.unknown_pair_message(pair_key),
            })?;
        match asset {
            Asset::Native => pair.native_range = range,
            Asset::Token => pair.token_range = range,
        }
        tracing::info!(
            target: "system",
            pair = %pair.pair_key,
            asset = ?asset,
            %min,
            %max,
            "Random amount range changed"
        );
        Ok(())
    }

    /// Flip and return the direction for the next swap. Unset starts native first.
    pub fn next_direction(&self, pair_key: &str) -> Direction {
        let mut entry = self
            .last_direction
            .entry(normalize_key(pair_key))
            .or_insert(Direction::TokenToNative);
        *entry = entry.flipped();
        *entry
    }

    /// Direction the next call to `next_direction` will return.
    pub fn peek_direction(&self, pair_key: &str) -> Direction {
        self.last_direction
            .get(&normalize_key(pair_key))
            .map(|d| d.flipped())
            .unwrap_or(Direction::NativeToToken)
    }
}
