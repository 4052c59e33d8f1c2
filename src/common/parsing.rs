// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::str::FromStr;

/// `0x1234...abcd` form used in log lines.
pub fn short_hash(hash: &B256) -> String {
    let full = format!("{hash:#x}");
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

pub fn short_address(address: &Address) -> String {
    let full = format!("{address:#x}");
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Parse an operator-supplied `min,max` pair such as `0.1,0.5`.
pub fn parse_range(raw: &str) -> Result<(Decimal, Decimal), AppError> {
    let invalid = |message: String| AppError::Validation {
        field: "range".into(),
        message,
    };
    let (min, max) = raw
        .split_once(',')
        .ok_or_else(|| invalid(format!("expected min,max but got {raw:?}")))?;
    let min = Decimal::from_str(min.trim()).map_err(|e| invalid(format!("min: {e}")))?;
    let max = Decimal::from_str(max.trim()).map_err(|e| invalid(format!("max: {e}")))?;
    Ok((min, max))
}

/// Convert a human amount into integer base units, truncating digits the token
/// cannot represent.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, AppError> {
    let overflow = || AppError::Validation {
        field: "amount".into(),
        message: format!("{amount} does not fit {decimals} decimals"),
    };
    if amount.is_sign_negative() {
        return Err(AppError::Validation {
            field: "amount".into(),
            message: format!("{amount} is negative"),
        });
    }
    let factor = 10u128
        .checked_pow(u32::from(decimals))
        .and_then(Decimal::from_u128)
        .ok_or_else(overflow)?;
    let scaled = amount.checked_mul(factor).ok_or_else(overflow)?.trunc();
    scaled.to_u128().map(U256::from).ok_or_else(overflow)
}

/// Render base units for display; falls back to the raw integer.
pub fn format_base_units(value: U256, decimals: u8) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}
