// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, address};
use rust_decimal::Decimal;

// =============================================================================
// NETWORK CONSTANTS
// =============================================================================

pub const NETWORK_NAME: &str = "XOS TESTNET";
pub const NATIVE_SYMBOL: &str = "XOS";
pub const WRAPPED_NATIVE_SYMBOL: &str = "WXOS";
pub const NATIVE_DECIMALS: u8 = 18;

pub const SWAP_ROUTER: Address = address!("dc7D6b58c89A554b3FDC4B5B10De9b4DbF39FB40");

// =============================================================================
// GAS & TRANSACTION CONSTANTS
// =============================================================================

pub const DEFAULT_WRAP_GAS: u64 = 80_000;
pub const DEFAULT_APPROVE_GAS: u64 = 100_000;
pub const DEFAULT_ROUTER_SWAP_GAS: u64 = 150_000;
pub const DEFAULT_ROUTER_SWAP_UNWRAP_GAS: u64 = 400_000;

pub const SINGLE_LEG_GAS_MARGIN_PCT: u64 = 120;
pub const MULTI_LEG_GAS_MARGIN_PCT: u64 = 130;

// 5 gwei
pub const FALLBACK_GAS_PRICE_WEI: u128 = 5_000_000_000;

pub const DEFAULT_DEADLINE_SECS: u64 = 20 * 60;

// =============================================================================
// SWAP CONSTANTS
// =============================================================================

/// Decimal places kept on sampled and derived human amounts.
pub const AMOUNT_PRECISION: u32 = 6;

pub const DEFAULT_MIN_DELAY_SECS: u64 = 30;
pub const DEFAULT_MAX_DELAY_SECS: u64 = 60;
pub const DEFAULT_CANCEL_POLL_MS: u64 = 100;

/// Compiled-in description of one native/token pair.
#[derive(Debug, Clone, Copy)]
pub struct PairSpec {
    pub pair_key: &'static str,
    pub token_symbol: &'static str,
    pub fee_tier: u32,
    /// Units of native paid for one unit of the token.
    pub native_per_token: Decimal,
    pub slippage_tolerance: Decimal,
    /// (min, max) native amount per swap.
    pub native_range: (Decimal, Decimal),
    /// (min, max) token amount per swap.
    pub token_range: (Decimal, Decimal),
}

const fn dec(mantissa: u32, scale: u32) -> Decimal {
    Decimal::from_parts(mantissa, 0, 0, false, scale)
}

const SLIPPAGE: Decimal = dec(5, 3);
const NATIVE_RANGE: (Decimal, Decimal) = (dec(5, 3), dec(1, 2));

pub const DEFAULT_PAIRS: [PairSpec; 5] = [
    PairSpec {
        pair_key: "XOS_WXOS",
        token_symbol: WRAPPED_NATIVE_SYMBOL,
        fee_tier: 0,
        native_per_token: dec(1, 0),
        slippage_tolerance: SLIPPAGE,
        native_range: NATIVE_RANGE,
        token_range: NATIVE_RANGE,
    },
    PairSpec {
        pair_key: "XOS_USDC",
        token_symbol: "USDC",
        fee_tier: 500,
        native_per_token: dec(466_769, 4),
        slippage_tolerance: SLIPPAGE,
        native_range: NATIVE_RANGE,
        token_range: (dec(2, 1), dec(45, 2)),
    },
    PairSpec {
        pair_key: "XOS_BNB",
        token_symbol: "BNB",
        fee_tier: 500,
        native_per_token: dec(7_779, 5),
        slippage_tolerance: SLIPPAGE,
        native_range: NATIVE_RANGE,
        token_range: (dec(3, 4), dec(75, 5)),
    },
    PairSpec {
        pair_key: "XOS_SOL",
        token_symbol: "SOL",
        fee_tier: 500,
        native_per_token: dec(32_487, 5),
        slippage_tolerance: SLIPPAGE,
        native_range: NATIVE_RANGE,
        token_range: (dec(15, 4), dec(3, 3)),
    },
    PairSpec {
        pair_key: "XOS_JUP",
        token_symbol: "JUP",
        fee_tier: 500,
        native_per_token: dec(27_747, 3),
        slippage_tolerance: SLIPPAGE,
        native_range: NATIVE_RANGE,
        token_range: (dec(12, 2), dec(25, 2)),
    },
];

pub fn default_pair(pair_key: &str) -> Option<&'static PairSpec> {
    DEFAULT_PAIRS
        .iter()
        .find(|spec| spec.pair_key.eq_ignore_ascii_case(pair_key))
}
