// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::data::abi::{IErc20, ISwapRouter, IWrappedNative};
use crate::network::gas::CallKind;
use crate::network::ledger::ContractCall;
use alloy::primitives::aliases::{U24, U160};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

pub fn approve(token: Address, spender: Address, amount: U256) -> ContractCall {
    ContractCall {
        kind: CallKind::Approve,
        to: token,
        value: U256::ZERO,
        input: IErc20::approveCall { spender, amount }.abi_encode().into(),
    }
}

pub fn deposit(wrapped_native: Address, amount: U256) -> ContractCall {
    ContractCall {
        kind: CallKind::Wrap,
        to: wrapped_native,
        value: amount,
        input: IWrappedNative::depositCall {}.abi_encode().into(),
    }
}

pub fn withdraw(wrapped_native: Address, amount: U256) -> ContractCall {
    ContractCall {
        kind: CallKind::Unwrap,
        to: wrapped_native,
        value: U256::ZERO,
        input: IWrappedNative::withdrawCall { amount }.abi_encode().into(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SingleHop {
    pub token_in: Address,
    pub token_out: Address,
    pub fee_tier: u32,
    pub recipient: Address,
    pub amount_in: U256,
    pub amount_out_min: U256,
}

fn exact_input_single(hop: &SingleHop) -> Bytes {
    ISwapRouter::exactInputSingleCall {
        params: ISwapRouter::ExactInputSingleParams {
            tokenIn: hop.token_in,
            tokenOut: hop.token_out,
            fee: U24::from(hop.fee_tier),
            recipient: hop.recipient,
            amountIn: hop.amount_in,
            amountOutMinimum: hop.amount_out_min,
            sqrtPriceLimitX96: U160::ZERO,
        },
    }
    .abi_encode()
    .into()
}

fn multicall(deadline: u64, data: Vec<Bytes>) -> Bytes {
    ISwapRouter::multicallCall {
        deadline: U256::from(deadline),
        data,
    }
    .abi_encode()
    .into()
}

/// Native in, token out. The router wraps `msg.value` for the wrapped-native leg.
pub fn swap_native_for_token(
    router: Address,
    hop: &SingleHop,
    deadline: u64,
) -> ContractCall {
    ContractCall {
        kind: CallKind::RouterSwap,
        to: router,
        value: hop.amount_in,
        input: multicall(deadline, vec![exact_input_single(hop)]),
    }
}

/// Token in, native out: swap into wrapped-native held by the router, then
/// unwrap to `recipient`, atomically in one multicall.
pub fn swap_token_for_native(
    router: Address,
    token_in: Address,
    wrapped_native: Address,
    fee_tier: u32,
    amount_in: U256,
    recipient: Address,
    deadline: u64,
) -> ContractCall {
    let hop = SingleHop {
        token_in,
        token_out: wrapped_native,
        fee_tier,
        recipient: router,
        amount_in,
        amount_out_min: U256::ZERO,
    };
    let unwrap = ISwapRouter::unwrapWETH9Call {
        amountMinimum: U256::ZERO,
        recipient,
    }
    .abi_encode()
    .into();
    ContractCall {
        kind: CallKind::RouterSwapAndUnwrap,
        to: router,
        value: U256::ZERO,
        input: multicall(deadline, vec![exact_input_single(&hop), unwrap]),
    }
}
