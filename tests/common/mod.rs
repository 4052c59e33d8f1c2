#![allow(dead_code)]

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use dex_cycler::data::abi::IErc20;
use dex_cycler::domain::error::AppError;
use dex_cycler::network::gas::CallKind;
use dex_cycler::network::ledger::{ContractCall, Ledger, PendingTransaction, Receipt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub const WALLET: Address = Address::new([0xaa; 20]);
pub const WRAPPED: Address = Address::new([0x01; 20]);
pub const USDC: Address = Address::new([0x02; 20]);

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

/// Scripted chain state. Every field is public so tests can set up and
/// inspect it directly.
#[derive(Default)]
pub struct ChainState {
    pub native: U256,
    pub token_balances: HashMap<Address, U256>,
    /// Router allowance per token.
    pub allowances: HashMap<Address, U256>,
    pub decimals: HashMap<Address, u8>,
    pub chain_nonce: u64,
    pub nonce_reads: u32,
    pub gas_price: Option<u128>,
    pub raw_gas: u64,
    pub failing_estimates: HashSet<CallKind>,
    /// Popped one per send; `None` entries mean the send goes through.
    pub send_errors: VecDeque<Option<AppError>>,
    /// Popped one per receipt; `true` marks a mined revert.
    pub reverts: VecDeque<bool>,
    pub receipt_errors: VecDeque<Option<AppError>>,
    pub receipt_delay: Duration,
    /// Every send attempt, accepted or not.
    pub attempts: Vec<PendingTransaction>,
    /// Accepted sends, in broadcast order.
    pub sent: Vec<PendingTransaction>,
    pub in_flight: u32,
    pub max_in_flight: u32,
    pending: HashMap<B256, PendingTransaction>,
}

pub struct FakeLedger {
    pub wallet: Address,
    pub state: Mutex<ChainState>,
}

impl FakeLedger {
    pub fn new() -> Self {
        let mut state = ChainState {
            native: ether(10),
            gas_price: Some(1_000_000_000),
            raw_gas: 100_000,
            ..Default::default()
        };
        state.decimals.insert(USDC, 6);
        state.decimals.insert(WRAPPED, 18);
        state.token_balances.insert(USDC, U256::from(1_000_000_000u64));
        state.token_balances.insert(WRAPPED, ether(5));
        Self {
            wallet: WALLET,
            state: Mutex::new(state),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut guard = self.state.lock().expect("state lock");
        f(&mut guard)
    }

    pub fn sent_kinds(&self) -> Vec<CallKind> {
        self.with(|s| s.sent.iter().map(|tx| tx.call.kind).collect())
    }

    pub fn sent_nonces(&self) -> Vec<u64> {
        self.with(|s| s.sent.iter().map(|tx| tx.nonce).collect())
    }
}

fn hash_for(nonce: u64, attempt: usize) -> B256 {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&nonce.to_be_bytes());
    bytes[8..].copy_from_slice(&(attempt as u64).to_be_bytes());
    B256::left_padding_from(&bytes)
}

#[async_trait]
impl Ledger for FakeLedger {
    fn wallet_address(&self) -> Address {
        self.wallet
    }

    async fn native_balance(&self, _owner: Address) -> Result<U256, AppError> {
        Ok(self.with(|s| s.native))
    }

    async fn pending_nonce(&self, _owner: Address) -> Result<u64, AppError> {
        Ok(self.with(|s| {
            s.nonce_reads += 1;
            s.chain_nonce
        }))
    }

    async fn gas_price(&self) -> Result<u128, AppError> {
        self.with(|s| s.gas_price)
            .ok_or_else(|| AppError::Connection("fee data unavailable".into()))
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, AppError> {
        Ok(self.with(|s| s.decimals.get(&token).copied().unwrap_or(18)))
    }

    async fn token_balance(&self, token: Address, _owner: Address) -> Result<U256, AppError> {
        Ok(self.with(|s| s.token_balances.get(&token).copied().unwrap_or_default()))
    }

    async fn allowance(
        &self,
        token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, AppError> {
        Ok(self.with(|s| s.allowances.get(&token).copied().unwrap_or_default()))
    }

    async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, AppError> {
        self.with(|s| {
            if s.failing_estimates.contains(&call.kind) {
                Err(AppError::Reverted {
                    reason: "estimate failed".into(),
                })
            } else {
                Ok(s.raw_gas)
            }
        })
    }

    async fn send_transaction(&self, tx: &PendingTransaction) -> Result<B256, AppError> {
        self.with(|s| {
            s.attempts.push(tx.clone());
            if let Some(Some(err)) = s.send_errors.pop_front() {
                return Err(err);
            }
            let hash = hash_for(tx.nonce, s.attempts.len());
            s.sent.push(tx.clone());
            s.pending.insert(hash, tx.clone());
            s.in_flight += 1;
            s.max_in_flight = s.max_in_flight.max(s.in_flight);
            Ok(hash)
        })
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<Receipt, AppError> {
        let delay = self.with(|s| s.receipt_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            if let Some(Some(err)) = s.receipt_errors.pop_front() {
                return Err(err);
            }
            let reverted = s.reverts.pop_front().unwrap_or(false);
            let tx = s.pending.remove(&hash);
            if !reverted && let Some(tx) = tx {
                s.chain_nonce = s.chain_nonce.max(tx.nonce + 1);
                if tx.call.kind == CallKind::Approve
                    && let Ok(approve) = IErc20::approveCall::abi_decode(&tx.call.input)
                {
                    s.allowances.insert(tx.call.to, approve.amount);
                }
            }
            Ok(Receipt {
                transaction_hash: hash,
                success: !reverted,
            })
        })
    }
}
