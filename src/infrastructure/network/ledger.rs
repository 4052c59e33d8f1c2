// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::retry::{RetryPolicy, retry_read};
use crate::data::abi::IErc20;
use crate::domain::error::AppError;
use crate::network::gas::CallKind;
use crate::network::provider::{ConnectionFactory, HttpProvider};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::eips::eip2930::AccessList;
use alloy::network::{ReceiptResponse, TxSignerSync};
use alloy::primitives::{Address, B256, Bytes, TxKind, U256};
use alloy::providers::Provider;
use alloy::rpc::types::eth::{TransactionInput, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::decode_revert_reason;
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One outbound contract call, before a nonce or gas limit is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub kind: CallKind,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
}

/// A call bound to the nonce and gas limit it will be signed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub call: ContractCall,
    pub nonce: u64,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub success: bool,
}

/// Narrow view of the chain the swap core depends on.
#[async_trait]
pub trait Ledger: Send + Sync {
    fn wallet_address(&self) -> Address;

    async fn native_balance(&self, owner: Address) -> Result<U256, AppError>;

    /// Transaction count including the pending pool.
    async fn pending_nonce(&self, owner: Address) -> Result<u64, AppError>;

    async fn gas_price(&self) -> Result<u128, AppError>;

    async fn token_decimals(&self, token: Address) -> Result<u8, AppError>;

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, AppError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AppError>;

    async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, AppError>;

    /// Sign and broadcast. Errors here mean nothing reached the mempool.
    async fn send_transaction(&self, tx: &PendingTransaction) -> Result<B256, AppError>;

    async fn wait_for_receipt(&self, hash: B256) -> Result<Receipt, AppError>;
}

pub type SharedLedger = Arc<dyn Ledger>;

/// `Ledger` backed by a JSON-RPC node and a local signing key.
pub struct RpcLedger {
    provider: HttpProvider,
    signer: PrivateKeySigner,
    chain_id: u64,
    receipt_poll: Duration,
    receipt_timeout: Option<Duration>,
}

impl RpcLedger {
    pub async fn connect(
        rpc_url: &str,
        signer: PrivateKeySigner,
        receipt_poll: Duration,
        receipt_timeout: Option<Duration>,
    ) -> Result<Self, AppError> {
        let provider = ConnectionFactory::http(rpc_url)?;
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| AppError::Connection(format!("chain_id detect failed: {e}")))?;
        tracing::info!(
            target: "system",
            chain_id,
            wallet = %signer.address(),
            "Connected to RPC"
        );
        Ok(Self {
            provider,
            signer,
            chain_id,
            receipt_poll: receipt_poll.max(Duration::from_millis(1)),
            receipt_timeout,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn request_for(&self, call: &ContractCall) -> TransactionRequest {
        TransactionRequest {
            from: Some(self.signer.address()),
            to: Some(TxKind::Call(call.to)),
            value: Some(call.value),
            input: TransactionInput::new(call.input.clone()),
            ..Default::default()
        }
    }

    async fn fees(&self) -> Result<(u128, u128), AppError> {
        match self.provider.estimate_eip1559_fees().await {
            Ok(est) => Ok((est.max_fee_per_gas, est.max_priority_fee_per_gas)),
            Err(e) => {
                // Nodes without eth_feeHistory: price both caps at the legacy gas price.
                tracing::debug!(target: "system", error = %e, "EIP-1559 fee estimate unavailable");
                let price = self.gas_price().await?;
                Ok((price, price))
            }
        }
    }
}

fn map_rpc_error(context: &str, err: TransportError) -> AppError {
    if let Some(payload) = err.as_error_resp() {
        let message = payload.message.to_string();
        if let Some(data) = payload.as_revert_data() {
            let reason = decode_revert_reason(&data).unwrap_or(message);
            return AppError::Reverted { reason };
        }
        if message.to_lowercase().contains("execution reverted") {
            return AppError::Reverted { reason: message };
        }
        return AppError::Connection(format!("{context}: {message}"));
    }
    AppError::Connection(format!("{context}: {err}"))
}

#[async_trait]
impl Ledger for RpcLedger {
    fn wallet_address(&self) -> Address {
        self.signer.address()
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, AppError> {
        let provider = self.provider.clone();
        retry_read("native_balance", RetryPolicy::READS, move || {
            let provider = provider.clone();
            async move { provider.get_balance(owner).await }
        })
        .await
        .map_err(|e| AppError::Connection(format!("Balance check failed: {}", e)))
    }

    async fn pending_nonce(&self, owner: Address) -> Result<u64, AppError> {
        let provider = self.provider.clone();
        retry_read("pending_nonce", RetryPolicy::READS, move || {
            let provider = provider.clone();
            async move { provider.get_transaction_count(owner).pending().await }
        })
        .await
        .map_err(|e| AppError::Connection(format!("Failed to fetch nonce: {}", e)))
    }

    async fn gas_price(&self) -> Result<u128, AppError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| AppError::Connection(format!("Gas price fetch failed: {}", e)))
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, AppError> {
        let contract = IErc20::new(token, self.provider.clone());
        retry_read("decimals", RetryPolicy::READS, move || {
            let contract = contract.clone();
            async move { contract.decimals().call().await }
        })
        .await
        .map_err(|e| AppError::Connection(format!("decimals() failed for {token:#x}: {e}")))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, AppError> {
        let contract = IErc20::new(token, self.provider.clone());
        retry_read("balanceOf", RetryPolicy::READS, move || {
            let contract = contract.clone();
            async move { contract.balanceOf(owner).call().await }
        })
        .await
        .map_err(|e| AppError::Connection(format!("balanceOf() failed for {token:#x}: {e}")))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AppError> {
        let contract = IErc20::new(token, self.provider.clone());
        retry_read("allowance", RetryPolicy::READS, move || {
            let contract = contract.clone();
            async move { contract.allowance(owner, spender).call().await }
        })
        .await
        .map_err(|e| AppError::Connection(format!("allowance() failed for {token:#x}: {e}")))
    }

    async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, AppError> {
        self.provider
            .estimate_gas(self.request_for(call))
            .await
            .map_err(|e| map_rpc_error("estimate_gas failed", e))
    }

    async fn send_transaction(&self, pending: &PendingTransaction) -> Result<B256, AppError> {
        let (max_fee_per_gas, max_priority_fee_per_gas) = self.fees().await?;
        let mut tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce: pending.nonce,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas_limit: pending.gas_limit,
            to: TxKind::Call(pending.call.to),
            value: pending.call.value,
            access_list: AccessList::default(),
            input: pending.call.input.clone(),
        };

        let sig = TxSignerSync::sign_transaction_sync(&self.signer, &mut tx)
            .map_err(|e| AppError::Initialization(format!("Sign tx failed: {}", e)))?;
        let signed: TxEnvelope = tx.into_signed(sig).into();
        let raw = signed.encoded_2718();

        let sent = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| map_rpc_error("Transaction send failed", e))?;
        Ok(*sent.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<Receipt, AppError> {
        let started = Instant::now();
        loop {
            match self.provider.get_transaction_receipt(hash).await {
                Ok(Some(rcpt)) => {
                    return Ok(Receipt {
                        transaction_hash: rcpt.transaction_hash,
                        success: rcpt.status(),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        target: "system",
                        error = %e,
                        hash = %format!("{:#x}", hash),
                        "Receipt lookup error; retrying"
                    );
                }
            }

            if let Some(timeout) = self.receipt_timeout
                && started.elapsed() >= timeout
            {
                return Err(AppError::Connection(format!(
                    "Receipt for {hash:#x} not seen within {}s",
                    timeout.as_secs()
                )));
            }

            tokio::time::sleep(self.receipt_poll).await;
        }
    }
}
