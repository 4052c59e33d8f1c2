// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::parsing::short_hash;
use crate::domain::error::AppError;
use crate::network::ledger::{ContractCall, PendingTransaction, SharedLedger};
use alloy::primitives::{Address, B256};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A call waiting for a nonce. The nonce is attached by the queue worker at
/// the moment the previous transaction has resolved.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub call: ContractCall,
    pub gas_limit: u64,
    pub description: String,
}

impl TransactionRequest {
    pub fn new(call: ContractCall, gas_limit: u64, description: impl Into<String>) -> Self {
        Self {
            call,
            gas_limit,
            description: description.into(),
        }
    }

    pub fn build(&self, nonce: u64) -> PendingTransaction {
        PendingTransaction {
            call: self.call.clone(),
            nonce,
            gas_limit: self.gas_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    /// Mined but reverted. The nonce slot is consumed.
    ContractRejected,
    /// Never mined, or its fate is unknown.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Another transaction already used the nonce; cached nonce was bumped.
    NonceConflict,
    /// The node refused the call deterministically.
    Reverted { reason: String },
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub id: u64,
    pub status: TxStatus,
    pub tx_hash: Option<B256>,
    pub nonce: Option<u64>,
    pub failure: Option<FailureKind>,
    pub message: Option<String>,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    fn failed(id: u64, nonce: Option<u64>, failure: FailureKind, message: String) -> Self {
        Self {
            id,
            status: TxStatus::Failed,
            tx_hash: None,
            nonce,
            failure: Some(failure),
            message: Some(message),
        }
    }
}

const NONCE_CONFLICT_MARKERS: [&str; 3] = [
    "nonce has already been used",
    "nonce too low",
    "already been used",
];

pub fn classify_submit_error(err: &AppError) -> FailureKind {
    if let AppError::Reverted { reason } = err {
        return FailureKind::Reverted {
            reason: reason.clone(),
        };
    }
    let msg = err.to_string().to_lowercase();
    if NONCE_CONFLICT_MARKERS.iter().any(|m| msg.contains(m)) {
        FailureKind::NonceConflict
    } else {
        FailureKind::Network
    }
}

struct QueueEntry {
    id: u64,
    request: TransactionRequest,
    reply: oneshot::Sender<TransactionOutcome>,
}

/// Sole owner of the wallet's nonce counter. Lives inside the queue worker.
struct WalletSession {
    ledger: SharedLedger,
    wallet: Address,
    next_nonce: Option<u64>,
    published: watch::Sender<Option<u64>>,
}

impl WalletSession {
    fn set_nonce(&mut self, nonce: u64) {
        self.next_nonce = Some(nonce);
        self.published.send_replace(Some(nonce));
    }

    async fn process(&mut self, id: u64, request: &TransactionRequest) -> TransactionOutcome {
        let nonce = match self.next_nonce {
            Some(n) => n,
            None => match self.ledger.pending_nonce(self.wallet).await {
                Ok(n) => {
                    tracing::debug!(target: "system", nonce = n, "Initial nonce");
                    self.set_nonce(n);
                    n
                }
                Err(e) => {
                    tracing::error!(target: "system", tx_id = id, error = %e, "Transaction failed");
                    return TransactionOutcome::failed(id, None, FailureKind::Network, e.to_string());
                }
            },
        };

        let pending = request.build(nonce);
        let hash = match self.ledger.send_transaction(&pending).await {
            Ok(hash) => hash,
            Err(e) => return self.submit_failed(id, nonce, e),
        };
        tracing::debug!(target: "swap", tx_id = id, nonce, hash = %short_hash(&hash), "Tx sent");

        let receipt = match self.ledger.wait_for_receipt(hash).await {
            Ok(receipt) => receipt,
            Err(e) => {
                // Broadcast but unconfirmed. If it lands later, the next send
                // hits a nonce conflict and self-heals.
                tracing::error!(
                    target: "system",
                    tx_id = id,
                    hash = %short_hash(&hash),
                    error = %e,
                    "Transaction failed"
                );
                let mut outcome =
                    TransactionOutcome::failed(id, Some(nonce), FailureKind::Network, e.to_string());
                outcome.tx_hash = Some(hash);
                return outcome;
            }
        };

        // Mined either way, so the slot is spent.
        self.set_nonce(nonce + 1);
        let tx_hash = Some(receipt.transaction_hash);
        if receipt.success {
            tracing::info!(
                target: "swap",
                status = "success",
                tx_id = id,
                nonce,
                hash = %short_hash(&receipt.transaction_hash),
                "Transaction [{}] done",
                id
            );
            TransactionOutcome {
                id,
                status: TxStatus::Success,
                tx_hash,
                nonce: Some(nonce),
                failure: None,
                message: None,
            }
        } else {
            tracing::error!(
                target: "system",
                tx_id = id,
                nonce,
                hash = %short_hash(&receipt.transaction_hash),
                "Transaction [{}] rejected by contract",
                id
            );
            TransactionOutcome {
                id,
                status: TxStatus::ContractRejected,
                tx_hash,
                nonce: Some(nonce),
                failure: None,
                message: Some("transaction rejected by contract".into()),
            }
        }
    }

    fn submit_failed(&mut self, id: u64, nonce: u64, err: AppError) -> TransactionOutcome {
        let failure = classify_submit_error(&err);
        let message = match &failure {
            FailureKind::Reverted { reason } => format!("rejected by contract: {reason}"),
            _ => err.to_string(),
        };
        tracing::error!(target: "system", tx_id = id, nonce, error = %message, "Transaction failed");

        if failure == FailureKind::NonceConflict {
            self.set_nonce(nonce + 1);
            tracing::info!(
                target: "system",
                next_nonce = nonce + 1,
                "Nonce already used; advanced cached nonce"
            );
        }
        TransactionOutcome::failed(id, Some(nonce), failure, message)
    }
}

/// FIFO submission pipeline for the wallet. One worker, one transaction in
/// flight; submission `n + 1` is not built until submission `n` resolved.
#[derive(Clone)]
pub struct NonceSequencedQueue {
    sender: mpsc::UnboundedSender<QueueEntry>,
    next_id: Arc<AtomicU64>,
    nonce: watch::Receiver<Option<u64>>,
}

impl NonceSequencedQueue {
    pub fn spawn(ledger: SharedLedger, shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<QueueEntry>();
        let (published, nonce) = watch::channel(None);
        let mut session = WalletSession {
            wallet: ledger.wallet_address(),
            ledger,
            next_nonce: None,
            published,
        };

        let worker = tokio::spawn(async move {
            loop {
                let entry = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    entry = receiver.recv() => match entry {
                        Some(entry) => entry,
                        None => break,
                    },
                };
                let outcome = session.process(entry.id, &entry.request).await;
                // Caller may have given up waiting; the nonce bookkeeping above still holds.
                let _ = entry.reply.send(outcome);
            }
            tracing::debug!(target: "system", "Transaction queue stopped");
        });

        (
            Self {
                sender,
                next_id: Arc::new(AtomicU64::new(0)),
                nonce,
            },
            worker,
        )
    }

    /// Queue a request and wait for its outcome. Never returns an error: every
    /// failure is folded into a `Failed` outcome.
    pub async fn submit(&self, request: TransactionRequest) -> TransactionOutcome {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(
            target: "system",
            tx_id = id,
            description = %request.description,
            "Transaction [{}] queued",
            id
        );

        let (reply, outcome) = oneshot::channel();
        let entry = QueueEntry { id, request, reply };
        if self.sender.send(entry).is_err() {
            return TransactionOutcome::failed(id, None, FailureKind::Network, "queue closed".into());
        }
        outcome.await.unwrap_or_else(|_| {
            TransactionOutcome::failed(id, None, FailureKind::Network, "queue closed".into())
        })
    }

    /// Nonce the next transaction will use, once known.
    pub fn cached_nonce(&self) -> Option<u64> {
        *self.nonce.borrow()
    }
}
