mod common;

use alloy::primitives::{Bytes, U256};
use common::{FakeLedger, WRAPPED};
use dex_cycler::domain::error::AppError;
use dex_cycler::network::gas::CallKind;
use dex_cycler::network::ledger::{ContractCall, SharedLedger};
use dex_cycler::services::swap::queue::{
    FailureKind, NonceSequencedQueue, TransactionRequest, TxStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn request(label: &str) -> TransactionRequest {
    TransactionRequest::new(
        ContractCall {
            kind: CallKind::Wrap,
            to: WRAPPED,
            value: U256::from(1u64),
            input: Bytes::new(),
        },
        80_000,
        label,
    )
}

fn start(fake: &Arc<FakeLedger>) -> (NonceSequencedQueue, CancellationToken) {
    let token = CancellationToken::new();
    let ledger: SharedLedger = fake.clone();
    let (queue, _worker) = NonceSequencedQueue::spawn(ledger, token.clone());
    (queue, token)
}

#[tokio::test(start_paused = true)]
async fn concurrent_submissions_get_consecutive_nonces_in_fifo_order() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| {
        s.chain_nonce = 5;
        s.receipt_delay = Duration::from_millis(250);
    });
    let (queue, _token) = start(&fake);

    let (a, b, c) = tokio::join!(
        queue.submit(request("a")),
        queue.submit(request("b")),
        queue.submit(request("c")),
    );

    for outcome in [&a, &b, &c] {
        assert_eq!(outcome.status, TxStatus::Success);
        assert_eq!(outcome.nonce, Some(4 + outcome.id));
    }
    assert_eq!(fake.sent_nonces(), vec![5, 6, 7]);
    assert_eq!(fake.with(|s| s.max_in_flight), 1);
    assert_eq!(fake.with(|s| s.nonce_reads), 1);
    assert_eq!(queue.cached_nonce(), Some(8));
}

#[tokio::test]
async fn nonce_is_unknown_until_first_submission() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| s.chain_nonce = 9);
    let (queue, _token) = start(&fake);
    assert_eq!(queue.cached_nonce(), None);

    let outcome = queue.submit(request("first")).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.nonce, Some(9));
    assert_eq!(queue.cached_nonce(), Some(10));
}

#[tokio::test]
async fn nonce_conflict_bumps_once_without_retry() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| {
        s.chain_nonce = 3;
        s.send_errors.push_back(Some(AppError::Connection(
            "Transaction send failed: nonce has already been used".into(),
        )));
    });
    let (queue, _token) = start(&fake);

    let failed = queue.submit(request("conflicting")).await;
    assert_eq!(failed.status, TxStatus::Failed);
    assert_eq!(failed.failure, Some(FailureKind::NonceConflict));
    assert_eq!(failed.nonce, Some(3));
    assert_eq!(fake.with(|s| s.attempts.len()), 1);
    assert_eq!(queue.cached_nonce(), Some(4));

    let next = queue.submit(request("next")).await;
    assert!(next.is_success());
    assert_eq!(next.nonce, Some(4));
    assert_eq!(fake.with(|s| s.nonce_reads), 1);
}

#[tokio::test]
async fn revert_before_mining_keeps_the_nonce() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| {
        s.chain_nonce = 2;
        s.send_errors.push_back(Some(AppError::Reverted {
            reason: "STF".into(),
        }));
    });
    let (queue, _token) = start(&fake);

    let failed = queue.submit(request("reverts")).await;
    assert_eq!(
        failed.failure,
        Some(FailureKind::Reverted {
            reason: "STF".into()
        })
    );
    assert_eq!(queue.cached_nonce(), Some(2));

    let next = queue.submit(request("next")).await;
    assert_eq!(next.nonce, Some(2));
    assert!(next.is_success());
}

#[tokio::test]
async fn mined_revert_is_rejected_and_consumes_the_nonce() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| s.reverts.push_back(true));
    let (queue, _token) = start(&fake);

    let rejected = queue.submit(request("rejected")).await;
    assert_eq!(rejected.status, TxStatus::ContractRejected);
    assert!(rejected.tx_hash.is_some());
    assert_eq!(queue.cached_nonce(), Some(1));

    let next = queue.submit(request("next")).await;
    assert_eq!(next.nonce, Some(1));
}

#[tokio::test]
async fn network_failure_after_broadcast_does_not_advance() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| {
        s.receipt_errors
            .push_back(Some(AppError::Connection("receipt timeout".into())));
    });
    let (queue, _token) = start(&fake);

    let failed = queue.submit(request("lost")).await;
    assert_eq!(failed.status, TxStatus::Failed);
    assert_eq!(failed.failure, Some(FailureKind::Network));
    assert!(failed.tx_hash.is_some());
    assert_eq!(queue.cached_nonce(), Some(0));
}

#[tokio::test]
async fn submissions_after_shutdown_resolve_as_queue_closed() {
    let fake = Arc::new(FakeLedger::new());
    let token = CancellationToken::new();
    let ledger: SharedLedger = fake.clone();
    let (queue, worker) = NonceSequencedQueue::spawn(ledger, token.clone());

    token.cancel();
    worker.await.expect("worker exits cleanly");

    let outcome = queue.submit(request("late")).await;
    assert_eq!(outcome.status, TxStatus::Failed);
    assert_eq!(outcome.failure, Some(FailureKind::Network));
    assert_eq!(outcome.message.as_deref(), Some("queue closed"));
    assert!(fake.with(|s| s.attempts.is_empty()));
}
