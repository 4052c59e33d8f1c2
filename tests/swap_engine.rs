mod common;

use alloy::primitives::U256;
use alloy::sol_types::SolCall;
use common::{FakeLedger, USDC, WRAPPED, ether};
use dex_cycler::data::abi::IErc20;
use dex_cycler::domain::constants::{SWAP_ROUTER, default_pair};
use dex_cycler::network::gas::CallKind;
use dex_cycler::network::ledger::SharedLedger;
use dex_cycler::services::swap::engine::CycleOutcome;
use dex_cycler::services::swap::pairs::{Asset, Direction, SwapPairConfig};
use dex_cycler::services::swap::session::{SessionOptions, SwapSession};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn pairs() -> Vec<SwapPairConfig> {
    let wrap = default_pair("XOS_WXOS").expect("wrap pair");
    let usdc = default_pair("XOS_USDC").expect("usdc pair");
    vec![
        SwapPairConfig::from_spec(wrap, WRAPPED).expect("wrap config"),
        SwapPairConfig::from_spec(usdc, USDC).expect("usdc config"),
    ]
}

fn session(fake: &Arc<FakeLedger>) -> SwapSession {
    let ledger: SharedLedger = fake.clone();
    let mut options = SessionOptions::new(WRAPPED, pairs());
    options.rng_seed = Some(7);
    SwapSession::start(ledger, options)
}

#[tokio::test]
async fn wrap_pair_alternates_deposit_and_withdraw() {
    let fake = Arc::new(FakeLedger::new());
    let session = session(&fake);

    for _ in 0..4 {
        let outcome = session.engine().run_one_cycle("XOS_WXOS").await;
        assert!(outcome.is_success(), "{outcome:?}");
    }

    assert_eq!(
        fake.sent_kinds(),
        vec![CallKind::Wrap, CallKind::Unwrap, CallKind::Wrap, CallKind::Unwrap]
    );
    assert_eq!(fake.sent_nonces(), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn approval_is_sent_only_when_allowance_is_short() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| {
        s.allowances.insert(USDC, U256::MAX);
    });
    let session = session(&fake);

    // Native -> token: no wrapped-native allowance yet.
    let first = session.engine().run_one_cycle("XOS_USDC").await;
    assert!(first.is_success(), "{first:?}");
    // Token -> native: allowance already in place.
    let second = session.engine().run_one_cycle("XOS_USDC").await;
    assert!(second.is_success(), "{second:?}");

    assert_eq!(
        fake.sent_kinds(),
        vec![
            CallKind::Approve,
            CallKind::RouterSwap,
            CallKind::RouterSwapAndUnwrap,
        ]
    );
    assert_eq!(fake.sent_nonces(), vec![0, 1, 2]);

    fake.with(|s| {
        let approve = IErc20::approveCall::abi_decode(&s.sent[0].call.input).expect("approve");
        assert_eq!(s.sent[0].call.to, WRAPPED);
        assert_eq!(approve.spender, SWAP_ROUTER);
        // Exact amount, not unlimited.
        assert_eq!(approve.amount, s.sent[1].call.value);
    });
}

#[tokio::test]
async fn insufficient_native_balance_submits_nothing() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| s.native = U256::from(1_000u64));
    let session = session(&fake);

    let outcome = session.engine().run_one_cycle("XOS_USDC").await;
    assert!(matches!(outcome, CycleOutcome::InsufficientBalance { .. }));
    assert!(fake.with(|s| s.attempts.is_empty()));
    // The flip happened anyway.
    assert_eq!(
        session.pairs().peek_direction("XOS_USDC"),
        Direction::TokenToNative
    );
}

#[tokio::test]
async fn insufficient_token_balance_submits_nothing() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| {
        s.token_balances.insert(USDC, U256::from(10u64));
    });
    let session = session(&fake);

    let first = session.engine().run_one_cycle("XOS_USDC").await;
    assert!(first.is_success(), "{first:?}");
    let sent_before = fake.with(|s| s.attempts.len());

    let second = session.engine().run_one_cycle("XOS_USDC").await;
    assert!(matches!(second, CycleOutcome::InsufficientBalance { .. }));
    assert_eq!(fake.with(|s| s.attempts.len()), sent_before);
}

#[tokio::test]
async fn balance_check_counts_gas_cost() {
    let fake = Arc::new(FakeLedger::new());
    // Covers any sampled amount, but not 150k gas at 1 gwei on top.
    fake.with(|s| s.native = ether(1) / U256::from(100u64));
    let session = session(&fake);
    session
        .set_amount_range("XOS_USDC", Asset::Native, dec!(0.0099), dec!(0.01))
        .expect("range");

    let outcome = session.engine().run_one_cycle("XOS_USDC").await;
    assert!(matches!(outcome, CycleOutcome::InsufficientBalance { .. }), "{outcome:?}");
    assert!(fake.with(|s| s.attempts.is_empty()));
}

#[tokio::test]
async fn approval_falls_back_to_default_gas_limit() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| {
        s.failing_estimates.insert(CallKind::Approve);
    });
    let session = session(&fake);

    let outcome = session.engine().run_one_cycle("XOS_USDC").await;
    assert!(outcome.is_success(), "{outcome:?}");
    fake.with(|s| {
        assert_eq!(s.sent[0].call.kind, CallKind::Approve);
        assert_eq!(s.sent[0].gas_limit, 100_000);
        // Estimated swap gets the single-leg margin.
        assert_eq!(s.sent[1].gas_limit, 120_000);
    });
}

#[tokio::test]
async fn failed_approval_aborts_the_swap() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| s.reverts.push_back(true));
    let session = session(&fake);

    let outcome = session.engine().run_one_cycle("XOS_USDC").await;
    assert_eq!(outcome, CycleOutcome::ApprovalFailed);
    assert_eq!(fake.sent_kinds(), vec![CallKind::Approve]);
}

#[tokio::test]
async fn token_to_native_uses_swap_and_unwrap_margin() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| {
        s.allowances.insert(USDC, U256::MAX);
        s.allowances.insert(WRAPPED, U256::MAX);
    });
    let session = session(&fake);

    session.engine().run_one_cycle("XOS_USDC").await;
    let outcome = session.engine().run_one_cycle("XOS_USDC").await;
    assert!(outcome.is_success(), "{outcome:?}");
    fake.with(|s| {
        let last = s.sent.last().expect("sent");
        assert_eq!(last.call.kind, CallKind::RouterSwapAndUnwrap);
        assert_eq!(last.call.value, U256::ZERO);
        assert_eq!(last.gas_limit, 130_000);
    });
}

#[tokio::test]
async fn mined_revert_reports_rejected() {
    let fake = Arc::new(FakeLedger::new());
    fake.with(|s| s.reverts.push_back(true));
    let session = session(&fake);

    let outcome = session.engine().run_one_cycle("XOS_WXOS").await;
    assert_eq!(outcome, CycleOutcome::Rejected);
}

#[tokio::test]
async fn unknown_pair_fails_without_submitting() {
    let fake = Arc::new(FakeLedger::new());
    let session = session(&fake);

    let outcome = session.engine().run_one_cycle("XOS_DOGE").await;
    assert!(matches!(outcome, CycleOutcome::Failed { .. }));
    assert!(fake.with(|s| s.attempts.is_empty()));
}
