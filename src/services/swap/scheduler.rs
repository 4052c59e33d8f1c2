// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, sleep, sleep_until};

/// Process-wide stop flag for the swap loop. Resettable, unlike a
/// `CancellationToken`: a run clears it on exit so the next run starts
/// uncancelled.
#[derive(Default)]
pub struct CancellationSignal {
    cancelled: AtomicBool,
    notify: Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `delay` unless cancelled first. Wakes on `cancel()` directly and
    /// re-checks the flag every `poll` as a floor.
    pub async fn wait(&self, delay: Duration, poll: Duration) -> WaitOutcome {
        let deadline = Instant::now() + delay;
        let poll = poll.max(Duration::from_millis(1));
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            if Instant::now() >= deadline {
                return WaitOutcome::Elapsed;
            }
            tokio::select! {
                _ = sleep_until(deadline) => {
                    return if self.is_cancelled() {
                        WaitOutcome::Cancelled
                    } else {
                        WaitOutcome::Elapsed
                    };
                }
                _ = notified => {}
                _ = sleep(poll) => {}
            }
        }
    }
}

/// Hook run after every successful cycle.
#[async_trait]
pub trait BalanceRefresh: Send + Sync {
    async fn refresh(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    /// Stopped at the top of iteration `n`, before its cycle started.
    CancelledBeforeCycle(u32),
    /// Stopped while waiting after iteration `n`.
    CancelledDuringWait(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub requested: u32,
    pub attempted: u32,
    pub succeeded: u32,
    pub stop: StopReason,
}

/// Clears the stop flag, then the running flag, on every exit path.
struct RunningGuard<'a> {
    running: &'a AtomicBool,
    signal: &'a CancellationSignal,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.signal.reset();
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Runs a cycle `n` times with a random pause between iterations.
pub struct SwapScheduler {
    signal: Arc<CancellationSignal>,
    running: AtomicBool,
    min_delay: Duration,
    max_delay: Duration,
    poll: Duration,
    refresher: Option<Arc<dyn BalanceRefresh>>,
}

impl SwapScheduler {
    pub fn new(
        signal: Arc<CancellationSignal>,
        min_delay: Duration,
        max_delay: Duration,
        poll: Duration,
    ) -> Self {
        Self {
            signal,
            running: AtomicBool::new(false),
            min_delay: min_delay.min(max_delay),
            max_delay: max_delay.max(min_delay),
            poll,
            refresher: None,
        }
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn BalanceRefresh>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn signal(&self) -> &Arc<CancellationSignal> {
        &self.signal
    }

    fn random_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    pub async fn run<F, Fut>(
        &self,
        pair_label: &str,
        mut cycle: F,
        iterations: u32,
    ) -> Result<RunReport, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::Busy(pair_label.to_string()));
        }
        // A stop raised before this point still applies to iteration 1.
        let _running = RunningGuard {
            running: &self.running,
            signal: &self.signal,
        };

        tracing::info!(target: "swap", pair = pair_label, iterations, "Starting swap loop");
        let mut report = RunReport {
            requested: iterations,
            attempted: 0,
            succeeded: 0,
            stop: StopReason::Completed,
        };

        for i in 1..=iterations {
            if self.signal.is_cancelled() {
                tracing::info!(target: "swap", pair = pair_label, cycle = i, "Swap loop stopped");
                report.stop = StopReason::CancelledBeforeCycle(i);
                break;
            }

            tracing::info!(target: "swap", pair = pair_label, cycle = i, "Starting swap {}", i);
            report.attempted += 1;
            if cycle().await {
                report.succeeded += 1;
                if let Some(refresher) = &self.refresher {
                    refresher.refresh().await;
                }
            }

            // A stop raised mid-cycle is honored at the next iteration check.
            if i < iterations && !self.signal.is_cancelled() {
                let delay = self.random_delay();
                tracing::info!(
                    target: "swap",
                    pair = pair_label,
                    cycle = i,
                    "Swap {} done. Waiting {} min {} s",
                    i,
                    delay.as_secs() / 60,
                    delay.as_secs() % 60
                );
                if self.signal.wait(delay, self.poll).await == WaitOutcome::Cancelled {
                    tracing::info!(target: "swap", pair = pair_label, "Stopped during wait");
                    report.stop = StopReason::CancelledDuringWait(i);
                    break;
                }
            }
        }

        tracing::info!(
            target: "swap",
            pair = pair_label,
            attempted = report.attempted,
            succeeded = report.succeeded,
            "Swap loop finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn wait_elapses_without_cancel() {
        let signal = CancellationSignal::new();
        let started = Instant::now();
        let outcome = signal
            .wait(Duration::from_secs(30), Duration::from_millis(100))
            .await;
        assert_eq!(outcome, WaitOutcome::Elapsed);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_wait_promptly() {
        let signal = Arc::new(CancellationSignal::new());
        let canceller = signal.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(2)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let outcome = signal
            .wait(Duration::from_secs(60), Duration::from_millis(100))
            .await;
        assert_eq!(outcome, WaitOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_millis(2_200));
    }

    #[tokio::test]
    async fn already_cancelled_returns_immediately() {
        let signal = CancellationSignal::new();
        signal.cancel();
        assert_eq!(
            signal.wait(Duration::from_secs(3600), Duration::from_millis(100)).await,
            WaitOutcome::Cancelled
        );
        signal.reset();
        assert!(!signal.is_cancelled());
    }

    fn scheduler(signal: Arc<CancellationSignal>) -> SwapScheduler {
        SwapScheduler::new(
            signal,
            Duration::from_secs(30),
            Duration::from_secs(60),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn stop_raised_before_run_is_honored_then_cleared() {
        let signal = Arc::new(CancellationSignal::new());
        let scheduler = scheduler(signal.clone());
        signal.cancel();

        let report = scheduler
            .run("XOS_WXOS", || async { true }, 3)
            .await
            .unwrap();
        assert_eq!(report.stop, StopReason::CancelledBeforeCycle(1));
        assert_eq!(report.attempted, 0);
        assert!(!signal.is_cancelled());
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_cycle_skips_the_wait() {
        let signal = Arc::new(CancellationSignal::new());
        let scheduler = scheduler(signal.clone());

        let started = Instant::now();
        let report = scheduler
            .run(
                "XOS_WXOS",
                || {
                    let signal = signal.clone();
                    async move {
                        signal.cancel();
                        true
                    }
                },
                3,
            )
            .await
            .unwrap();
        assert_eq!(report.stop, StopReason::CancelledBeforeCycle(2));
        assert_eq!(report.attempted, 1);
        assert_eq!(report.succeeded, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
