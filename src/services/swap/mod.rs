// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod calls;
pub mod engine;
pub mod pairs;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod wallet;

pub use engine::{CycleOutcome, SwapEngine};
pub use pairs::{Asset, Direction, PairBook, SwapPairConfig};
pub use queue::{NonceSequencedQueue, TransactionOutcome, TransactionRequest, TxStatus};
pub use scheduler::{CancellationSignal, RunReport, StopReason, SwapScheduler};
pub use session::{SessionOptions, SwapSession};
