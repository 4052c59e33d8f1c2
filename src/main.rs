// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use clap::Parser;
use dex_cycler::app::config::Settings;
use dex_cycler::app::logging::setup_logging;
use dex_cycler::common::parsing::parse_range;
use dex_cycler::domain::constants::NETWORK_NAME;
use dex_cycler::domain::error::AppError;
use dex_cycler::infrastructure::network::ledger::{RpcLedger, SharedLedger};
use dex_cycler::services::swap::pairs::Asset;
use dex_cycler::services::swap::session::SwapSession;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "dex-cycler")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,...})
    #[arg(long)]
    config: Option<String>,

    /// Pair to cycle, e.g. XOS_USDC
    #[arg(long)]
    pair: Option<String>,

    /// Number of swap cycles
    #[arg(long, default_value_t = 10)]
    iterations: u32,

    /// Native amount range for --pair as "min,max"
    #[arg(long)]
    range_native: Option<String>,

    /// Token amount range for --pair as "min,max"
    #[arg(long)]
    range_token: Option<String>,

    /// Print wallet balances and exit
    #[arg(long, default_value_t = false)]
    balances: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let settings = Settings::load_with_path(cli.config.as_deref())?;
    setup_logging(settings.log_level(), settings.log_json);

    let signer = settings.signer()?;
    let ledger = RpcLedger::connect(
        settings.rpc_url()?.as_str(),
        signer,
        settings.receipt_poll(),
        settings.receipt_timeout(),
    )
    .await?;
    tracing::info!(
        target: "system",
        network = NETWORK_NAME,
        chain_id = ledger.chain_id(),
        "Wallet connected"
    );
    let ledger: SharedLedger = Arc::new(ledger);

    let session = SwapSession::start(ledger, settings.session_options()?);

    if cli.balances {
        let snapshot = session.wallet_snapshot().await?;
        tracing::info!(target: "system", wallet = %snapshot, "Wallet information updated");
        session.shutdown().await;
        return Ok(());
    }

    let pair = cli.pair.as_deref().ok_or_else(|| AppError::Validation {
        field: "pair".into(),
        message: "--pair is required unless --balances is set".into(),
    })?;
    if let Some(raw) = cli.range_native.as_deref() {
        let (min, max) = parse_range(raw)?;
        session.set_amount_range(pair, Asset::Native, min, max)?;
    }
    if let Some(raw) = cli.range_token.as_deref() {
        let (min, max) = parse_range(raw)?;
        session.set_amount_range(pair, Asset::Token, min, max)?;
    }

    // First Ctrl-C stops the loop; a second one stops the transaction queue.
    let signal = session.cancel_signal();
    let shutdown = session.shutdown_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::info!(target: "system", "Interrupt received, stopping swap loop");
        signal.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(target: "system", "Second interrupt, closing transaction queue");
            shutdown.cancel();
        }
    });

    let result = session.start_swap_loop(pair, cli.iterations).await;
    interrupt.abort();
    session.shutdown().await;

    let report = result?;
    tracing::info!(
        target: "system",
        requested = report.requested,
        attempted = report.attempted,
        succeeded = report.succeeded,
        stop = ?report.stop,
        "Done"
    );
    Ok(())
}
