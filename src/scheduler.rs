//! Recurring pass loop.
//!
//! Runs one pass immediately, then one per interval. Passes execute inline
//! on the loop task, so two passes can never overlap. When a pass outlasts
//! the interval the missed ticks are skipped, not queued: the next pass
//! starts on the next tick boundary after the slow one finishes.
//!
//! A failed pass is logged and the loop keeps waiting for the next tick.
//! Shutdown is only observed between passes; a running pass is never
//! cancelled part-way.

use crate::error::PipelineError;
use crate::pipeline::PassReport;
use chrono::Local;
use std::future::Future;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

/// Drive `pass` every `period` until `shutdown` resolves.
///
/// Returns the number of passes started.
pub async fn run_every<F, Fut, S>(period: Duration, shutdown: S, mut pass: F) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PassReport, PipelineError>>,
    S: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(interval_secs = period.as_secs(), "Auto-update service started");
    let mut passes = 0usize;

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!(passes, "Shutdown requested; stopping scheduler");
                break;
            }
            _ = ticker.tick() => {}
        }

        passes += 1;
        match pass().await {
            Ok(report) => info!(
                pass = passes,
                fetched = report.fetched,
                enriched = report.enrich.emitted,
                elapsed_ms = report.elapsed.as_millis(),
                "Scheduled pass succeeded"
            ),
            Err(e) => error!(pass = passes, error = %e, "Scheduled pass failed; waiting for next interval"),
        }

        let next = Local::now() + chrono::Duration::from_std(period).unwrap_or(chrono::Duration::zero());
        info!(next_run = %next.format("%Y-%m-%d %H:%M:%S"), "Waiting for next scheduled pass");
    }

    passes
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
