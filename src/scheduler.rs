//! Pass scheduling: a single pass, or a pass every `poll_interval` until a
//! shutdown signal arrives.

use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::download::SyncEngine;
use crate::systemd::SystemdNotifier;

/// Run the engine once (`poll_interval` of zero) or forever.
///
/// In single-pass mode a failed listing is returned as an error so the
/// process exits non-zero. In polling mode failures are logged and the loop
/// sleeps for the full interval regardless of how the pass went; the next
/// pass is the retry.
pub async fn run(
    engine: &SyncEngine,
    poll_interval: Duration,
    shutdown_token: CancellationToken,
    notifier: SystemdNotifier,
) -> anyhow::Result<()> {
    notifier.notify_ready();

    if poll_interval.is_zero() {
        let result = engine.run_once().await;
        notifier.notify_stopping();
        result.context("Sync failed")?;
        return Ok(());
    }

    loop {
        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, exiting...");
            break;
        }

        match engine.run_once().await {
            Ok(summary) => notifier.notify_status(&summary.status_line()),
            Err(e) => {
                tracing::error!("Sync failed: {}", e);
                notifier.notify_status("Last sync failed; waiting for next poll");
            }
        }
        notifier.notify_watchdog();

        tracing::info!("Waiting {} seconds...", poll_interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = shutdown_token.cancelled() => {
                tracing::info!("Shutdown during wait, exiting...");
                break;
            }
        }
    }

    notifier.notify_stopping();
    Ok(())
}
