//! Periodic fleet reconciliation loop.
//!
//! Ticks the monitor + controller on a fixed interval, independent of job
//! arrival. A failed tick is logged and skipped; the next tick observes
//! fresh state.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::controller::FleetController;

/// Default reconciliation interval.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(20);

/// Tick interval from `FLEET_TICK_SECS`, defaulting to 20 seconds.
pub fn tick_interval_from_env() -> Duration {
    std::env::var("FLEET_TICK_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TICK_INTERVAL)
}

/// Run the reconciliation loop until `cancel` is triggered.
pub async fn run(controller: FleetController, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Fleet scheduler started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Fleet scheduler shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = controller.tick().await {
                    tracing::error!(error = %e, "Fleet tick failed, retrying next period");
                }
            }
        }
    }
}
