//! Background loop: runs the application's periodic task until shutdown.
//!
//! The first tick runs immediately. After each tick the loop waits the full
//! interval before starting the next one, so ticks never overlap and the gap
//! between two tick starts is at least the interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::handler::{run_contained, BackgroundTask};

/// Spawn the background loop on the current runtime.
pub fn spawn_background_loop(
    task: Arc<dyn BackgroundTask>,
    ui: Broadcaster,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_background_loop(task, ui, interval, cancel))
}

pub async fn run_background_loop(
    task: Arc<dyn BackgroundTask>,
    ui: Broadcaster,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!(interval_ms = interval.as_millis() as u64, "Background loop started");
    let mut ticks: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        ticks += 1;
        if !run_contained("background", None, task.tick(&ui)).await {
            debug!(tick = ticks, "Background tick failed, continuing");
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(ticks, "Background loop stopped");
}
