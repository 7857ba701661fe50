use std::time::Duration;

use tracing::{info, warn};

use crate::analytics::DrainReport;
use crate::errors::{ClicklinkerError, Result};
use crate::system::lifetime::AppContext;

const MONITOR_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// 等待 Ctrl+C，Unix 下同时监听 SIGTERM
pub async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            ClicklinkerError::configuration(format!("Failed to listen for SIGTERM: {}", e))
        })?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map_err(|e| {
                ClicklinkerError::configuration(format!("Failed to listen for Ctrl+C: {}", e))
            })?,
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.map_err(|e| {
        ClicklinkerError::configuration(format!("Failed to listen for Ctrl+C: {}", e))
    })?;

    warn!("Shutdown signal received, draining click events...");
    Ok(())
}

/// 按顺序关闭：停止巡检任务，关闭点击生产端，在宽限期内等待 worker 排空
pub async fn perform_shutdown(ctx: AppContext) -> DrainReport {
    let AppContext {
        monitor, pipeline, ..
    } = ctx;

    if let Some(task) = monitor {
        task.shutdown(MONITOR_STOP_TIMEOUT).await;
    }

    let report = pipeline.shutdown().await;
    if report.is_complete() {
        info!(
            "Click pipeline drained: {} persisted, {} failed, {} dropped",
            report.stats.persisted,
            report.stats.failed,
            report.stats.dropped()
        );
    } else {
        warn!(
            "Click pipeline shutdown incomplete: {} workers still running, {} events pending",
            report.unfinished_workers, report.pending
        );
    }
    report
}
