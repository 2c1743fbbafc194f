//! Periodic purge of generated reports past their retention window.
//!
//! Deletes `generated_reports` rows whose `expires_at` has passed, then
//! their files. Runs hourly using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use vantage_pipeline::collaborators::FileStorage;
use vantage_pipeline::retention::purge_expired_reports;
use vantage_pipeline::ReportStore;

/// How often the purge runs.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the retention loop until `cancel` is triggered.
pub async fn run(
    store: Arc<dyn ReportStore>,
    storage: Arc<dyn FileStorage>,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = every.as_secs(), "Report retention job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Report retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match purge_expired_reports(store.as_ref(), storage.as_ref(), Utc::now()).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Report retention: purged expired reports");
                    }
                    Ok(_) => tracing::debug!("Report retention: nothing to purge"),
                    Err(e) => {
                        tracing::error!(error = %e, "Report retention: purge failed");
                    }
                }
            }
        }
    }
}
