//! Periodic eviction of finished job records.
//!
//! Completed and failed jobs stay queryable for the configured TTL after
//! they finish; this sweep removes them afterwards so polling clients get
//! a 404.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use vantage_pipeline::JobStore;

/// Run the eviction loop until `cancel` is triggered.
pub async fn run(jobs: Arc<JobStore>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Job eviction started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job eviction stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = jobs.evict_expired(Utc::now()).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Job eviction: removed finished jobs");
                } else {
                    tracing::debug!("Job eviction: nothing to remove");
                }
            }
        }
    }
}
